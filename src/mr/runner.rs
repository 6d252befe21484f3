//! Drives a full coordinator-plus-worker-pool run inside one process. Both
//! sides shut down on their own once every reduce output is acknowledged.

use std::sync::Arc;

use anyhow::Result;

use crate::mr::app::MapReduceApp;
use crate::mr::coordinator::{Coordinator, CoordinatorConfig};
use crate::mr::io::Blobstore;
use crate::mr::worker::Worker;

pub async fn run_distributed(
    app: Arc<dyn MapReduceApp>,
    files: Vec<String>,
    n_workers: usize,
    store: Arc<dyn Blobstore>,
    config: CoordinatorConfig,
) -> Result<()> {
    let coordinator = Coordinator::new(files, config);
    let addr = coordinator.addr();
    let server = tokio::spawn(async move { coordinator.start().await });

    let mut workers = Vec::new();
    for _ in 0..n_workers {
        let mut worker = Worker::new(addr.clone(), Arc::clone(&store), Arc::clone(&app));
        workers.push(tokio::spawn(async move { worker.run().await }));
    }

    for worker in workers {
        worker.await??;
    }
    server.await??;
    Ok(())
}
