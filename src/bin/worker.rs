use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use minimr::mr::app::{Indexer, MapReduceApp, WordCount};
use minimr::mr::io::DiskBlobstore;
use minimr::mr::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum App {
    WordCount,
    Indexer,
}

/// Poll the coordinator for tasks and execute them until told to stop.
#[derive(Debug, Parser)]
#[command(name = "worker")]
struct Args {
    /// Coordinator hostname or IP to connect to.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Coordinator port to connect to.
    #[arg(long, default_value_t = 50051)]
    port: u16,

    /// Which MapReduce program to run.
    #[arg(long, value_enum, default_value_t = App::WordCount)]
    app: App,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let app: Arc<dyn MapReduceApp> = match args.app {
        App::WordCount => Arc::new(WordCount::new()),
        App::Indexer => Arc::new(Indexer::new()),
    };

    let addr = format!("{}:{}", args.host, args.port);
    Worker::new(addr, Arc::new(DiskBlobstore), app).run().await
}
