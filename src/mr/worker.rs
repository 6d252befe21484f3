//! The worker: a stateless poll-execute-report loop.
//!
//! Each iteration asks the coordinator for a task, runs it against the blob
//! store, and reports the dispatch token back. A failure anywhere in task
//! execution exits the loop *without* notifying, so the coordinator's
//! timeout re-dispatches the work; partial intermediate output is harmless
//! because a re-run overwrites it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tarpc::{client, context, tokio_serde::formats::Json};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::mr::app::{reduce_groups, MapReduceApp};
use crate::mr::coordinator::CoordinatorServiceClient;
use crate::mr::io::Blobstore;
use crate::mr::shuffle::{intermediate_name, output_name, parse_pairs, partition_for_key};
use crate::mr::task::{MapTask, NotifyInfo, ReduceTask, TaskResponse, Token};

/// Consecutive failed `request_task` calls before the worker presumes the
/// coordinator dead and terminates.
pub const MAX_RETRIES: u32 = 3;
/// Back-off between polls when the coordinator has nothing to hand out.
pub const WORKER_WAIT_MS: u64 = 500;

pub struct Worker {
    addr: String,
    store: Arc<dyn Blobstore>,
    app: Arc<dyn MapReduceApp>,
    client: Option<CoordinatorServiceClient>,
    fail_cnt: u32,
    running: bool,
}

impl Worker {
    pub fn new(addr: String, store: Arc<dyn Blobstore>, app: Arc<dyn MapReduceApp>) -> Self {
        Self {
            addr,
            store,
            app,
            client: None,
            fail_cnt: 0,
            running: false,
        }
    }

    /// Run until the coordinator responds DONE or stops answering. Returns
    /// an error only when task execution itself fails, in which case no
    /// completion was reported for the task in progress.
    pub async fn run(&mut self) -> Result<()> {
        info!(addr = %self.addr, "worker started");
        self.running = true;

        while self.running {
            match self.call_request_task().await {
                TaskResponse::Wait => {
                    debug!("no task available, sleeping for {WORKER_WAIT_MS}ms");
                    sleep(Duration::from_millis(WORKER_WAIT_MS)).await;
                }
                TaskResponse::Done => {
                    info!("coordinator responded done, stopping worker");
                    self.running = false;
                }
                TaskResponse::Map(task) => {
                    let token = task.token;
                    self.run_map_task(&task)?;
                    self.call_notify_done(token).await;
                }
                TaskResponse::Reduce(task) => {
                    let token = task.token;
                    self.run_reduce_task(&task)?;
                    self.call_notify_done(token).await;
                }
            }
        }

        info!("worker stopped");
        Ok(())
    }

    /// Lazily (re-)connect. The client is dropped after any failed call so
    /// the next iteration dials again; this also covers a coordinator that
    /// binds its listener later than the worker starts.
    async fn client(&mut self) -> Result<&CoordinatorServiceClient> {
        if self.client.is_none() {
            let transport =
                tarpc::serde_transport::tcp::connect(self.addr.as_str(), Json::default).await?;
            self.client =
                Some(CoordinatorServiceClient::new(client::Config::default(), transport).spawn());
            info!(addr = %self.addr, "connected to coordinator");
        }
        Ok(self.client.as_ref().expect("client just connected"))
    }

    async fn call_request_task(&mut self) -> TaskResponse {
        let outcome = match self.client().await {
            Ok(client) => client
                .request_task(context::current())
                .await
                .map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(response) => {
                self.fail_cnt = 0;
                response
            }
            Err(err) => {
                self.client = None;
                self.fail_cnt += 1;
                if self.fail_cnt >= MAX_RETRIES {
                    error!("request_task failed {MAX_RETRIES} times in a row, \
                            presuming the coordinator dead: {err:#}");
                    TaskResponse::Done
                } else {
                    warn!(fail_cnt = self.fail_cnt, "request_task failed, backing off: {err:#}");
                    TaskResponse::Wait
                }
            }
        }
    }

    /// Errors here are logged but never retried; a lost acknowledgement is
    /// covered by the coordinator's timeout.
    async fn call_notify_done(&mut self, token: Token) {
        let outcome = match self.client().await {
            Ok(client) => client
                .notify_done(context::current(), NotifyInfo { token })
                .await
                .map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => info!(token, "reported task as finished"),
            Err(err) => {
                self.client = None;
                warn!(token, "failed to report task completion: {err:#}");
            }
        }
    }

    fn run_map_task(&self, task: &MapTask) -> Result<()> {
        info!(map_id = task.map_id, fname = %task.fname, n_reduce = task.n_reduce,
              "executing map task");

        let content = self.store.read(&task.fname)?;
        let pairs = self.app.map(&task.fname, &content)?;

        let mut buckets = vec![String::new(); task.n_reduce as usize];
        for pair in pairs {
            let bucket = partition_for_key(&pair.key, task.n_reduce) as usize;
            buckets[bucket].push_str(&format!("{} {}\n", pair.key, pair.value));
        }

        // Empty partitions are written too, so reduce reads never miss files.
        for (reduce_id, bucket) in buckets.iter().enumerate() {
            self.store
                .write(&intermediate_name(task.map_id, reduce_id as u32), bucket)?;
        }
        Ok(())
    }

    fn run_reduce_task(&self, task: &ReduceTask) -> Result<()> {
        info!(reduce_id = task.reduce_id, n_map = task.n_map, "executing reduce task");

        let mut pairs = Vec::new();
        for map_id in 0..task.n_map {
            let name = intermediate_name(map_id, task.reduce_id);
            match self.store.read(&name) {
                Ok(content) => pairs.extend(parse_pairs(&content)?),
                // A re-running map task may not have rewritten this partition
                // yet; the timeout path guarantees eventual correctness.
                Err(err) => warn!(%name, "missing intermediate, reading as empty: {err:#}"),
            }
        }

        let output = reduce_groups(self.app.as_ref(), pairs)?;
        self.store.write(&output_name(task.reduce_id), &output)
    }
}
