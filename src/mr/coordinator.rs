//! The coordinator: a task-dispatch and fault-tolerance state machine served
//! over RPC.
//!
//! Tasks flow through three tables. `todo` is a FIFO queue of dispatch
//! attempts waiting for a worker; `curr` maps the token of every in-flight
//! attempt to its logical id; `done` holds the logical ids completed in the
//! current phase. A dispatched task that is not acknowledged within
//! `task_wait_ms` is presumed lost and re-queued under a fresh token, which
//! permanently invalidates the old one. Between any two observable
//! transitions, `|todo| + |curr| + |done|` equals the task count of the
//! phase, and the phase advances (Map → Reduce → Done) only when `todo` and
//! `curr` are both empty.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use tarpc::server::incoming::Incoming;
use tarpc::server::BaseChannel;
use tarpc::{context, tokio_serde::formats::Json};
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::mr::task::{NotifyInfo, Phase, Task, TaskResponse, TaskSpec, Token};

/// Knobs threaded through explicitly rather than read from process globals.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Hostname or IP to listen on.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Number of reduce tasks; zero means "same as the number of map tasks".
    pub n_reduce: u32,
    /// Per-dispatch timeout, and the grace period granted to workers between
    /// the last completion and listener shutdown.
    pub task_wait_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 50051,
            n_reduce: 0,
            task_wait_ms: 5000,
        }
    }
}

/// The mutable scheduling state. Touched only under the one mutex in
/// `Inner`, and never across an await point.
#[derive(Debug, Default)]
struct State {
    phase: Phase,
    next_token: Token,
    todo: VecDeque<Task>,
    curr: HashMap<Token, u32>,
    done: HashSet<u32>,
}

impl State {
    fn fresh_token(&mut self) -> Token {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    fn prepare_map(&mut self, files: &[String], n_reduce: u32) {
        assert!(self.todo.is_empty(), "map phase prepared with queued tasks");
        assert!(self.curr.is_empty(), "map phase prepared with tasks in flight");
        self.done.clear();

        for (map_id, fname) in files.iter().enumerate() {
            let token = self.fresh_token();
            self.todo.push_back(Task {
                token,
                spec: TaskSpec::Map {
                    map_id: map_id as u32,
                    n_reduce,
                    fname: fname.clone(),
                },
            });
        }
        self.phase = Phase::Map;
    }

    fn prepare_reduce(&mut self, n_map: u32, n_reduce: u32) {
        assert!(self.todo.is_empty(), "reduce phase prepared with queued tasks");
        assert!(self.curr.is_empty(), "reduce phase prepared with tasks in flight");
        self.done.clear();

        for reduce_id in 0..n_reduce {
            let token = self.fresh_token();
            self.todo.push_back(Task {
                token,
                spec: TaskSpec::Reduce { reduce_id, n_map },
            });
        }
        self.phase = Phase::Reduce;
    }
}

#[tarpc::service]
pub trait CoordinatorService {
    /// Ask for the next task. `Wait` means back off and poll again; `Done`
    /// means terminate.
    async fn request_task() -> TaskResponse;
    /// Report the dispatch attempt identified by `info.token` as finished.
    async fn notify_done(info: NotifyInfo);
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoordinatorConfig,
    files: Vec<String>,
    n_map: u32,
    n_reduce: u32,
    state: Mutex<State>,
    shutdown: Notify,
    running: AtomicBool,
}

impl Coordinator {
    /// One map task per input file. `config.n_reduce == 0` defaults the
    /// reduce fan-out to the number of map tasks.
    pub fn new(files: Vec<String>, config: CoordinatorConfig) -> Self {
        let n_map = files.len() as u32;
        let n_reduce = if config.n_reduce > 0 {
            config.n_reduce
        } else {
            n_map
        };
        Self {
            inner: Arc::new(Inner {
                config,
                files,
                n_map,
                n_reduce,
                state: Mutex::new(State::default()),
                shutdown: Notify::new(),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// The `host:port` workers should connect to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.inner.config.host, self.inner.config.port)
    }

    /// Bind the listener, start a fresh MAP phase, and serve RPCs until
    /// `stop()` is called or the DONE grace period elapses. Idempotent:
    /// returns immediately if already running. A stop/start cycle begins a
    /// completely new run with empty state tables and `next_token = 0`.
    pub async fn start(&self) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.reset();

        let addr = self.addr();
        let listener = tarpc::serde_transport::tcp::listen(addr.as_str(), Json::default).await?;
        info!(%addr, n_map = self.inner.n_map, n_reduce = self.inner.n_reduce,
              "coordinator listening, map phase started");

        let serve = listener
            .filter_map(|conn| async { conn.ok() })
            .map(BaseChannel::with_defaults)
            .execute(self.clone().serve());

        tokio::select! {
            _ = serve => {}
            _ = self.inner.shutdown.notified() => {}
        }

        self.inner.running.store(false, Ordering::SeqCst);
        info!("coordinator stopped");
        Ok(())
    }

    /// Release the listener and cancel outstanding RPCs. Idempotent.
    pub fn stop(&self) {
        if self.inner.running.load(Ordering::SeqCst) {
            self.inner.shutdown.notify_one();
        }
    }

    fn reset(&self) {
        let mut state = self.inner.state.lock().unwrap();
        *state = State::default();
        state.prepare_map(&self.inner.files, self.inner.n_reduce);
    }

    /// Watchdog for one dispatch attempt. Runs detached; the completion
    /// check never happens earlier than `task_wait_ms` after dispatch.
    async fn requeue_if_lost(&self, mut task: Task) {
        sleep(Duration::from_millis(self.inner.config.task_wait_ms)).await;

        let mut state = self.inner.state.lock().unwrap();
        // The token leaves `curr` exactly when the task is acknowledged, so
        // its presence means the worker is unresponsive.
        if state.curr.remove(&task.token).is_none() {
            return;
        }
        warn!(token = task.token, id = task.logical_id(),
              "unresponsive task, re-queueing under a fresh token");
        task.token = state.fresh_token();
        state.todo.push_back(task);
    }
}

#[tarpc::server]
impl CoordinatorService for Coordinator {
    async fn request_task(self, _: context::Context) -> TaskResponse {
        let (task, phase) = {
            let mut state = self.inner.state.lock().unwrap();
            if state.phase == Phase::Done {
                return TaskResponse::Done;
            }
            let Some(task) = state.todo.pop_front() else {
                // Everything is in flight; tell the worker to back off.
                return TaskResponse::Wait;
            };
            state.curr.insert(task.token, task.logical_id());
            (task, state.phase)
        };

        info!(token = task.token, id = task.logical_id(), phase = ?phase,
              "dispatching task to worker");

        let response = task.to_response();
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.requeue_if_lost(task).await });
        response
    }

    async fn notify_done(self, _: context::Context, info: NotifyInfo) {
        let became_done = {
            let mut state = self.inner.state.lock().unwrap();
            if state.phase == Phase::Done {
                return;
            }
            let Some(id) = state.curr.remove(&info.token) else {
                // Expected for completions that raced a timeout: the task was
                // re-dispatched and this token is no longer valid.
                warn!(token = info.token, "ignored invalid task completion");
                return;
            };
            state.done.insert(id);
            info!(token = info.token, id, "task complete");

            if !state.todo.is_empty() || !state.curr.is_empty() {
                false
            } else {
                match state.phase {
                    Phase::Map => {
                        assert_eq!(state.done.len() as u32, self.inner.n_map,
                                   "map phase ended without finishing all map tasks");
                        state.prepare_reduce(self.inner.n_map, self.inner.n_reduce);
                        info!(n_reduce = self.inner.n_reduce,
                              "all map tasks complete, reduce phase started");
                        false
                    }
                    Phase::Reduce => {
                        assert_eq!(state.done.len() as u32, self.inner.n_reduce,
                                   "reduce phase ended without finishing all reduce tasks");
                        state.phase = Phase::Done;
                        true
                    }
                    Phase::Done => unreachable!(),
                }
            }
        };

        if became_done {
            let grace = self.inner.config.task_wait_ms;
            info!(grace_ms = grace,
                  "all reduce tasks complete, coordinator stopping after grace period");
            let coordinator = self.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(grace)).await;
                coordinator.stop();
            });
        }
    }
}
