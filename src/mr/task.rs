//! Task data model shared by the coordinator and workers.

use serde::{Deserialize, Serialize};

/// Identifies a single dispatch attempt, not a logical task. Re-queued tasks
/// get a fresh token, and tokens are never reused within a run.
pub type Token = i64;

/// Coarse coordinator state. Transitions are monotonic: Map → Reduce → Done,
/// exactly once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Map,
    Reduce,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTask {
    pub token: Token,
    pub map_id: u32,
    pub n_reduce: u32,
    /// Input blob to read and map.
    pub fname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceTask {
    pub token: Token,
    pub reduce_id: u32,
    pub n_map: u32,
}

/// Reply to `request_task`. `Wait` tells the worker to back off and poll
/// again; `Done` tells it to terminate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskResponse {
    Map(MapTask),
    Reduce(ReduceTask),
    Wait,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyInfo {
    pub token: Token,
}

/// A queued dispatch attempt held by the coordinator.
#[derive(Debug, Clone)]
pub struct Task {
    pub token: Token,
    pub spec: TaskSpec,
}

#[derive(Debug, Clone)]
pub enum TaskSpec {
    Map {
        map_id: u32,
        n_reduce: u32,
        fname: String,
    },
    Reduce {
        reduce_id: u32,
        n_map: u32,
    },
}

impl Task {
    /// The map or reduce id, stable across re-dispatches of the same task.
    pub fn logical_id(&self) -> u32 {
        match &self.spec {
            TaskSpec::Map { map_id, .. } => *map_id,
            TaskSpec::Reduce { reduce_id, .. } => *reduce_id,
        }
    }

    pub fn to_response(&self) -> TaskResponse {
        match &self.spec {
            TaskSpec::Map {
                map_id,
                n_reduce,
                fname,
            } => TaskResponse::Map(MapTask {
                token: self.token,
                map_id: *map_id,
                n_reduce: *n_reduce,
                fname: fname.clone(),
            }),
            TaskSpec::Reduce { reduce_id, n_map } => TaskResponse::Reduce(ReduceTask {
                token: self.token,
                reduce_id: *reduce_id,
                n_map: *n_map,
            }),
        }
    }
}
