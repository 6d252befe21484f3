//! A small fault-tolerant MapReduce execution engine.
//!
//! A single coordinator hands map and reduce tasks to a pool of stateless
//! workers over RPC, re-queueing any task whose worker crashes, hangs, or
//! drops off the network. Outputs are named deterministically and task
//! execution is a pure function of its inputs, so at-least-once dispatch
//! still yields exactly-once output semantics.

pub mod mr;
