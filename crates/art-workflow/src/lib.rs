//! Durable workflow + activity abstraction (spec §6). The core depends
//! only on the [`contract`] traits; [`memory`] is the in-process engine
//! used by `art-testing` and by small single-process deployments.

pub mod cancel;
pub mod contract;
pub mod memory;

pub use cancel::CancelToken;
pub use contract::{
    ActivityError, ActivityFn, ActivityOptions, BoxFuture, WorkflowContext, WorkflowEngine,
    WorkflowFn, WorkflowHandle,
};
pub use memory::InMemoryEngine;
