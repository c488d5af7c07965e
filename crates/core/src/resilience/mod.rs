//! Resilience wiring for mutating and read operations
//!
//! - **[`context`]**: the one shared set of monitor, queue, cache and policy
//! - **[`facade`]**: `execute`, `fetch` and `execute_bulk` on top of it

pub mod context;
pub mod facade;

pub use context::{ResilienceContext, ResilienceContextBuilder};
pub use facade::{
    BulkExecution, BulkProgress, ExecuteOptions, FetchOutcome, OperationOutcome,
    ResilientOperations,
};
