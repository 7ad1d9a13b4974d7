//! Engine crate for the AI orchestration gateway: the topic-driven
//! execution core shared by the synchronous executor, the async job
//! worker, and the conversation session engine.

pub mod enrichment;
pub mod error;
pub mod executor;
pub mod job;
pub mod llm;
pub mod prompt;
pub mod schema;
pub mod session;
pub mod topic;

pub use error::{GatewayError, Result};
pub use executor::{ExecutionOutcome, Executor};
