//! Step execution engine for the marketplace `/execute/*` endpoints.
//!
//! The server declares an ordered list of heterogeneous steps (on-chain
//! transaction, off-chain signature, orderbook POST, indexer confirmation);
//! this module drives the first incomplete step to completion, folds any
//! follow-up query parameters back into the execute URL, and re-fetches
//! until the list has no incomplete step left.

pub mod error;
pub mod fetcher;
pub mod poll;
pub mod query;
pub mod runner;
pub mod types;

pub use error::ExecuteError;
pub use fetcher::{HttpStepFetcher, OrderReceipt, StepFetcher};
pub use poll::{PollConfig, poll_until_has_data};
pub use query::set_params;
pub use runner::{NullProgress, OrderPostCheck, ProgressSink, StepExecutor};
pub use types::{ExecuteResponse, Step, StepAction, StepStatus};
