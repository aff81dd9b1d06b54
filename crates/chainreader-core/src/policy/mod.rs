//! Reliability policies applied by the [`Executor`](crate::executor::Executor).
//!
//! ```text
//! Request → [Cache] → [Pool select] → [Timeout] → [Transport] → [Backoff] → ...
//! ```

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
