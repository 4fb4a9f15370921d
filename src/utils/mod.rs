//! Utility modules supporting the adapters and workflows.
//!
//! - [`HttpClient`]: shared reqwest client with timeout and retry policy
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff for transient errors
//! - [`ChartClient`]: bar chart rendering through an MCP chart server
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use lca_scout::sources::SourceError;
//! use lca_scout::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let result = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

pub mod chart;
mod http;
mod retry;

pub use chart::{ChartClient, ChartRenderer, DEFAULT_CHART_ENDPOINT};
pub use http::{check_status, send, HttpClient, DEFAULT_TIMEOUT, USER_AGENT};
pub use retry::{with_retry, RetryConfig, TransientError};
