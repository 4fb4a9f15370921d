//! # lca-scout
//!
//! Citation intelligence for life cycle assessment (LCA) literature.
//!
//! Collects journal articles from OpenAlex, enriches the most cited ones
//! through Semantic Scholar, and derives citation questions, trending topics
//! and research gaps. Results land in a Markdown report, a JSON dataset and
//! an optional bar chart; a Deep Research step can wrap them in an LLM
//! synthesis.
//!
//! ## Architecture
//!
//! - [`models`]: Paper records, raw upstream payloads and derived insights
//! - [`analysis`]: Ingestion, enrichment, question, trend and gap passes
//! - [`sources`]: Literature adapters with a trait-based architecture
//! - [`llm`]: Deep Research synthesis
//! - [`workflows`]: Citation scan, deep research, trending metrics and paper
//!   search runs, report rendering
//! - [`services`]: Adapter wiring from [`config::Config`]
//! - [`utils`]: HTTP client, retry and chart server client
//! - [`config`]: Configuration management

pub mod analysis;
pub mod config;
pub mod llm;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;
pub mod workflows;

// Re-export commonly used types
pub use models::PaperRecord;
pub use services::ResearchServices;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
