//! Literature and tooling adapters with a trait-based architecture.
//!
//! Every adapter implements [`Source`], which carries its identity, its
//! [`SourceCapabilities`] and a `verify` check used by `lca-scout sources verify`.
//! Adapters that feed the citation workflow additionally implement one of the
//! role traits:
//!
//! - [`WorkSource`]: streams raw works for a query (OpenAlex)
//! - [`EnrichmentSource`]: looks up a single paper for enrichment (Semantic Scholar)
//! - [`PaperSearchSource`]: keyword search returning representative papers (Semantic Scholar)
//!
//! The chart server and the Deep Research client live in [`crate::utils::chart`]
//! and [`crate::llm`]; they implement [`Source`] so the registry can verify them.

mod mock;
mod openalex;
mod registry;
mod semantic;

pub use mock::{
    MockChartRenderer, MockEnrichmentSource, MockPaperSearchSource, MockSynthesizer, MockWorkSource,
};
pub use openalex::{OpenAlexSource, OPENALEX_API_BASE};
pub use registry::{SourceCapabilities, SourceRegistry};
pub use semantic::{SemanticScholarSource, SEARCH_FIELDS, SEMANTIC_API_BASE};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{EnrichmentPayload, PaperHit, RawWork};

/// Outcome of verifying an adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub success: bool,
    pub message: String,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Verification {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Attach a detail entry
    pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Base interface shared by every adapter
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier (e.g. "openalex")
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Describe what this adapter can do
    fn capabilities(&self) -> SourceCapabilities;

    /// Check that the adapter is reachable and configured
    async fn verify(&self) -> Verification;
}

/// Parameters for a paginated works search
#[derive(Debug, Clone, PartialEq)]
pub struct WorkQuery {
    /// Free-text search phrase
    pub search: Option<String>,

    /// Filters, serialised as `key:value` pairs; multiple values repeat the key
    pub filters: Vec<(String, Vec<String>)>,

    /// Sort expression such as `cited_by_count:desc`
    pub sort: Option<String>,

    /// Fields to request
    pub select: Vec<String>,

    /// Page size (clamped to 1..=200 by OpenAlex)
    pub per_page: usize,

    /// Stop after this many pages
    pub max_pages: Option<usize>,
}

impl Default for WorkQuery {
    fn default() -> Self {
        Self {
            search: None,
            filters: Vec::new(),
            sort: None,
            select: Vec::new(),
            per_page: 200,
            max_pages: Some(10),
        }
    }
}

impl WorkQuery {
    /// Create a query for a search phrase
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Default::default()
        }
    }

    /// Add a filter with a single value
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), vec![value.into()]));
        self
    }

    /// Add a filter with several values
    pub fn filter_any<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.filters.push((key.into(), values));
        }
        self
    }

    /// Render the filters in OpenAlex `key:value,key:value` form
    pub fn serialise_filters(&self) -> Option<String> {
        let entries: Vec<String> = self
            .filters
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| format!("{}:{}", key, value)))
            .collect();
        if entries.is_empty() {
            None
        } else {
            Some(entries.join(","))
        }
    }
}

/// A source that streams raw works page by page
pub trait WorkSource: Source {
    /// Stream works matching the query. Pagination is driven lazily by the consumer.
    fn works<'a>(&'a self, query: &'a WorkQuery) -> BoxStream<'a, Result<RawWork, SourceError>>;
}

/// A source that can look up a single paper for enrichment
#[async_trait]
pub trait EnrichmentSource: Source {
    /// Look up a paper by identifier (`DOI:...`, `arXiv:...`, native id).
    /// Returns `Ok(None)` when the paper is unknown.
    async fn lookup(&self, paper_id: &str) -> Result<Option<EnrichmentPayload>, SourceError>;
}

/// A source that answers free-text paper searches
#[async_trait]
pub trait PaperSearchSource: Source {
    /// Return at most `limit` papers matching `query`, best match first
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperHit>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream returned a 5xx status
    #[error("Server error: {0}")]
    Server(String),

    /// Parsing error (JSON, SSE, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other non-success API response
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
