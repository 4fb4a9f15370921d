//! End-to-end workflows over the analysis pipeline.
//!
//! - [`run_citation_workflow`]: deterministic citation scan with Markdown
//!   report, JSON dataset and trend chart
//! - [`run_deep_research_workflow`]: the citation scan plus an optional LLM
//!   synthesis, wrapped in a final report
//! - [`run_trending_metrics_workflow`]: per-theme citation trends for a fixed
//!   set of LCA metrics
//! - [`run_paper_search`]: free-text search over Semantic Scholar with
//!   optional OpenAlex records and citation edges

mod citations;
mod deep_research;
mod metrics;
mod papers;
mod profiles;
pub mod report;

use crate::sources::SourceError;

pub use citations::{
    build_work_query, chart_arguments, current_year, run_citation_workflow, year_window,
    CitationArtifacts, CitationWorkflowOptions, CHART_TOOL, MIN_START_YEAR, WORK_SELECT_FIELDS,
};
pub use deep_research::{
    build_prompt, build_prompt_context, run_deep_research_workflow, DeepResearchArtifacts,
    DeepResearchOptions, MAX_TOOL_CALLS, RESPONSE_FILENAME,
};
pub use metrics::{
    build_metric_query, metrics_plan, run_trending_metrics_workflow, summarise_works, MetricConcept,
    MetricSummary, MetricWork, TrendingMetric, TrendingMetricsArtifacts, TrendingMetricsOptions,
    DEFAULT_MAX_RECORDS_PER_METRIC, DEFAULT_METRICS_START_YEAR, METRIC_SELECT_FIELDS,
    RAW_RECORDS_PER_METRIC, TRENDING_METRICS,
};
pub use papers::{
    build_search_query, citation_edges, run_paper_search, search_plan, CitationEdge, OpenAlexHit,
    PaperSearchArtifacts, PaperSearchOptions, DEFAULT_SEARCH_LIMIT, SEARCH_SELECT_FIELDS,
};
pub use profiles::{
    get_citation_profile, get_deep_research_profile, list_profiles, CitationProfile,
    DeepResearchProfile, LCA_PROFILE,
};

/// Errors that abort a workflow run
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown {kind} profile '{slug}'.")]
    UnknownProfile { kind: &'static str, slug: String },

    #[error("Start year {start} is after end year {end}.")]
    InvalidYears { start: i32, end: i32 },

    #[error(transparent)]
    Source(#[from] SourceError),
}
