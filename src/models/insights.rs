//! Derived, read-only aggregates computed from the paper set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// High-impact research question derived from a highly cited paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationQuestion {
    pub question: String,
    pub citation_count: u64,
    pub publication_year: i32,
    pub paper_title: String,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub authors: Vec<String>,
    pub keyword_hits: BTreeMap<String, usize>,
}

/// Topic attracting increasing citation momentum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,

    /// Least-squares slope of the yearly citation-weighted series
    pub trend_score: f64,

    /// Last year's value minus the first year's value
    pub citation_growth: f64,

    /// Share of the weighted citations falling in the last two years
    pub recent_share: f64,

    /// Inclusive year window the series covers
    pub coverage_years: (i32, i32),

    /// Titles of the most cited papers carrying the concept
    pub top_papers: Vec<String>,
}

/// Topic with few publications but strong citation potential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchGap {
    pub topic: String,
    pub paper_count: usize,
    pub avg_citations: f64,
    pub recent_papers: usize,
    pub representative_title: String,
    pub supporting_doi: Option<String>,
    pub rationale: String,
}
