//! Paper model representing a normalised literature entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier recorded on papers ingested from OpenAlex
pub const OPENALEX_SOURCE_ID: &str = "openalex";

/// A weighted topical tag attached to a paper by the upstream literature API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Upstream concept identifier
    pub id: Option<String>,

    /// Human-readable concept name
    pub display_name: String,

    /// Position in the concept hierarchy (0 = root)
    pub level: Option<i64>,

    /// Relevance score in [0, 1]
    pub score: Option<f64>,
}

impl Concept {
    /// Create a concept with a name and score
    pub fn new(display_name: impl Into<String>, score: f64) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            level: None,
            score: Some(score),
        }
    }

    /// Relevance score, treating a missing score as zero
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// A paper returned by a free-text search, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperHit {
    pub paper_id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
}

/// Normalised representation of a scholarly article
///
/// Records are created once per unique work id during ingestion and may be
/// touched once more by the enrichment pass. The citation count never
/// decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Source the record was ingested from
    pub source_id: String,

    /// Stable upstream identifier (deduplication key)
    pub work_id: String,

    /// Paper title
    pub title: String,

    /// Publication year
    pub year: i32,

    /// Number of citations
    pub citation_count: u64,

    /// DOI without scheme or `doi:` prefix
    pub doi: Option<String>,

    /// Landing page or PDF URL
    pub url: Option<String>,

    /// Venue name
    pub journal: Option<String>,

    /// Author names in upstream order
    pub authors: Vec<String>,

    /// Abstract text, possibly replaced by a longer summary during enrichment
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Weighted topical concepts
    pub concepts: Vec<Concept>,

    /// Keyword -> substring occurrence count within title and abstract
    pub keyword_hits: BTreeMap<String, usize>,

    /// Provenance bag
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaperRecord {
    /// Create a new record with the required fields; everything else is empty
    pub fn new(work_id: impl Into<String>, title: impl Into<String>, year: i32) -> Self {
        Self {
            source_id: OPENALEX_SOURCE_ID.to_string(),
            work_id: work_id.into(),
            title: title.into(),
            year,
            citation_count: 0,
            doi: None,
            url: None,
            journal: None,
            authors: Vec::new(),
            abstract_text: String::new(),
            concepts: Vec::new(),
            keyword_hits: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Hit count for a keyword, zero when the keyword was not scanned
    pub fn hits(&self, keyword: &str) -> usize {
        self.keyword_hits.get(keyword).copied().unwrap_or(0)
    }

    /// Sum of hits across all scanned keywords
    pub fn total_hits(&self) -> usize {
        self.keyword_hits.values().sum()
    }

    /// DOI link when available, otherwise the URL
    pub fn link(&self) -> Option<String> {
        match (&self.doi, &self.url) {
            (Some(doi), _) => Some(format!("https://doi.org/{}", doi)),
            (None, Some(url)) => Some(url.clone()),
            (None, None) => None,
        }
    }
}

/// Return the indices of `papers` ordered by citation count, highest first.
///
/// The sort is stable, so papers with equal counts keep their original order.
pub fn rank_by_citations(papers: &[PaperRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..papers.len()).collect();
    order.sort_by(|&a, &b| papers[b].citation_count.cmp(&papers[a].citation_count));
    order
}
