//! Free-text paper search across Semantic Scholar and, optionally, OpenAlex.

use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;

use crate::models::{PaperHit, RawWork};
use crate::services::ResearchServices;
use crate::sources::{SourceError, WorkQuery};

/// Papers returned per source unless configured otherwise
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Largest OpenAlex page used for complementary records
const MAX_OPENALEX_PAGE: usize = 50;

/// Citation edges kept per returned record
const EDGES_PER_RECORD: usize = 5;

/// Fields requested from OpenAlex for complementary records
pub const SEARCH_SELECT_FIELDS: &[&str] = &[
    "id",
    "display_name",
    "publication_year",
    "doi",
    "cited_by_count",
    "referenced_works",
    "authorships",
];

/// An OpenAlex work as listed next to the Semantic Scholar hits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAlexHit {
    pub id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub cited_by_count: Option<i64>,
    pub authors: Vec<String>,
    pub referenced_works: Vec<String>,
}

impl From<RawWork> for OpenAlexHit {
    fn from(work: RawWork) -> Self {
        let authors = work
            .authorships
            .iter()
            .filter_map(|a| a.author.as_ref()?.display_name.clone())
            .filter(|name| !name.is_empty())
            .collect();
        Self {
            id: work.id,
            title: work.display_name,
            year: work.publication_year,
            doi: work.doi,
            cited_by_count: work.cited_by_count,
            authors,
            referenced_works: work.referenced_works,
        }
    }
}

/// A `source cites target` pair between OpenAlex work ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationEdge {
    pub source: String,
    pub target: String,
}

/// Inputs for one paper search
#[derive(Debug, Clone)]
pub struct PaperSearchOptions {
    pub query: String,
    pub limit: usize,
    pub include_openalex: bool,

    /// Build citation edges from the OpenAlex records
    pub include_citations: bool,

    pub dry_run: bool,
}

impl PaperSearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            include_openalex: false,
            include_citations: false,
            dry_run: false,
        }
    }
}

/// Everything a paper search produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaperSearchArtifacts {
    pub query: String,
    pub semantic_scholar: Vec<PaperHit>,
    pub openalex: Vec<OpenAlexHit>,

    /// Skipped or failed lookups, in the order they happened
    pub notes: Vec<String>,

    /// Set only when citations were requested and OpenAlex answered
    pub citation_edges: Option<Vec<CitationEdge>>,

    /// Set only on dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<String>>,
}

/// Steps a search with `options` would take
pub fn search_plan(options: &PaperSearchOptions) -> Vec<String> {
    let mut plan = vec!["Query Semantic Scholar for representative papers.".to_string()];
    if options.include_openalex {
        plan.push("Query OpenAlex works API for complementary records.".to_string());
    } else {
        plan.push("Skip OpenAlex enrichment (disabled).".to_string());
    }
    if options.include_citations {
        plan.push("Build citation edge list from OpenAlex references.".to_string());
    }
    plan
}

/// The single-page OpenAlex query backing the complementary records
pub fn build_search_query(query: &str, limit: usize) -> WorkQuery {
    let mut work_query = WorkQuery::new(query);
    work_query.select = SEARCH_SELECT_FIELDS.iter().map(|f| f.to_string()).collect();
    work_query.per_page = limit.clamp(1, MAX_OPENALEX_PAGE);
    work_query.max_pages = Some(1);
    work_query
}

/// Edges from each record to the works it references, at most `limit` in total
pub fn citation_edges(records: &[OpenAlexHit], limit: usize) -> Vec<CitationEdge> {
    records
        .iter()
        .filter_map(|record| {
            let source = record.id.as_deref().filter(|id| !id.is_empty())?;
            Some(record.referenced_works.iter().map(move |target| CitationEdge {
                source: source.to_string(),
                target: target.clone(),
            }))
        })
        .flatten()
        .take(limit)
        .collect()
}

async fn collect_openalex(
    services: &ResearchServices,
    query: &str,
    limit: usize,
) -> Result<Vec<OpenAlexHit>, SourceError> {
    let work_query = build_search_query(query, limit);
    let works: Vec<RawWork> = services
        .works
        .works(&work_query)
        .take(limit)
        .try_collect()
        .await?;
    tracing::debug!("Collected {} OpenAlex records", works.len());
    Ok(works.into_iter().map(OpenAlexHit::from).collect())
}

/// Gather papers for `options.query`.
///
/// Lookup failures never abort the search: each one becomes a note and the
/// affected list stays empty.
pub async fn run_paper_search(
    services: &ResearchServices,
    options: &PaperSearchOptions,
) -> PaperSearchArtifacts {
    tracing::info!(
        "Paper search for '{}' (limit {}, openalex {}, citations {})",
        options.query,
        options.limit,
        options.include_openalex,
        options.include_citations
    );

    let mut artifacts = PaperSearchArtifacts {
        query: options.query.clone(),
        ..Default::default()
    };

    if options.dry_run {
        tracing::info!("Dry run: returning plan only");
        artifacts.plan = Some(search_plan(options));
        return artifacts;
    }

    match &services.paper_search {
        Some(search) => match search.search(&options.query, options.limit).await {
            Ok(hits) => artifacts.semantic_scholar = hits,
            Err(e) => {
                tracing::warn!("{} search failed: {}", search.name(), e);
                artifacts.notes.push(format!("Semantic Scholar lookup failed: {}", e));
            }
        },
        None => artifacts
            .notes
            .push("Semantic Scholar source disabled; skipping paper search.".to_string()),
    }

    if options.include_openalex {
        match collect_openalex(services, &options.query, options.limit).await {
            Ok(records) => {
                if options.include_citations {
                    artifacts.citation_edges =
                        Some(citation_edges(&records, options.limit.saturating_mul(EDGES_PER_RECORD)));
                }
                artifacts.openalex = records;
            }
            Err(e) => {
                tracing::warn!("{} search failed: {}", services.works.name(), e);
                artifacts.notes.push(format!("OpenAlex lookup failed: {}", e));
            }
        }
    }

    artifacts
}
