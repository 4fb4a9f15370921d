//! Citation trend and gap analysis.
//!
//! The pipeline runs in one pass over an in-memory paper list:
//!
//! 1. [`collect_papers`]: keyword-gated, deduplicated ingestion of raw works
//! 2. [`enrich_papers`]: best-effort lookup of the most cited papers
//! 3. [`derive_top_questions`], [`summarise_trending_topics`] and
//!    [`identify_research_gaps`]: read-only aggregates over the final list

mod enrich;
mod gaps;
mod ingest;
mod questions;
mod trends;

pub use enrich::{apply_enrichment, enrich_papers, lookup_key, DEFAULT_ENRICH_LIMIT};
pub use gaps::{identify_research_gaps, TOP_GAPS};
pub use ingest::{
    collect_papers, count_keyword_hits, decode_abstract, normalise_doi, paper_from_work,
    prepare_keywords, ANCHOR_KEYWORD, DEFAULT_KEYWORDS, MIN_TOTAL_HITS,
};
pub use questions::{derive_top_questions, title_to_question, DEFAULT_QUESTION_LIMIT};
pub use trends::{linear_slope, summarise_trending_topics, ConceptSeries, MIN_CONCEPT_SCORE, TOP_TOPICS};

use crate::models::{CitationQuestion, PaperRecord, ResearchGap, TrendingTopic};

/// Aggregates derived from one paper set
#[derive(Debug, Clone, Default)]
pub struct CitationAnalysis {
    pub questions: Vec<CitationQuestion>,
    pub trending_topics: Vec<TrendingTopic>,
    pub research_gaps: Vec<ResearchGap>,
    pub concept_series: ConceptSeries,
}

/// Run the question, trend and gap passes over `papers`
pub fn analyse<S: AsRef<str>>(
    papers: &[PaperRecord],
    start_year: i32,
    end_year: i32,
    keywords: &[S],
    gap_suffix: &str,
) -> CitationAnalysis {
    let questions = derive_top_questions(papers, DEFAULT_QUESTION_LIMIT);
    let (trending_topics, concept_series) = summarise_trending_topics(papers, start_year, end_year);
    let research_gaps = identify_research_gaps(
        papers,
        &concept_series,
        start_year,
        end_year,
        keywords,
        gap_suffix,
    );
    CitationAnalysis {
        questions,
        trending_topics,
        research_gaps,
        concept_series,
    }
}
