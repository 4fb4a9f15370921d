//! Core data models for papers, upstream payloads and derived insights.

mod insights;
mod paper;
mod work;

pub use insights::{CitationQuestion, ResearchGap, TrendingTopic};
pub use paper::{rank_by_citations, Concept, PaperHit, PaperRecord, OPENALEX_SOURCE_ID};
pub use work::{
    EnrichmentPayload, RawAuthor, RawAuthorship, RawConcept, RawIds, RawLocation, RawSearchAuthor,
    RawSearchPaper, RawVenue, RawWork, Tldr,
};
