//! Raw upstream payloads consumed by the analysis pipeline.
//!
//! Every field is optional: the ingestion gate decides what a usable record
//! is, so deserialisation never rejects a work for a missing field. Lists
//! that arrive as `null` read as empty, and an abstract index that is not an
//! object reads as absent. A work whose scalar fields have the wrong JSON
//! type fails to deserialise and is dropped by the caller.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::PaperHit;

/// An OpenAlex work as returned by `/works`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWork {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub cited_by_count: Option<i64>,
    pub doi: Option<String>,
    pub ids: Option<RawIds>,
    /// Word -> token position(s), in document order
    #[serde(default, deserialize_with = "object_or_none")]
    pub abstract_inverted_index: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authorships: Vec<RawAuthorship>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub concepts: Vec<RawConcept>,
    /// OpenAlex ids of the works this one cites
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referenced_works: Vec<String>,
    pub primary_location: Option<RawLocation>,
    pub host_venue: Option<RawVenue>,

    /// The untouched payload, kept for provenance
    #[serde(skip)]
    pub raw: Value,
}

impl RawWork {
    /// Deserialise a work, keeping the original payload for provenance
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut work: RawWork = serde_json::from_value(value.clone())?;
        work.raw = value;
        Ok(work)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn object_or_none<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIds {
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthorship {
    pub author: Option<RawAuthor>,
    pub raw_author_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConcept {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub level: Option<i64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    pub landing_page_url: Option<String>,
    pub pdf_url: Option<String>,
    pub source: Option<RawVenue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVenue {
    pub display_name: Option<String>,
    pub host_org: Option<String>,
}

/// Semantic Scholar paper lookup payload used for enrichment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentPayload {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub citation_count: Option<i64>,
    pub url: Option<String>,
    pub tldr: Option<Tldr>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tldr {
    pub text: Option<String>,
}

/// One `data` entry of a Semantic Scholar `/paper/search` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchPaper {
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<RawSearchAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSearchAuthor {
    pub name: Option<String>,
}

impl RawSearchPaper {
    /// Flatten into a display record; a missing title reads "unknown"
    pub fn into_hit(self) -> PaperHit {
        PaperHit {
            paper_id: self.paper_id,
            title: self.title.unwrap_or_else(|| "unknown".to_string()),
            year: self.year,
            url: self.url,
            abstract_text: self.abstract_text,
            authors: self
                .authors
                .into_iter()
                .filter_map(|a| a.name.filter(|n| !n.is_empty()))
                .collect(),
        }
    }
}
