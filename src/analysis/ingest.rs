//! Keyword-gated ingestion of raw works into [`PaperRecord`]s.

use futures_util::{Stream, StreamExt};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::models::{Concept, PaperRecord, RawWork, OPENALEX_SOURCE_ID};
use crate::sources::SourceError;

/// Keywords scanned in every paper unless the profile says otherwise
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "life cycle assessment",
    "lca",
    "sustainability",
    "planetary boundaries",
    "sustainable development goals",
    "sdg",
];

/// Keyword a retained paper must mention at least once
pub const ANCHOR_KEYWORD: &str = "life cycle assessment";

/// Minimum sum of keyword hits for a paper to be retained
pub const MIN_TOTAL_HITS: usize = 2;

/// Normalise `base` and append any new overrides, preserving order
pub fn prepare_keywords<S: AsRef<str>>(base: &[&str], overrides: &[S]) -> Vec<String> {
    let mut keywords: Vec<String> = base
        .iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect();
    for kw in overrides {
        let normalised = kw.as_ref().trim().to_lowercase();
        if !normalised.is_empty() && !keywords.contains(&normalised) {
            keywords.push(normalised);
        }
    }
    keywords
}

/// Count non-overlapping substring occurrences of each keyword in the
/// lower-cased `"{title} {abstract}"`. No word boundaries are applied.
pub fn count_keyword_hits<S: AsRef<str>>(
    title: &str,
    abstract_text: &str,
    keywords: &[S],
) -> BTreeMap<String, usize> {
    let text = format!("{} {}", title.to_lowercase(), abstract_text.to_lowercase());
    keywords
        .iter()
        .map(|kw| kw.as_ref())
        .filter(|kw| !kw.is_empty())
        .map(|kw| (kw.to_string(), text.matches(kw.to_lowercase().as_str()).count()))
        .collect()
}

/// Rebuild an abstract from an inverted index (word -> position or positions).
///
/// Later words overwrite earlier ones at the same position; positions no
/// word occupies are skipped.
pub fn decode_abstract(index: &Map<String, Value>) -> String {
    let mut positions: BTreeMap<usize, &str> = BTreeMap::new();
    for (word, slots) in index {
        match slots {
            Value::Array(items) => {
                for slot in items {
                    if let Some(pos) = slot.as_u64() {
                        positions.insert(pos as usize, word.as_str());
                    }
                }
            }
            Value::Number(n) => {
                if let Some(pos) = n.as_u64() {
                    positions.insert(pos as usize, word.as_str());
                }
            }
            _ => {}
        }
    }

    positions
        .values()
        .filter(|word| !word.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip `https://doi.org/` and `doi:` prefixes; empty becomes `None`
pub fn normalise_doi(doi: Option<&str>) -> Option<String> {
    let cleaned = doi?.trim();
    let cleaned = cleaned.strip_prefix("https://doi.org/").unwrap_or(cleaned);
    let cleaned = cleaned.strip_prefix("doi:").unwrap_or(cleaned);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Normalise a raw work. Returns `None` when identity fields are missing or
/// the relevance gate fails.
pub fn paper_from_work<S: AsRef<str>>(work: &RawWork, keywords: &[S], anchor: &str) -> Option<PaperRecord> {
    let work_id = work.id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let title = non_empty(work.display_name.as_ref())
        .or_else(|| non_empty(work.title.as_ref()))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let year = work.publication_year?;

    let abstract_text = work
        .abstract_inverted_index
        .as_ref()
        .map(decode_abstract)
        .unwrap_or_default();
    let keyword_hits = count_keyword_hits(title, &abstract_text, keywords);
    if keyword_hits.get(anchor).copied().unwrap_or(0) == 0 {
        return None;
    }
    if keyword_hits.values().sum::<usize>() < MIN_TOTAL_HITS {
        return None;
    }

    let doi = work
        .ids
        .as_ref()
        .and_then(|ids| non_empty(ids.doi.as_ref()))
        .or_else(|| non_empty(work.doi.as_ref()));

    let url = work.primary_location.as_ref().and_then(|loc| {
        non_empty(loc.landing_page_url.as_ref()).or_else(|| non_empty(loc.pdf_url.as_ref()))
    });

    let journal = work
        .host_venue
        .as_ref()
        .and_then(|venue| {
            non_empty(venue.display_name.as_ref()).or_else(|| non_empty(venue.host_org.as_ref()))
        })
        .or_else(|| {
            work.primary_location
                .as_ref()
                .and_then(|loc| loc.source.as_ref())
                .and_then(|source| non_empty(source.display_name.as_ref()))
        });

    let authors = work
        .authorships
        .iter()
        .filter_map(|entry| match entry.author {
            Some(ref author) => non_empty(author.display_name.as_ref()),
            None => non_empty(entry.raw_author_name.as_ref()),
        })
        .map(str::to_string)
        .collect();

    let concepts = work
        .concepts
        .iter()
        .filter_map(|c| {
            Some(Concept {
                id: c.id.clone(),
                display_name: c.display_name.clone()?,
                level: c.level,
                score: c.score,
            })
        })
        .collect();

    let mut extra = Map::new();
    extra.insert(
        "publication_date".to_string(),
        work.publication_date.clone().map(Value::from).unwrap_or(Value::Null),
    );
    extra.insert("raw_payload".to_string(), work.raw.clone());

    Some(PaperRecord {
        source_id: OPENALEX_SOURCE_ID.to_string(),
        work_id: work_id.to_string(),
        title: title.to_string(),
        year,
        citation_count: work.cited_by_count.unwrap_or(0).max(0) as u64,
        doi: normalise_doi(doi),
        url: url.map(str::to_string),
        journal: journal.map(str::to_string),
        authors,
        abstract_text,
        concepts,
        keyword_hits,
        extra,
    })
}

/// Drain a stream of raw works into deduplicated, gated papers.
///
/// Stops after `max_records` papers or when the stream ends. The first
/// upstream error aborts collection.
pub async fn collect_papers<St, S>(
    works: St,
    keywords: &[S],
    anchor: &str,
    max_records: usize,
) -> Result<Vec<PaperRecord>, SourceError>
where
    St: Stream<Item = Result<RawWork, SourceError>>,
    S: AsRef<str>,
{
    let mut papers = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut dropped = 0usize;
    if max_records == 0 {
        return Ok(papers);
    }

    futures_util::pin_mut!(works);
    while let Some(item) = works.next().await {
        let work = item?;
        let Some(paper) = paper_from_work(&work, keywords, anchor) else {
            dropped += 1;
            continue;
        };
        if !seen.insert(paper.work_id.clone()) {
            continue;
        }
        papers.push(paper);
        if papers.len() >= max_records {
            break;
        }
    }

    tracing::debug!(
        "Collected {} papers ({} works dropped by the relevance gate or missing fields)",
        papers.len(),
        dropped
    );
    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde_json::json;

    fn keywords() -> Vec<String> {
        prepare_keywords::<&str>(DEFAULT_KEYWORDS, &[])
    }

    fn work(value: Value) -> RawWork {
        RawWork::from_value(value).unwrap()
    }

    fn lca_work(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "display_name": title,
            "publication_year": 2023,
            "cited_by_count": 10,
            "abstract_inverted_index": {"life": [0], "cycle": [1], "assessment": [2]}
        })
    }

    #[test]
    fn test_prepare_keywords() {
        let kws = prepare_keywords(DEFAULT_KEYWORDS, &["  Circularity ", "LCA", ""]);
        assert_eq!(kws.len(), 7);
        assert_eq!(kws.last().map(String::as_str), Some("circularity"));
    }

    #[test]
    fn test_keyword_hits_are_substring_counts() {
        let hits = count_keyword_hits("LCA of alcaline soils", "falcate leaves", &["lca"]);
        assert_eq!(hits["lca"], 3);
    }

    #[test]
    fn test_decode_abstract() {
        let index = json!({"hello": [0], "world": [1]});
        assert_eq!(decode_abstract(index.as_object().unwrap()), "hello world");
        assert_eq!(decode_abstract(&Map::new()), "");

        let index = json!({"a": [0, 3], "b": 1, "c": [1], "bad": [-1, "x"]});
        assert_eq!(decode_abstract(index.as_object().unwrap()), "a c a");
    }

    #[test]
    fn test_normalise_doi() {
        assert_eq!(normalise_doi(Some("https://doi.org/10.1/x")).as_deref(), Some("10.1/x"));
        assert_eq!(normalise_doi(Some("doi:10.1/x")).as_deref(), Some("10.1/x"));
        assert_eq!(normalise_doi(Some("  ")), None);
        assert_eq!(normalise_doi(None), None);
    }

    #[test]
    fn test_missing_identity_fields_are_excluded() {
        let kws = keywords();
        let mut value = lca_work("W1", "Life cycle assessment of steel");
        value["publication_year"] = Value::Null;
        assert!(paper_from_work(&work(value), &kws, ANCHOR_KEYWORD).is_none());

        let value = lca_work("", "Life cycle assessment of steel");
        assert!(paper_from_work(&work(value), &kws, ANCHOR_KEYWORD).is_none());

        let mut value = lca_work("W1", "");
        value["abstract_inverted_index"] = json!({});
        assert!(paper_from_work(&work(value), &kws, ANCHOR_KEYWORD).is_none());
    }

    #[test]
    fn test_single_anchor_hit_is_excluded() {
        let value = json!({"id": "W1", "display_name": "A life cycle assessment of steel", "publication_year": 2022});
        assert!(paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).is_none());
    }

    #[test]
    fn test_double_anchor_hit_is_included() {
        let value = lca_work("W1", "Life cycle assessment of steel");
        let paper = paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).unwrap();
        assert_eq!(paper.hits("life cycle assessment"), 2);
        assert_eq!(paper.total_hits(), 2);
    }

    #[test]
    fn test_null_concepts_still_pass_the_gate() {
        let mut value = lca_work("W1", "Life cycle assessment of steel");
        value["concepts"] = Value::Null;
        value["authorships"] = Value::Null;
        let paper = paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).unwrap();
        assert!(paper.concepts.is_empty());
        assert!(paper.authors.is_empty());
    }

    #[test]
    fn test_no_anchor_is_excluded() {
        let value = json!({
            "id": "W1",
            "display_name": "Sustainability and SDG progress",
            "publication_year": 2022
        });
        assert!(paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).is_none());
    }

    #[test]
    fn test_field_mapping() {
        let value = json!({
            "id": "https://openalex.org/W42",
            "display_name": "  Life cycle assessment for sustainability  ",
            "title": "ignored",
            "publication_year": 2021,
            "publication_date": "2021-03-01",
            "cited_by_count": 77,
            "doi": "https://doi.org/10.9/other",
            "ids": {"doi": "https://doi.org/10.1/abc"},
            "authorships": [
                {"author": {"display_name": "Ada"}},
                {"raw_author_name": "Grace"},
                {"author": {"display_name": ""}, "raw_author_name": "Skipped"}
            ],
            "concepts": [
                {"id": "C1", "display_name": "Carbon footprint", "level": 2, "score": 0.6},
                {"id": "C2", "score": 0.9}
            ],
            "primary_location": {
                "landing_page_url": null,
                "pdf_url": "https://example.org/p.pdf",
                "source": {"display_name": "Fallback Journal"}
            },
            "host_venue": {"display_name": null, "host_org": "Elsevier"}
        });
        let paper = paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).unwrap();
        assert_eq!(paper.work_id, "https://openalex.org/W42");
        assert_eq!(paper.title, "Life cycle assessment for sustainability");
        assert_eq!(paper.citation_count, 77);
        assert_eq!(paper.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(paper.url.as_deref(), Some("https://example.org/p.pdf"));
        assert_eq!(paper.journal.as_deref(), Some("Elsevier"));
        assert_eq!(paper.authors, vec!["Ada", "Grace"]);
        assert_eq!(paper.concepts.len(), 1);
        assert_eq!(paper.concepts[0].display_name, "Carbon footprint");
        assert_eq!(paper.extra["publication_date"], "2021-03-01");
        assert_eq!(paper.extra["raw_payload"]["cited_by_count"], 77);
    }

    #[test]
    fn test_journal_falls_back_to_location_source() {
        let mut value = lca_work("W1", "Life cycle assessment of steel");
        value["primary_location"] = json!({"source": {"display_name": "Journal of Cleaner Production"}});
        let paper = paper_from_work(&work(value), &keywords(), ANCHOR_KEYWORD).unwrap();
        assert_eq!(paper.journal.as_deref(), Some("Journal of Cleaner Production"));
    }

    #[tokio::test]
    async fn test_collect_dedupes_and_caps() {
        let works = vec![
            Ok(work(lca_work("W1", "Life cycle assessment A"))),
            Ok(work(lca_work("W1", "Life cycle assessment duplicate"))),
            Ok(work(json!({"id": "W2", "display_name": "Off topic", "publication_year": 2020}))),
            Ok(work(lca_work("W3", "Life cycle assessment B"))),
            Ok(work(lca_work("W4", "Life cycle assessment C"))),
        ];
        let papers = collect_papers(stream::iter(works), &keywords(), ANCHOR_KEYWORD, 2)
            .await
            .unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.work_id.as_str()).collect();
        assert_eq!(ids, vec!["W1", "W3"]);
        assert_eq!(papers[0].title, "Life cycle assessment A");
    }

    #[tokio::test]
    async fn test_collect_propagates_upstream_error() {
        let works = vec![
            Ok(work(lca_work("W1", "Life cycle assessment A"))),
            Err(SourceError::Server("HTTP 503".to_string())),
        ];
        let result = collect_papers(stream::iter(works), &keywords(), ANCHOR_KEYWORD, 10).await;
        assert!(matches!(result, Err(SourceError::Server(_))));
    }
}
