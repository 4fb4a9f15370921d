//! Best-effort enrichment of the most cited papers.

use crate::models::{rank_by_citations, EnrichmentPayload, PaperRecord};
use crate::sources::EnrichmentSource;

/// Papers looked up per run unless configured otherwise
pub const DEFAULT_ENRICH_LIMIT: usize = 15;

const OPENALEX_WORK_PREFIX: &str = "https://openalex.org/";

/// Identifier used to look a paper up: `DOI:{doi}`, else the bare OpenAlex work id
pub fn lookup_key(paper: &PaperRecord) -> Option<String> {
    if let Some(ref doi) = paper.doi {
        return Some(format!("DOI:{}", doi));
    }
    paper
        .work_id
        .strip_prefix(OPENALEX_WORK_PREFIX)
        .and_then(|rest| rest.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Merge an enrichment payload into a paper.
///
/// The citation count only ever grows; the URL is replaced whenever one is
/// reported; the abstract is replaced by a strictly longer summary.
pub fn apply_enrichment(paper: &mut PaperRecord, payload: &EnrichmentPayload) {
    if let Some(count) = payload.citation_count {
        if count > 0 && count as u64 > paper.citation_count {
            paper.citation_count = count as u64;
        }
    }
    if let Some(ref url) = payload.url {
        paper.url = Some(url.clone());
    }
    if let Some(text) = payload.tldr.as_ref().and_then(|t| t.text.as_ref()) {
        if text.chars().count() > paper.abstract_text.chars().count() {
            paper.abstract_text = text.clone();
        }
    }
}

/// Look up the `limit` most cited papers one at a time and merge the results.
///
/// Returns the number of papers that received a payload. Lookup failures are
/// logged and leave the paper untouched.
pub async fn enrich_papers(
    source: &dyn EnrichmentSource,
    papers: &mut [PaperRecord],
    limit: usize,
) -> usize {
    let mut enriched = 0;
    for idx in rank_by_citations(papers).into_iter().take(limit) {
        let Some(key) = lookup_key(&papers[idx]) else {
            continue;
        };
        match source.lookup(&key).await {
            Ok(Some(payload)) => {
                apply_enrichment(&mut papers[idx], &payload);
                enriched += 1;
            }
            Ok(None) => tracing::debug!("No {} record for {}", source.name(), key),
            Err(e) => tracing::warn!("Enrichment lookup for {} via {} failed: {}", key, source.name(), e),
        }
    }
    tracing::debug!("Enriched {} of {} papers", enriched, papers.len().min(limit));
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tldr;
    use crate::sources::MockEnrichmentSource;

    fn paper(id: &str, citations: u64) -> PaperRecord {
        let mut paper = PaperRecord::new(id, format!("Paper {}", id), 2023);
        paper.citation_count = citations;
        paper
    }

    fn payload(citations: i64, url: Option<&str>, tldr: Option<&str>) -> EnrichmentPayload {
        EnrichmentPayload {
            citation_count: Some(citations),
            url: url.map(str::to_string),
            tldr: tldr.map(|t| Tldr {
                text: Some(t.to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_key() {
        let mut p = paper("https://openalex.org/W123", 1);
        assert_eq!(lookup_key(&p).as_deref(), Some("W123"));
        p.doi = Some("10.1/x".to_string());
        assert_eq!(lookup_key(&p).as_deref(), Some("DOI:10.1/x"));
        assert_eq!(lookup_key(&paper("W9", 1)), None);
    }

    #[test]
    fn test_citation_count_never_decreases() {
        let mut p = paper("W1", 100);
        apply_enrichment(&mut p, &payload(50, None, None));
        assert_eq!(p.citation_count, 100);
        apply_enrichment(&mut p, &payload(120, None, None));
        assert_eq!(p.citation_count, 120);
    }

    #[test]
    fn test_url_and_abstract_rules() {
        let mut p = paper("W1", 1);
        p.url = Some("https://old".to_string());
        p.abstract_text = "A fairly long original abstract.".to_string();

        apply_enrichment(&mut p, &payload(0, Some("https://new"), Some("Short.")));
        assert_eq!(p.url.as_deref(), Some("https://new"));
        assert_eq!(p.abstract_text, "A fairly long original abstract.");

        apply_enrichment(
            &mut p,
            &payload(0, None, Some("A considerably longer machine summary of the work.")),
        );
        assert_eq!(p.url.as_deref(), Some("https://new"));
        assert_eq!(p.abstract_text, "A considerably longer machine summary of the work.");
    }

    #[tokio::test]
    async fn test_enrich_top_papers_and_swallow_failures() {
        let mut papers = vec![
            paper("https://openalex.org/W1", 5),
            paper("https://openalex.org/W2", 50),
            paper("https://openalex.org/W3", 20),
            paper("https://openalex.org/W4", 1),
        ];
        papers[2].doi = Some("10.1/three".to_string());

        let source = MockEnrichmentSource::new()
            .with_payload("W2", payload(80, Some("https://s2/two"), None))
            .failing("DOI:10.1/three")
            .with_payload("W1", payload(9, None, None));

        let enriched = enrich_papers(&source, &mut papers, 3).await;

        assert_eq!(enriched, 2);
        assert_eq!(source.calls(), vec!["W2", "DOI:10.1/three", "W1"]);
        assert_eq!(papers[1].citation_count, 80);
        assert_eq!(papers[1].url.as_deref(), Some("https://s2/two"));
        assert_eq!(papers[2].citation_count, 20);
        assert_eq!(papers[0].citation_count, 9);
        assert_eq!(papers[3].citation_count, 1);
    }
}
