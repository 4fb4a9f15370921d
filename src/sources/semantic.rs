//! Semantic Scholar Graph API source.
//!
//! Reference: <https://api.semanticscholar.org/api-docs/graph>

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{EnrichmentPayload, PaperHit, RawSearchPaper};
use crate::sources::{
    EnrichmentSource, PaperSearchSource, Source, SourceCapabilities, SourceError, Verification,
};
use crate::utils::HttpClient;

pub const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Fields requested for enrichment lookups
pub const ENRICHMENT_FIELDS: &[&str] = &["title", "year", "citationCount", "url", "tldr"];

/// Fields requested for keyword searches
pub const SEARCH_FIELDS: &[&str] = &["title", "year", "url", "abstract", "authors"];

/// Largest page the search endpoint serves
const MAX_SEARCH_LIMIT: usize = 100;

const VERIFY_PAPER_ID: &str = "arXiv:1708.08021";

/// Slowest client-side rate honoured: one request per hour
const MIN_REQUESTS_PER_SECOND: f32 = 1.0 / 3600.0;

/// Semantic Scholar source
///
/// Requests are throttled client-side: the public API allows roughly one
/// request per second without a key.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    limiter: Throttle,
}

/// Shared request throttle
#[derive(Clone)]
struct Throttle(Arc<DefaultDirectRateLimiter>);

impl Throttle {
    fn new(quota: Quota) -> Self {
        Self(Arc::new(RateLimiter::direct(quota)))
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Throttle")
    }
}

impl SemanticScholarSource {
    /// Create a source against the public API
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key: std::env::var("SEMANTIC_SCHOLAR_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            limiter: Throttle::new(Quota::per_second(nonzero!(1u32))),
        }
    }

    /// Point the source at another base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use an API key (sent as `x-api-key`)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Replace the client-side request rate. Non-positive rates disable throttling;
    /// rates below one request per hour are clamped to it.
    pub fn with_requests_per_second(mut self, rps: f32) -> Self {
        let quota = if rps > 0.0 {
            Duration::try_from_secs_f32(1.0 / rps.max(MIN_REQUESTS_PER_SECOND))
                .ok()
                .and_then(Quota::with_period)
        } else {
            None
        };
        self.limiter = Throttle::new(quota.unwrap_or_else(|| Quota::per_second(nonzero!(10_000u32))));
        self
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        match self.api_key {
            Some(ref key) => vec![("x-api-key", key.clone())],
            None => Vec::new(),
        }
    }

    /// Fetch a paper by identifier
    pub async fn get_paper(&self, paper_id: &str, fields: &[&str]) -> Result<Value, SourceError> {
        if paper_id.trim().is_empty() {
            return Err(SourceError::InvalidRequest("Empty paper id".to_string()));
        }
        let mut params: Vec<(&str, String)> = Vec::new();
        if !fields.is_empty() {
            params.push(("fields", fields.join(",")));
        }

        self.limiter.0.until_ready().await;
        let payload = self
            .http
            .get_json_with(
                &self.build_url(&format!("/paper/{}", paper_id)),
                &params,
                &self.headers(),
            )
            .await?;
        if !payload.is_object() {
            return Err(SourceError::Parse(
                "Unexpected payload for Semantic Scholar paper lookup".to_string(),
            ));
        }
        Ok(payload)
    }

    /// Keyword search over papers
    pub async fn search_papers(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        fields: &[&str],
    ) -> Result<Value, SourceError> {
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.to_string()),
            ("limit", limit.min(MAX_SEARCH_LIMIT).to_string()),
            ("offset", offset.to_string()),
        ];
        if !fields.is_empty() {
            params.push(("fields", fields.join(",")));
        }

        self.limiter.0.until_ready().await;
        let payload = self
            .http
            .get_json_with(&self.build_url("/paper/search"), &params, &self.headers())
            .await?;
        if !payload.is_object() {
            return Err(SourceError::Parse(
                "Unexpected payload for Semantic Scholar search".to_string(),
            ));
        }
        Ok(payload)
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic_scholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::PAPER_LOOKUP | SourceCapabilities::PAPER_SEARCH
    }

    async fn verify(&self) -> Verification {
        match self.get_paper(VERIFY_PAPER_ID, &["title", "year"]).await {
            Ok(payload) => Verification::ok("Semantic Scholar API reachable.")
                .detail(
                    "sample_title",
                    payload.get("title").cloned().unwrap_or_else(|| Value::from("N/A")),
                )
                .detail("year", payload.get("year").cloned().unwrap_or(Value::Null)),
            Err(e) => Verification::failed(format!("Semantic Scholar API verification failed: {}", e)),
        }
    }
}

#[async_trait]
impl EnrichmentSource for SemanticScholarSource {
    async fn lookup(&self, paper_id: &str) -> Result<Option<EnrichmentPayload>, SourceError> {
        match self.get_paper(paper_id, ENRICHMENT_FIELDS).await {
            Ok(payload) => Ok(Some(serde_json::from_value(payload)?)),
            Err(SourceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl PaperSearchSource for SemanticScholarSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperHit>, SourceError> {
        if query.trim().is_empty() {
            return Err(SourceError::InvalidRequest("Empty search query".to_string()));
        }
        let mut payload = self.search_papers(query, limit, 0, SEARCH_FIELDS).await?;
        let data = match payload.get_mut("data").map(Value::take) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(SourceError::Parse(
                    "Semantic Scholar search payload missing 'data' list".to_string(),
                ))
            }
        };

        let mut hits = Vec::new();
        for item in data.into_iter().take(limit) {
            if !item.is_object() {
                continue;
            }
            match serde_json::from_value::<RawSearchPaper>(item) {
                Ok(paper) => hits.push(paper.into_hit()),
                Err(e) => tracing::debug!("Skipping malformed Semantic Scholar paper: {}", e),
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::RetryConfig;

    fn source(base: &str) -> SemanticScholarSource {
        SemanticScholarSource::new(HttpClient::new().unwrap().with_retry(RetryConfig::none()))
            .with_base_url(base)
            .with_api_key(Some("secret".to_string()))
            .with_requests_per_second(0.0)
    }

    #[tokio::test]
    async fn test_lookup_sends_key_and_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/DOI:10.1000/xyz")
            .match_header("x-api-key", "secret")
            .match_query(mockito::Matcher::UrlEncoded(
                "fields".into(),
                "title,year,citationCount,url,tldr".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"citationCount": 12, "url": "https://s2/abc", "tldr": {"text": "tl;dr"}}"#)
            .create_async()
            .await;

        let payload = source(&server.url())
            .lookup("DOI:10.1000/xyz")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payload.citation_count, Some(12));
        assert_eq!(payload.url.as_deref(), Some("https://s2/abc"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_not_found_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/W123")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error": "Paper not found"}"#)
            .create_async()
            .await;

        let result = source(&server.url()).lookup("W123").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_search_sends_query_limit_and_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_header("x-api-key", "secret")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("query".into(), "life cycle assessment".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
                mockito::Matcher::UrlEncoded("offset".into(), "0".into()),
                mockito::Matcher::UrlEncoded("fields".into(), "title,year,url,abstract,authors".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total": 3, "data": [
                    {"paperId": "p1", "title": "LCA of steel", "year": 2022, "authors": [{"name": "Kim"}]},
                    "garbage",
                    {"paperId": "p2", "title": "LCA of glass", "year": "soon"},
                    {"paperId": "p3", "title": "LCA of wood", "authors": null}
                ]}"#,
            )
            .create_async()
            .await;

        let hits = source(&server.url()).search("life cycle assessment", 250).await.unwrap();
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["LCA of steel", "LCA of wood"]);
        assert_eq!(hits[0].authors, vec!["Kim"]);
        assert!(hits[1].authors.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_truncates_to_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"data": [{"title": "First"}, {"title": "Second"}]}"#)
            .create_async()
            .await;

        let hits = source(&server.url()).search("lca", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "First");
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let err = source("http://127.0.0.1:9").search("  ", 5).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }

    #[test]
    fn test_tiny_rate_does_not_panic() {
        for rps in [1e-20_f32, f32::MIN_POSITIVE, f32::INFINITY, f32::NAN, -1.0] {
            let _ = source("http://127.0.0.1:9").with_requests_per_second(rps);
        }
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let err = source("http://127.0.0.1:9").get_paper(" ", &[]).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }
}
