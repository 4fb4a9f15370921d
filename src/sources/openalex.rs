//! OpenAlex works source.
//!
//! Reference: <https://docs.openalex.org/api-entities/works>

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::models::RawWork;
use crate::sources::{Source, SourceCapabilities, SourceError, Verification, WorkQuery, WorkSource};
use crate::utils::HttpClient;

pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Work fetched during verification
const VERIFY_WORK_ID: &str = "W3186199070";

/// OpenAlex source
///
/// Uses the OpenAlex REST API with cursor pagination.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    http: HttpClient,
    base_url: String,
    email: Option<String>,
}

impl OpenAlexSource {
    /// Create a source against the public API
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: OPENALEX_API_BASE.to_string(),
            email: std::env::var("OPENALEX_EMAIL").ok().filter(|e| !e.is_empty()),
        }
    }

    /// Point the source at another base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Join the polite pool with a contact email
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.is_empty());
        self
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn polite_params(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(ref email) = self.email {
            params.push(("mailto", email.clone()));
        }
    }

    /// Fetch one page of `/works` results for the given cursor
    pub async fn search_works(&self, query: &WorkQuery, cursor: &str) -> Result<WorksPage, SourceError> {
        let mut params: Vec<(&'static str, String)> = vec![
            ("cursor", cursor.to_string()),
            ("per-page", query.per_page.clamp(1, 200).to_string()),
        ];
        if let Some(ref search) = query.search {
            params.push(("search", search.clone()));
        }
        if let Some(filter) = query.serialise_filters() {
            params.push(("filter", filter));
        }
        if let Some(ref sort) = query.sort {
            params.push(("sort", sort.clone()));
        }
        if !query.select.is_empty() {
            params.push(("select", query.select.join(",")));
        }
        self.polite_params(&mut params);

        let payload = self.http.get_json(&self.build_url("/works"), &params).await?;
        WorksPage::from_payload(payload)
    }

    /// Fetch a single work by OpenAlex id
    pub async fn get_work(&self, work_id: &str, select: &[&str]) -> Result<Value, SourceError> {
        let mut params: Vec<(&'static str, String)> = Vec::new();
        if !select.is_empty() {
            params.push(("select", select.join(",")));
        }
        self.polite_params(&mut params);

        let payload = self
            .http
            .get_json(&self.build_url(&format!("/works/{}", work_id)), &params)
            .await?;
        if !payload.is_object() {
            return Err(SourceError::Parse(
                "Unexpected payload from OpenAlex work lookup".to_string(),
            ));
        }
        Ok(payload)
    }
}

/// One page of works search results
#[derive(Debug, Clone)]
pub struct WorksPage {
    /// Works that deserialised cleanly
    pub works: Vec<RawWork>,

    /// Number of results dropped because they could not be deserialised
    pub skipped: usize,

    /// Cursor for the next page, if any
    pub next_cursor: Option<String>,
}

impl WorksPage {
    fn from_payload(payload: Value) -> Result<Self, SourceError> {
        let Value::Object(mut map) = payload else {
            return Err(SourceError::Parse(
                "Unexpected payload from OpenAlex works search".to_string(),
            ));
        };

        let results = match map.remove("results") {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(SourceError::Parse(
                    "OpenAlex works payload missing 'results' list".to_string(),
                ))
            }
        };

        let next_cursor = match map.get("meta") {
            Some(Value::Object(meta)) => meta
                .get("next_cursor")
                .and_then(|c| match c {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            None | Some(Value::Null) => None,
            Some(_) => {
                return Err(SourceError::Parse(
                    "OpenAlex works payload missing 'meta' dictionary".to_string(),
                ))
            }
        };

        let mut works = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for item in results {
            if !item.is_object() {
                skipped += 1;
                continue;
            }
            match RawWork::from_value(item) {
                Ok(work) => works.push(work),
                Err(e) => {
                    tracing::debug!("Skipping malformed OpenAlex work: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            works,
            skipped,
            next_cursor,
        })
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::WORK_SEARCH | SourceCapabilities::PAPER_LOOKUP
    }

    async fn verify(&self) -> Verification {
        match self
            .get_work(VERIFY_WORK_ID, &["id", "display_name", "cited_by_count"])
            .await
        {
            Ok(payload) => Verification::ok("OpenAlex API reachable.")
                .detail("sample_work", payload.get("display_name").cloned().unwrap_or(Value::Null))
                .detail(
                    "cited_by_count",
                    payload.get("cited_by_count").cloned().unwrap_or(Value::Null),
                ),
            Err(e) => Verification::failed(format!("OpenAlex API verification failed: {}", e)),
        }
    }
}

impl WorkSource for OpenAlexSource {
    fn works<'a>(&'a self, query: &'a WorkQuery) -> BoxStream<'a, Result<RawWork, SourceError>> {
        Box::pin(try_stream! {
            let mut cursor = "*".to_string();
            let mut pages = 0usize;
            loop {
                let page = self.search_works(query, &cursor).await?;
                pages += 1;
                tracing::debug!(
                    "OpenAlex page {} returned {} works ({} skipped)",
                    pages,
                    page.works.len(),
                    page.skipped
                );

                for work in page.works {
                    yield work;
                }

                let Some(next) = page.next_cursor else {
                    break;
                };
                if query.max_pages.is_some_and(|max| pages >= max) {
                    break;
                }
                cursor = next;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_from_payload() {
        let page = WorksPage::from_payload(json!({
            "results": [
                {"id": "W1", "display_name": "One", "publication_year": 2023},
                {"id": "W2", "publication_year": "not a year"},
                "garbage"
            ],
            "meta": {"next_cursor": "abc"}
        }))
        .unwrap();

        assert_eq!(page.works.len(), 1);
        assert_eq!(page.skipped, 2);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_page_keeps_works_with_null_lists() {
        let page = WorksPage::from_payload(json!({
            "results": [{
                "id": "W1",
                "display_name": "One",
                "concepts": null,
                "authorships": null,
                "abstract_inverted_index": []
            }],
            "meta": {"next_cursor": null}
        }))
        .unwrap();
        assert_eq!(page.works.len(), 1);
        assert_eq!(page.skipped, 0);
    }

    #[test]
    fn test_page_without_cursor_ends_pagination() {
        let page = WorksPage::from_payload(json!({"results": [], "meta": {"next_cursor": null}})).unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_page_rejects_bad_shapes() {
        assert!(WorksPage::from_payload(json!([])).is_err());
        assert!(WorksPage::from_payload(json!({"results": {}})).is_err());
        assert!(WorksPage::from_payload(json!({"results": [], "meta": []})).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let source = OpenAlexSource::new(HttpClient::new().unwrap()).with_base_url("http://localhost:1/");
        assert_eq!(source.build_url("/works"), "http://localhost:1/works");
    }
}
