//! OpenAI Responses API client with Deep Research defaults.
//!
//! Reference: <https://platform.openai.com/docs/guides/deep-research>

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

use super::{DeepResearchResult, LlmError, ResearchPrompt, SynthesisOptions, Synthesizer};
use crate::sources::{Source, SourceCapabilities, Verification};
use crate::utils::HttpClient;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub const DEFAULT_DEEP_RESEARCH_MODEL: &str = "o4-mini-deep-research";

/// Deep Research client
#[derive(Clone)]
pub struct DeepResearchClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
    reasoning_effort: Option<String>,
    web_search: bool,
}

impl std::fmt::Debug for DeepResearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepResearchClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl DeepResearchClient {
    /// Create a client using `OPENAI_API_KEY`
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: OPENAI_API_BASE.to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: DEFAULT_DEEP_RESEARCH_MODEL.to_string(),
            reasoning_effort: Some("medium".to_string()),
            web_search: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// `None` omits the `reasoning` block
    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the `/responses` request body
    pub fn build_request(&self, prompt: &ResearchPrompt, options: &SynthesisOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": [{
                "role": "user",
                "content": [{"type": "input_text", "text": prompt.to_message_block()}],
            }],
        });

        if let Some(instructions) = options.instructions.as_deref().filter(|i| !i.is_empty()) {
            body["instructions"] = Value::from(instructions);
        }
        if let Some(ref effort) = self.reasoning_effort {
            body["reasoning"] = json!({"effort": effort});
        }
        if self.web_search {
            body["tools"] = json!([{"type": "web_search_preview"}]);
        }
        if let Some(max) = options.max_tool_calls {
            body["max_tool_calls"] = Value::from(max);
        }
        body
    }
}

#[async_trait]
impl Synthesizer for DeepResearchClient {
    async fn synthesize(
        &self,
        prompt: &ResearchPrompt,
        options: &SynthesisOptions,
    ) -> Result<DeepResearchResult, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!("{}/responses", self.base_url);
        let body = self.build_request(prompt, options);

        tracing::debug!("Submitting Deep Research request to {} with model {}", url, self.model);
        let response = self
            .http
            .client()
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        if !payload.is_object() {
            return Err(LlmError::InvalidResponse("Expected a JSON object".to_string()));
        }
        Ok(DeepResearchResult::from_response(payload))
    }
}

#[async_trait]
impl Source for DeepResearchClient {
    fn id(&self) -> &str {
        "openai_deep_research"
    }

    fn name(&self) -> &str {
        "OpenAI Deep Research"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SYNTHESIS
    }

    async fn verify(&self) -> Verification {
        match self.api_key {
            Some(_) => Verification::ok("OpenAI API key configured.").detail("model", self.model.as_str()),
            None => Verification::failed(LlmError::MissingApiKey.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str, key: Option<&str>) -> DeepResearchClient {
        DeepResearchClient::new(HttpClient::new().unwrap())
            .with_base_url(base)
            .with_api_key(key.map(str::to_string))
    }

    #[test]
    fn test_build_request() {
        let body = client("http://localhost", Some("k")).build_request(
            &ResearchPrompt::new("Q"),
            &SynthesisOptions {
                instructions: Some("Be brief.".to_string()),
                max_tool_calls: Some(30),
            },
        );
        assert_eq!(body["model"], DEFAULT_DEEP_RESEARCH_MODEL);
        assert_eq!(body["input"][0]["content"][0]["text"], "Q");
        assert_eq!(body["instructions"], "Be brief.");
        assert_eq!(body["reasoning"]["effort"], "medium");
        assert_eq!(body["tools"][0]["type"], "web_search_preview");
        assert_eq!(body["max_tool_calls"], 30);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let err = client("http://127.0.0.1:9", None)
            .synthesize(&ResearchPrompt::new("Q"), &SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_synthesize_posts_to_responses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/responses")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "resp_9", "output": [{"type": "output_text", "text": "Summary"}]}"#)
            .create_async()
            .await;

        let result = client(&server.url(), Some("secret"))
            .synthesize(&ResearchPrompt::new("Q"), &SynthesisOptions::default())
            .await
            .unwrap();
        assert_eq!(result.output_text(), "Summary");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client(&server.url(), Some("bad"))
            .synthesize(&ResearchPrompt::new("Q"), &SynthesisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }
}
