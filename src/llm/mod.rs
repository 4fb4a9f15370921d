//! LLM synthesis for the deep research report.
//!
//! [`Synthesizer`] is the seam the workflow depends on; [`DeepResearchClient`]
//! implements it against the OpenAI Responses API.

mod openai;

pub use openai::{DeepResearchClient, DEFAULT_DEEP_RESEARCH_MODEL, OPENAI_API_BASE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The research request sent to a synthesiser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchPrompt {
    /// Main research question
    pub question: String,

    /// Extra context that always accompanies the question
    pub context: Option<String>,

    /// Numbered subtasks answered after the main question
    pub follow_up_questions: Vec<String>,
}

impl ResearchPrompt {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_follow_ups<I, S>(mut self, follow_ups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.follow_up_questions = follow_ups.into_iter().map(Into::into).collect();
        self
    }

    /// Render the prompt as a single text block
    pub fn to_message_block(&self) -> String {
        let mut parts = vec![self.question.trim().to_string()];
        if let Some(context) = self.context.as_deref().filter(|c| !c.is_empty()) {
            parts.push(format!("\nContext:\n{}", context.trim()));
        }
        if !self.follow_up_questions.is_empty() {
            let lines: Vec<String> = self
                .follow_up_questions
                .iter()
                .enumerate()
                .map(|(idx, item)| format!("{}. {}", idx + 1, item.trim()))
                .collect();
            parts.push(format!("\nFollow-up Questions:\n{}", lines.join("\n")));
        }
        parts.join("\n").trim().to_string()
    }
}

/// Per-request options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    /// Developer instructions constraining the agent
    pub instructions: Option<String>,

    /// Upper bound on tool invocations
    pub max_tool_calls: Option<u32>,
}

/// A completed synthesis response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepResearchResult {
    pub id: Option<String>,

    /// Full response body
    pub response: Value,
}

impl DeepResearchResult {
    pub fn from_response(response: Value) -> Self {
        Self {
            id: response.get("id").and_then(Value::as_str).map(str::to_string),
            response,
        }
    }

    /// Concatenate the text outputs, separated by blank lines
    pub fn output_text(&self) -> String {
        let mut chunks: Vec<&str> = Vec::new();
        let items = self
            .response
            .get("output")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for item in items {
            match item.get("type").and_then(Value::as_str) {
                Some("output_text") => {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        chunks.push(text);
                    }
                }
                Some("message") => {
                    let contents = item
                        .get("content")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    chunks.extend(contents.iter().filter_map(|c| c.get("text").and_then(Value::as_str)));
                }
                _ => {}
            }
        }

        chunks
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Something that turns a research prompt into a written synthesis
#[async_trait]
pub trait Synthesizer: Send + Sync + std::fmt::Debug {
    async fn synthesize(
        &self,
        prompt: &ResearchPrompt,
        options: &SynthesisOptions,
    ) -> Result<DeepResearchResult, LlmError>;
}

/// Errors raised by synthesisers
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("OpenAI API key missing. Set OPENAI_API_KEY or [api_keys].openai")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
