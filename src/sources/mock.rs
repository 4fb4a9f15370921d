//! Mock adapters for testing purposes.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crate::llm::{DeepResearchResult, LlmError, ResearchPrompt, SynthesisOptions, Synthesizer};
use crate::models::{EnrichmentPayload, PaperHit, RawWork};
use crate::sources::{
    EnrichmentSource, PaperSearchSource, Source, SourceCapabilities, SourceError, Verification,
    WorkQuery, WorkSource,
};
use crate::utils::ChartRenderer;

/// A work source that streams predefined works
#[derive(Debug, Default)]
pub struct MockWorkSource {
    works: Vec<RawWork>,
    fail_after: Option<(usize, String)>,
    queries: Mutex<Vec<WorkQuery>>,
}

impl MockWorkSource {
    pub fn new(works: Vec<RawWork>) -> Self {
        Self {
            works,
            ..Default::default()
        }
    }

    /// Build from raw JSON values, dropping any that do not deserialise
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .filter_map(|v| RawWork::from_value(v).ok())
                .collect(),
        )
    }

    /// Yield a network error after `count` works
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((count, message.into()));
        self
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<WorkQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Source for MockWorkSource {
    fn id(&self) -> &str {
        "mock_works"
    }

    fn name(&self) -> &str {
        "Mock Works"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::WORK_SEARCH
    }

    async fn verify(&self) -> Verification {
        Verification::ok("Mock works available.").detail("works", self.works.len())
    }
}

impl WorkSource for MockWorkSource {
    fn works<'a>(&'a self, query: &'a WorkQuery) -> BoxStream<'a, Result<RawWork, SourceError>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        let mut items: Vec<Result<RawWork, SourceError>> = Vec::new();
        match self.fail_after {
            Some((count, ref message)) => {
                items.extend(self.works.iter().take(count).cloned().map(Ok));
                items.push(Err(SourceError::Network(message.clone())));
            }
            None => items.extend(self.works.iter().cloned().map(Ok)),
        }
        Box::pin(stream::iter(items))
    }
}

/// An enrichment source backed by a lookup table
#[derive(Debug, Default)]
pub struct MockEnrichmentSource {
    payloads: HashMap<String, EnrichmentPayload>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockEnrichmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `paper_id` with `payload`
    pub fn with_payload(mut self, paper_id: impl Into<String>, payload: EnrichmentPayload) -> Self {
        self.payloads.insert(paper_id.into(), payload);
        self
    }

    /// Fail lookups of `paper_id` with a server error
    pub fn failing(mut self, paper_id: impl Into<String>) -> Self {
        self.failing.insert(paper_id.into());
        self
    }

    /// Identifiers looked up so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Source for MockEnrichmentSource {
    fn id(&self) -> &str {
        "mock_enrichment"
    }

    fn name(&self) -> &str {
        "Mock Enrichment"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::PAPER_LOOKUP
    }

    async fn verify(&self) -> Verification {
        Verification::ok("Mock enrichment available.")
    }
}

#[async_trait]
impl EnrichmentSource for MockEnrichmentSource {
    async fn lookup(&self, paper_id: &str) -> Result<Option<EnrichmentPayload>, SourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(paper_id.to_string());
        }
        if self.failing.contains(paper_id) {
            return Err(SourceError::Server(format!("lookup of {} failed", paper_id)));
        }
        Ok(self.payloads.get(paper_id).cloned())
    }
}

/// A paper search that answers every query with the same hits
#[derive(Debug, Default)]
pub struct MockPaperSearchSource {
    hits: Vec<PaperHit>,
    error: Option<String>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl MockPaperSearchSource {
    pub fn new(hits: Vec<PaperHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// Fail every search with a network error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Queries and limits received so far
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Source for MockPaperSearchSource {
    fn id(&self) -> &str {
        "mock_paper_search"
    }

    fn name(&self) -> &str {
        "Mock Paper Search"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::PAPER_SEARCH
    }

    async fn verify(&self) -> Verification {
        Verification::ok("Mock paper search available.")
    }
}

#[async_trait]
impl PaperSearchSource for MockPaperSearchSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PaperHit>, SourceError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((query.to_string(), limit));
        }
        if let Some(message) = &self.error {
            return Err(SourceError::Network(message.clone()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// A synthesiser that replies with canned text or fails
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    reply: Option<String>,
    error: Option<String>,
    prompts: Mutex<Vec<(ResearchPrompt, SynthesisOptions)>>,
}

impl MockSynthesizer {
    /// Answer every prompt with `text` as a single output block
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            ..Default::default()
        }
    }

    /// Fail every prompt with a request error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<(ResearchPrompt, SynthesisOptions)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        prompt: &ResearchPrompt,
        options: &SynthesisOptions,
    ) -> Result<DeepResearchResult, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.clone(), options.clone()));
        }
        if let Some(message) = &self.error {
            return Err(LlmError::Request(message.clone()));
        }
        let text = self.reply.clone().unwrap_or_default();
        Ok(DeepResearchResult::from_response(json!({
            "id": "resp_mock",
            "status": "completed",
            "output": [{"type": "output_text", "text": text}]
        })))
    }
}

/// A chart renderer that writes fixed bytes, or nothing when disabled
#[derive(Debug, Default)]
pub struct MockChartRenderer {
    unavailable: bool,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every render as failed without touching the destination
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Tool names and arguments received so far
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChartRenderer for MockChartRenderer {
    async fn render_bar_chart(&self, tool: &str, arguments: Value, destination: &Path) -> bool {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((tool.to_string(), arguments));
        }
        if self.unavailable {
            return false;
        }
        std::fs::write(destination, b"\x89PNG").is_ok()
    }
}
