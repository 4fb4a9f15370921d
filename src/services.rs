//! Service wiring: adapters built from [`Config`] and bundled for the workflows.

use std::sync::Arc;

use crate::config::Config;
use crate::llm::{DeepResearchClient, Synthesizer};
use crate::sources::{
    EnrichmentSource, OpenAlexSource, PaperSearchSource, SemanticScholarSource, SourceError,
    SourceRegistry, WorkSource,
};
use crate::utils::{ChartClient, ChartRenderer, HttpClient, USER_AGENT};

/// The collaborators a workflow run talks to
#[derive(Debug, Clone)]
pub struct ResearchServices {
    /// Paginated literature search
    pub works: Arc<dyn WorkSource>,

    /// Per-paper enrichment; skipped when absent
    pub enrichment: Option<Arc<dyn EnrichmentSource>>,

    /// Free-text paper search; skipped when absent
    pub paper_search: Option<Arc<dyn PaperSearchSource>>,

    /// Trend chart rendering; skipped when absent
    pub chart: Option<Arc<dyn ChartRenderer>>,

    /// Deep Research synthesis
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl ResearchServices {
    /// Services with only a work source
    pub fn new(works: Arc<dyn WorkSource>) -> Self {
        Self {
            works,
            enrichment: None,
            paper_search: None,
            chart: None,
            synthesizer: None,
        }
    }

    pub fn with_enrichment(mut self, enrichment: Arc<dyn EnrichmentSource>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    pub fn with_paper_search(mut self, paper_search: Arc<dyn PaperSearchSource>) -> Self {
        self.paper_search = Some(paper_search);
        self
    }

    pub fn with_chart(mut self, chart: Arc<dyn ChartRenderer>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Build the live adapters described by `config`
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let http = http_client(config)?;

        let mut services = Self::new(Arc::new(openalex(config, &http)));
        if config.semantic_scholar.enabled {
            let semantic = Arc::new(semantic_scholar(config, &http));
            services = services
                .with_enrichment(semantic.clone())
                .with_paper_search(semantic);
        }
        if config.chart.enabled {
            services = services.with_chart(Arc::new(chart_client(config, &http)));
        }
        Ok(services.with_synthesizer(Arc::new(deep_research_client(config, &http))))
    }
}

/// Shared HTTP client honouring the `[http]` settings
pub fn http_client(config: &Config) -> Result<HttpClient, SourceError> {
    Ok(HttpClient::with_settings(USER_AGENT, config.http.timeout())?.with_retry(config.http.retry()))
}

fn openalex(config: &Config, http: &HttpClient) -> OpenAlexSource {
    OpenAlexSource::new(http.clone())
        .with_base_url(&config.openalex.base_url)
        .with_email(config.openalex.mailto.clone())
}

fn semantic_scholar(config: &Config, http: &HttpClient) -> SemanticScholarSource {
    SemanticScholarSource::new(http.clone())
        .with_base_url(&config.semantic_scholar.base_url)
        .with_api_key(config.api_keys.semantic_scholar.clone())
        .with_requests_per_second(config.semantic_scholar.requests_per_second)
}

fn chart_client(config: &Config, http: &HttpClient) -> ChartClient {
    ChartClient::new(http.clone(), &config.chart.endpoint)
}

fn deep_research_client(config: &Config, http: &HttpClient) -> DeepResearchClient {
    let effort = Some(config.openai.reasoning_effort.clone()).filter(|e| !e.is_empty());
    DeepResearchClient::new(http.clone())
        .with_base_url(&config.openai.base_url)
        .with_api_key(config.api_keys.openai.clone())
        .with_model(&config.openai.deep_research_model)
        .with_reasoning_effort(effort)
}

/// Every adapter `config` describes, for listing and verification.
///
/// Disabled adapters are still registered so they can be verified.
pub fn build_registry(config: &Config) -> Result<SourceRegistry, SourceError> {
    let http = http_client(config)?;
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(openalex(config, &http)));
    registry.register(Arc::new(semantic_scholar(config, &http)));
    registry.register(Arc::new(chart_client(config, &http)));
    registry.register(Arc::new(deep_research_client(config, &http)));
    Ok(registry)
}
