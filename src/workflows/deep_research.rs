//! Deep research: the citation scan wrapped in an LLM synthesis report.

use chrono::Utc;
use std::path::PathBuf;

use super::citations::{run_citation_workflow, year_window, current_year, CitationArtifacts, CitationWorkflowOptions};
use super::profiles::DeepResearchProfile;
use super::report::{render_deep_report, DeepReportContext};
use super::WorkflowError;
use crate::analysis::DEFAULT_ENRICH_LIMIT;
use crate::llm::{ResearchPrompt, SynthesisOptions};
use crate::services::ResearchServices;

/// Tool invocations allowed per synthesis request
pub const MAX_TOOL_CALLS: u32 = 30;

/// File holding the raw synthesis response
pub const RESPONSE_FILENAME: &str = "deep_research.json";

/// Entries per section in the prompt context
const CONTEXT_ITEMS: usize = 5;

/// Inputs for one deep research run
#[derive(Debug, Clone)]
pub struct DeepResearchOptions {
    /// Directory receiving every artefact
    pub output_dir: PathBuf,
    pub years: u32,
    pub max_records: usize,
    pub max_pages: usize,
    pub enrich_limit: usize,

    /// Keyword overrides for the citation scan
    pub keywords: Vec<String>,

    /// Call the synthesiser; when false only deterministic outputs are produced
    pub deep_research: bool,

    /// Replaces the profile's prompt question
    pub prompt_override: Option<String>,

    /// Replaces the profile's instructions
    pub instructions_override: Option<String>,

    /// Plan the artefact paths without touching the network or disk
    pub dry_run: bool,
}

impl DeepResearchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            years: 5,
            max_records: 200,
            max_pages: 10,
            enrich_limit: DEFAULT_ENRICH_LIMIT,
            keywords: Vec::new(),
            deep_research: true,
            prompt_override: None,
            instructions_override: None,
            dry_run: false,
        }
    }
}

/// Everything a deep research run produced (or, for a dry run, would produce)
#[derive(Debug, Clone)]
pub struct DeepResearchArtifacts {
    pub final_report_path: PathBuf,
    pub citation_report_path: PathBuf,
    pub chart_path: Option<PathBuf>,
    pub raw_data_path: Option<PathBuf>,

    /// Executive summary text, or the reason synthesis was unavailable
    pub summary: Option<String>,
    pub response_path: Option<PathBuf>,
    pub citation: CitationArtifacts,
    pub dry_run: bool,
}

/// Summarise the scan for the synthesis prompt. Empty when the scan found nothing.
pub fn build_prompt_context(artifacts: &CitationArtifacts) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !artifacts.questions.is_empty() {
        lines.push("Top citation questions:".into());
        for item in artifacts.questions.iter().take(CONTEXT_ITEMS) {
            lines.push(format!(
                "- {} ({} citations, {}); DOI: {}",
                item.paper_title,
                item.citation_count,
                item.publication_year,
                item.doi.as_deref().unwrap_or("N/A")
            ));
        }
    }
    if !artifacts.trending_topics.is_empty() {
        lines.push("\nTrending concepts with positive citation slopes:".into());
        for topic in artifacts.trending_topics.iter().take(CONTEXT_ITEMS) {
            lines.push(format!(
                "- {} (trend score {:+.2}, recent share {:.1}%)",
                topic.topic,
                topic.trend_score,
                topic.recent_share * 100.0
            ));
        }
    }
    if !artifacts.research_gaps.is_empty() {
        lines.push("\nSparse but high-impact gaps:".into());
        for gap in artifacts.research_gaps.iter().take(CONTEXT_ITEMS) {
            lines.push(format!(
                "- {} ({} papers, {:.1} average citations) — {}",
                gap.topic, gap.paper_count, gap.avg_citations, gap.rationale
            ));
        }
    }
    lines.join("\n").trim().to_string()
}

/// Prompt for the synthesiser: the profile question (or an override) with the
/// scan summary as context, falling back to the profile's context template
pub fn build_prompt(
    profile: &DeepResearchProfile,
    artifacts: &CitationArtifacts,
    years: u32,
    prompt_override: Option<&str>,
) -> ResearchPrompt {
    let mut prompt = match prompt_override.map(str::trim).filter(|q| !q.is_empty()) {
        Some(question) => ResearchPrompt::new(question),
        None => ResearchPrompt::new(profile.prompt_question)
            .with_follow_ups(profile.prompt_follow_ups.iter().copied())
            .with_context(profile.prompt_context(years)),
    };
    let context = build_prompt_context(artifacts);
    if !context.is_empty() {
        prompt.context = Some(context);
    } else if prompt.context.is_none() {
        prompt.context = Some(profile.prompt_context(years));
    }
    prompt
}

/// Run the citation scan, the optional synthesis and write the final report.
pub async fn run_deep_research_workflow(
    services: &ResearchServices,
    profile: &DeepResearchProfile,
    options: &DeepResearchOptions,
) -> Result<DeepResearchArtifacts, WorkflowError> {
    let output_dir = &options.output_dir;
    let citation_report_path = output_dir.join(profile.citation_report_filename());
    let chart_path = output_dir.join(profile.chart_filename());
    let raw_data_path = output_dir.join(profile.dataset_filename());
    let final_report_path = output_dir.join(profile.final_report_filename());

    tracing::info!(
        "Starting deep research workflow for {} (output: {}, years: {}, max records: {}, synthesis: {}, dry run: {})",
        profile.slug(),
        output_dir.display(),
        options.years,
        options.max_records,
        options.deep_research,
        options.dry_run
    );

    if options.dry_run {
        tracing::info!(
            "Dry-run plan for {}: run the citation scan into {}, invoke Deep Research (optional), write {}",
            profile.slug(),
            citation_report_path.display(),
            final_report_path.display()
        );
        let (start_year, end_year) = year_window(options.years, current_year());
        return Ok(DeepResearchArtifacts {
            final_report_path,
            citation_report_path: citation_report_path.clone(),
            chart_path: None,
            raw_data_path: None,
            summary: None,
            response_path: None,
            citation: CitationArtifacts {
                report_path: citation_report_path,
                start_year,
                end_year,
                ..Default::default()
            },
            dry_run: true,
        });
    }

    std::fs::create_dir_all(output_dir)?;

    let mut citation_options = CitationWorkflowOptions::new(&citation_report_path, &chart_path)
        .with_raw_data_path(&raw_data_path)
        .with_years(options.years)
        .with_max_records(options.max_records)
        .with_keywords(options.keywords.clone());
    citation_options.max_pages = options.max_pages;
    citation_options.enrich_limit = options.enrich_limit;

    let citation = run_citation_workflow(services, &profile.citation, &citation_options).await?;
    tracing::debug!(
        "Citation workflow completed: {} papers, chart: {}",
        citation.papers.len(),
        citation.chart_path.is_some()
    );

    let mut summary = None;
    let mut response_path = None;
    if !options.deep_research {
        tracing::info!("Deep Research disabled for this run");
    } else if let Some(synthesizer) = &services.synthesizer {
        let prompt = build_prompt(profile, &citation, options.years, options.prompt_override.as_deref());
        let synthesis = SynthesisOptions {
            instructions: Some(
                options
                    .instructions_override
                    .clone()
                    .unwrap_or_else(|| profile.prompt_instructions.to_string()),
            ),
            max_tool_calls: Some(MAX_TOOL_CALLS),
        };
        tracing::info!("Invoking Deep Research synthesis");
        match synthesizer.synthesize(&prompt, &synthesis).await {
            Ok(result) => {
                let text = result.output_text();
                summary = Some(text.trim().to_string()).filter(|s| !s.is_empty());
                let path = output_dir.join(RESPONSE_FILENAME);
                std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
                tracing::info!("Deep Research synthesis completed: {}", path.display());
                response_path = Some(path);
            }
            Err(e) => {
                tracing::error!("Deep Research invocation failed: {}", e);
                summary = Some(format!("Deep Research unavailable: {}", e));
            }
        }
    } else {
        tracing::error!("Deep Research invocation failed: no synthesis service configured");
        summary = Some("Deep Research unavailable: no synthesis service configured".to_string());
    }

    let keyword_label = if options.keywords.is_empty() {
        profile.citation.normalised_keywords().join(", ")
    } else {
        options.keywords.join(", ")
    };
    let context = DeepReportContext {
        summary: summary.as_deref(),
        keyword_label,
        generated_at: Utc::now(),
    };
    std::fs::write(&final_report_path, render_deep_report(profile, &citation, &context))?;
    tracing::info!("Generated deep research report {}", final_report_path.display());

    Ok(DeepResearchArtifacts {
        final_report_path,
        citation_report_path: citation.report_path.clone(),
        chart_path: citation.chart_path.clone(),
        raw_data_path: citation.raw_data_path.clone(),
        summary,
        response_path,
        citation,
        dry_run: false,
    })
}
