//! The deterministic citation scan: collect, enrich, analyse, report.

use chrono::Datelike;
use serde_json::json;
use std::path::{Path, PathBuf};

use super::profiles::CitationProfile;
use super::report;
use super::WorkflowError;
use crate::analysis::{analyse, collect_papers, enrich_papers, prepare_keywords, DEFAULT_ENRICH_LIMIT};
use crate::models::{CitationQuestion, PaperRecord, ResearchGap, TrendingTopic};
use crate::services::ResearchServices;
use crate::sources::WorkQuery;

/// Earliest year a rolling window may reach back to
pub const MIN_START_YEAR: i32 = 1900;

/// Chart server tool used for the trend chart
pub const CHART_TOOL: &str = "generate_bar_chart";

/// Bars drawn in the trend chart
const CHART_TOPICS: usize = 8;

/// Characters kept from each topic label in the chart
const CHART_LABEL_CHARS: usize = 60;

/// Fields requested from OpenAlex
pub const WORK_SELECT_FIELDS: &[&str] = &[
    "id",
    "display_name",
    "title",
    "publication_year",
    "publication_date",
    "cited_by_count",
    "doi",
    "ids",
    "authorships",
    "concepts",
    "abstract_inverted_index",
    "primary_location",
    "host_venue",
];

/// Inputs for one citation scan
#[derive(Debug, Clone)]
pub struct CitationWorkflowOptions {
    pub report_path: PathBuf,
    pub chart_path: PathBuf,

    /// Where to write the JSON dataset, if anywhere
    pub raw_data_path: Option<PathBuf>,

    /// Length of the rolling window in years (at least 1)
    pub years: u32,

    /// Extra keywords appended to the profile defaults
    pub keyword_overrides: Vec<String>,

    pub max_records: usize,
    pub max_pages: usize,

    /// How many of the most cited papers to enrich
    pub enrich_limit: usize,
}

impl CitationWorkflowOptions {
    pub fn new(report_path: impl Into<PathBuf>, chart_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
            chart_path: chart_path.into(),
            raw_data_path: None,
            years: 5,
            keyword_overrides: Vec::new(),
            max_records: 300,
            max_pages: 10,
            enrich_limit: DEFAULT_ENRICH_LIMIT,
        }
    }

    pub fn with_raw_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data_path = Some(path.into());
        self
    }

    pub fn with_years(mut self, years: u32) -> Self {
        self.years = years;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keyword_overrides = keywords;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }
}

/// Everything a citation scan produced
#[derive(Debug, Clone, Default)]
pub struct CitationArtifacts {
    pub report_path: PathBuf,

    /// Set only when a chart image was written
    pub chart_path: Option<PathBuf>,

    /// Set only when the dataset was written
    pub raw_data_path: Option<PathBuf>,

    pub start_year: i32,
    pub end_year: i32,
    pub keywords: Vec<String>,
    pub papers: Vec<PaperRecord>,
    pub questions: Vec<CitationQuestion>,
    pub trending_topics: Vec<TrendingTopic>,
    pub research_gaps: Vec<ResearchGap>,
}

impl CitationArtifacts {
    fn placeholder(report_path: &Path, start_year: i32, end_year: i32, keywords: Vec<String>) -> Self {
        Self {
            report_path: report_path.to_path_buf(),
            start_year,
            end_year,
            keywords,
            ..Default::default()
        }
    }
}

/// Inclusive `(start, end)` window of `years` years ending in `current_year`
pub fn year_window(years: u32, current_year: i32) -> (i32, i32) {
    let span = i32::try_from(years.max(1)).unwrap_or(i32::MAX);
    let start = current_year.saturating_sub(span).saturating_add(1);
    (start.max(MIN_START_YEAR), current_year)
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// The OpenAlex query for a profile and window
pub fn build_work_query(
    profile: &CitationProfile,
    start_year: i32,
    end_year: i32,
    max_pages: usize,
) -> WorkQuery {
    let mut query = WorkQuery::new(profile.search_phrase);
    if !profile.concept_ids.is_empty() {
        query = query.filter("concepts.id", profile.concept_ids.join("|"));
    }
    query = query
        .filter("from_publication_date", format!("{}-01-01", start_year))
        .filter("to_publication_date", format!("{}-12-31", end_year))
        .filter("type", "journal-article");
    query.sort = Some("cited_by_count:desc".to_string());
    query.select = WORK_SELECT_FIELDS.iter().map(|f| f.to_string()).collect();
    query.per_page = 200;
    query.max_pages = Some(max_pages.max(1));
    query
}

/// Arguments for the chart server's bar chart tool
pub fn chart_arguments(profile: &CitationProfile, topics: &[TrendingTopic]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = topics
        .iter()
        .take(CHART_TOPICS)
        .map(|topic| {
            json!({
                "category": topic.topic.chars().take(CHART_LABEL_CHARS).collect::<String>(),
                "value": topic.trend_score,
            })
        })
        .collect();
    json!({
        "data": data,
        "title": profile.topic_chart_title(),
        "width": 900,
        "height": 520,
        "format": "png",
    })
}

pub(super) fn create_parent(path: &Path) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_dataset(path: &Path, artifacts: &CitationArtifacts) -> Result<(), WorkflowError> {
    let payload = json!({
        "papers": artifacts.papers,
        "questions": artifacts.questions,
        "trending_topics": artifacts.trending_topics,
        "research_gaps": artifacts.research_gaps,
    });
    std::fs::write(path, serde_json::to_string_pretty(&payload)?)?;
    Ok(())
}

/// Run one citation scan and write its artefacts.
///
/// Collection failures and empty corpora are reported in-band: the report
/// explains what happened and the returned artefacts carry no papers.
pub async fn run_citation_workflow(
    services: &ResearchServices,
    profile: &CitationProfile,
    options: &CitationWorkflowOptions,
) -> Result<CitationArtifacts, WorkflowError> {
    create_parent(&options.report_path)?;
    create_parent(&options.chart_path)?;
    if let Some(path) = &options.raw_data_path {
        create_parent(path)?;
    }

    let keywords = prepare_keywords(profile.default_keywords, &options.keyword_overrides);
    let (start_year, end_year) = year_window(options.years, current_year());
    let query = build_work_query(profile, start_year, end_year, options.max_pages);

    tracing::info!(
        "Collecting {} works from {} for {}-{}",
        profile.slug,
        services.works.name(),
        start_year,
        end_year
    );
    let collected = collect_papers(
        services.works.works(&query),
        &keywords,
        profile.anchor_keyword,
        options.max_records,
    )
    .await;

    let mut papers = match collected {
        Ok(papers) => papers,
        Err(e) => {
            tracing::error!("Literature collection from {} failed: {}", services.works.name(), e);
            let text = report::render_failure_report(profile, start_year, end_year, &e.to_string());
            std::fs::write(&options.report_path, text)?;
            return Ok(CitationArtifacts::placeholder(
                &options.report_path,
                start_year,
                end_year,
                keywords,
            ));
        }
    };

    if papers.is_empty() {
        tracing::warn!("No qualifying papers for {}-{}", start_year, end_year);
        std::fs::write(
            &options.report_path,
            report::render_empty_report(profile, start_year, end_year),
        )?;
        return Ok(CitationArtifacts::placeholder(
            &options.report_path,
            start_year,
            end_year,
            keywords,
        ));
    }

    if let Some(enrichment) = &services.enrichment {
        enrich_papers(enrichment.as_ref(), &mut papers, options.enrich_limit).await;
    }

    let analysis = analyse(&papers, start_year, end_year, &keywords, profile.gap_suffix);
    let mut artifacts = CitationArtifacts {
        report_path: options.report_path.clone(),
        chart_path: None,
        raw_data_path: options.raw_data_path.clone(),
        start_year,
        end_year,
        keywords,
        papers,
        questions: analysis.questions,
        trending_topics: analysis.trending_topics,
        research_gaps: analysis.research_gaps,
    };

    if let Some(path) = &artifacts.raw_data_path {
        write_dataset(path, &artifacts)?;
    }

    if !artifacts.trending_topics.is_empty() {
        if let Some(chart) = &services.chart {
            let arguments = chart_arguments(profile, &artifacts.trending_topics);
            if chart.render_bar_chart(CHART_TOOL, arguments, &options.chart_path).await
                && options.chart_path.exists()
            {
                artifacts.chart_path = Some(options.chart_path.clone());
            }
        }
    }

    std::fs::write(
        &options.report_path,
        report::render_citation_report(profile, &artifacts),
    )?;

    tracing::info!(
        "Citation report written to {} ({} papers, {} questions, {} topics, {} gaps)",
        options.report_path.display(),
        artifacts.papers.len(),
        artifacts.questions.len(),
        artifacts.trending_topics.len(),
        artifacts.research_gaps.len()
    );
    Ok(artifacts)
}
