//! Trending LCA metrics: per-theme citation trends over a fixed year range.

use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::citations::{create_parent, current_year};
use super::WorkflowError;
use crate::models::RawWork;
use crate::services::ResearchServices;
use crate::sources::WorkQuery;

/// Default first publication year of the range
pub const DEFAULT_METRICS_START_YEAR: i32 = 2020;

/// Works kept per metric unless configured otherwise
pub const DEFAULT_MAX_RECORDS_PER_METRIC: usize = 120;

/// Raw payloads kept per metric in the output
pub const RAW_RECORDS_PER_METRIC: usize = 20;

const TOP_WORKS: usize = 5;
const TOP_CONCEPTS: usize = 6;
const MIN_CONCEPT_SCORE: f64 = 0.35;
const MAX_CONCEPT_LEVEL: i64 = 2;

/// Fields requested from OpenAlex for each metric
pub const METRIC_SELECT_FIELDS: &[&str] = &[
    "id",
    "display_name",
    "publication_year",
    "cited_by_count",
    "doi",
    "ids",
    "concepts",
    "authorships",
    "primary_location",
    "sustainable_development_goals",
];

/// A tracked LCA theme and the OpenAlex search that finds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendingMetric {
    pub id: &'static str,
    pub label: &'static str,
    pub search: &'static str,
}

/// Themes covered by every run, in output order
pub const TRENDING_METRICS: &[TrendingMetric] = &[
    TrendingMetric {
        id: "resource_scarcity",
        label: "Resource Scarcity Footprint",
        search: r#""resource scarcity" AND ("life cycle assessment" OR LCA)"#,
    },
    TrendingMetric {
        id: "planetary_footprint",
        label: "Planetary Footprint Indicators",
        search: r#""planetary boundaries" AND footprint AND ("life cycle assessment" OR LCA)"#,
    },
    TrendingMetric {
        id: "biodiversity_loss",
        label: "Biodiversity Loss Factors",
        search: r#""biodiversity" AND ("life cycle assessment" OR LCA) AND (loss OR impact)"#,
    },
    TrendingMetric {
        id: "sustainable_nanotechnology",
        label: "Sustainable Nanotechnology Footprints",
        search: r#""nanotechnology" AND sustainability AND ("life cycle assessment" OR LCA)"#,
    },
];

/// A highly cited work inside one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricWork {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub cited_by_count: i64,
    pub doi: Option<String>,
}

/// A concept weighted by the citations of the works carrying it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricConcept {
    pub name: String,
    pub weighted_citations: f64,
}

/// Aggregates for one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric_id: String,
    pub label: String,
    pub total_works: u64,
    pub total_citations: i64,
    pub citation_trend: BTreeMap<i32, i64>,
    pub work_count_by_year: BTreeMap<i32, u64>,
    pub top_works: Vec<MetricWork>,
    pub top_concepts: Vec<MetricConcept>,
}

impl MetricSummary {
    fn empty(metric: &TrendingMetric) -> Self {
        Self {
            metric_id: metric.id.to_string(),
            label: metric.label.to_string(),
            total_works: 0,
            total_citations: 0,
            citation_trend: BTreeMap::new(),
            work_count_by_year: BTreeMap::new(),
            top_works: Vec::new(),
            top_concepts: Vec::new(),
        }
    }
}

/// Inputs for one metrics run
#[derive(Debug, Clone)]
pub struct TrendingMetricsOptions {
    pub start_year: i32,

    /// Last publication year; the current year when unset
    pub end_year: Option<i32>,

    pub max_records_per_metric: usize,

    /// Where to write the JSON summary, if anywhere
    pub output_path: Option<PathBuf>,

    pub dry_run: bool,
}

impl Default for TrendingMetricsOptions {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_METRICS_START_YEAR,
            end_year: None,
            max_records_per_metric: DEFAULT_MAX_RECORDS_PER_METRIC,
            output_path: None,
            dry_run: false,
        }
    }
}

/// Everything a metrics run produced
#[derive(Debug, Clone, Default)]
pub struct TrendingMetricsArtifacts {
    pub start_year: i32,
    pub end_year: i32,
    pub metrics: Vec<MetricSummary>,

    /// Leading raw payloads per metric id
    pub raw_records: BTreeMap<String, Vec<Value>>,

    /// Set only when the summary was written
    pub output_path: Option<PathBuf>,

    /// Set only on dry runs
    pub plan: Option<Vec<String>>,
}

/// Steps a run would take over `start_year..=end_year`
pub fn metrics_plan(start_year: i32, end_year: i32) -> Vec<String> {
    let labels: Vec<String> = TRENDING_METRICS
        .iter()
        .map(|m| m.id.replace('_', " "))
        .collect();
    vec![
        "Load OpenAlex client and confirm connectivity.".to_string(),
        format!("For each metric ({}):", labels.join(", ")),
        format!("  - Query OpenAlex for works published between {} and {}.", start_year, end_year),
        "  - Aggregate citation totals and counts by publication year.".to_string(),
        "  - Extract top works and high-signal concepts.".to_string(),
        "Persist results as JSON when --output is supplied.".to_string(),
    ]
}

/// The OpenAlex query for one metric
pub fn build_metric_query(metric: &TrendingMetric, start_year: i32, end_year: i32) -> WorkQuery {
    let mut query = WorkQuery::new(metric.search)
        .filter("from_publication_date", format!("{}-01-01", start_year))
        .filter("to_publication_date", format!("{}-12-31", end_year))
        .filter("primary_location.source.type", "journal");
    query.sort = Some("cited_by_count:desc".to_string());
    query.select = METRIC_SELECT_FIELDS.iter().map(|f| f.to_string()).collect();
    query.per_page = 100;
    query.max_pages = Some(5);
    query
}

fn work_doi(work: &RawWork) -> Option<String> {
    work.doi
        .clone()
        .filter(|d| !d.is_empty())
        .or_else(|| work.ids.as_ref().and_then(|ids| ids.doi.clone()).filter(|d| !d.is_empty()))
}

/// Aggregate the works collected for one metric.
///
/// Year series and totals count only works with a publication year. A
/// concept contributes when it is named, sits no deeper than level 2 and
/// scores at least 0.35; it adds the work's citations, or one
/// for an uncited work.
pub fn summarise_works(metric: &TrendingMetric, works: &[RawWork]) -> MetricSummary {
    let mut summary = MetricSummary::empty(metric);
    let mut concept_weights: Vec<(String, f64)> = Vec::new();

    for work in works {
        let citations = work.cited_by_count.unwrap_or(0);
        if let Some(year) = work.publication_year {
            *summary.citation_trend.entry(year).or_insert(0) += citations;
            *summary.work_count_by_year.entry(year).or_insert(0) += 1;
        }

        for concept in &work.concepts {
            let Some(name) = concept.display_name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            if concept.level.is_some_and(|level| level > MAX_CONCEPT_LEVEL)
                || concept.score.unwrap_or(0.0) < MIN_CONCEPT_SCORE
            {
                continue;
            }
            let weight = if citations == 0 { 1.0 } else { citations as f64 };
            match concept_weights.iter_mut().find(|(n, _)| n == name) {
                Some((_, total)) => *total += weight,
                None => concept_weights.push((name.to_string(), weight)),
            }
        }
    }

    summary.total_citations = summary.citation_trend.values().sum();
    summary.total_works = summary.work_count_by_year.values().sum();

    let mut top_works: Vec<MetricWork> = works
        .iter()
        .map(|work| MetricWork {
            title: work.display_name.clone(),
            year: work.publication_year,
            cited_by_count: work.cited_by_count.unwrap_or(0),
            doi: work_doi(work),
        })
        .collect();
    top_works.sort_by(|a, b| b.cited_by_count.cmp(&a.cited_by_count));
    top_works.truncate(TOP_WORKS);
    summary.top_works = top_works;

    let mut top_concepts: Vec<MetricConcept> = concept_weights
        .into_iter()
        .map(|(name, weight)| MetricConcept {
            name,
            weighted_citations: (weight * 100.0).round() / 100.0,
        })
        .collect();
    top_concepts.sort_by(|a, b| b.weighted_citations.total_cmp(&a.weighted_citations));
    top_concepts.truncate(TOP_CONCEPTS);
    summary.top_concepts = top_concepts;

    tracing::debug!(
        "Summarised {}: {} works, {} citations",
        metric.id,
        summary.total_works,
        summary.total_citations
    );
    summary
}

/// Query OpenAlex once per tracked theme and aggregate the results.
///
/// Upstream failures abort the run.
pub async fn run_trending_metrics_workflow(
    services: &ResearchServices,
    options: &TrendingMetricsOptions,
) -> Result<TrendingMetricsArtifacts, WorkflowError> {
    let start_year = options.start_year;
    let end_year = options.end_year.unwrap_or_else(current_year);
    if start_year > end_year {
        return Err(WorkflowError::InvalidYears {
            start: start_year,
            end: end_year,
        });
    }

    tracing::info!(
        "Trending metrics for {}-{} ({} works per metric)",
        start_year,
        end_year,
        options.max_records_per_metric
    );

    if options.dry_run {
        tracing::info!("Dry run: returning plan only");
        return Ok(TrendingMetricsArtifacts {
            start_year,
            end_year,
            plan: Some(metrics_plan(start_year, end_year)),
            ..Default::default()
        });
    }

    let mut artifacts = TrendingMetricsArtifacts {
        start_year,
        end_year,
        ..Default::default()
    };

    for metric in TRENDING_METRICS {
        tracing::info!("Querying {} for {}", services.works.name(), metric.label);
        let query = build_metric_query(metric, start_year, end_year);
        let works: Vec<RawWork> = services
            .works
            .works(&query)
            .take(options.max_records_per_metric)
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!("Metric {} failed: {}", metric.id, e);
                e
            })?;

        if works.is_empty() {
            tracing::warn!("No works returned for metric {}", metric.id);
            artifacts.metrics.push(MetricSummary::empty(metric));
            artifacts.raw_records.insert(metric.id.to_string(), Vec::new());
            continue;
        }

        artifacts.metrics.push(summarise_works(metric, &works));
        artifacts.raw_records.insert(
            metric.id.to_string(),
            works
                .into_iter()
                .take(RAW_RECORDS_PER_METRIC)
                .map(|work| work.raw)
                .collect(),
        );
    }

    if let Some(path) = &options.output_path {
        create_parent(path)?;
        let payload = json!({
            "start_year": start_year,
            "end_year": end_year,
            "metrics": artifacts.metrics,
            "raw_records": artifacts.raw_records,
        });
        std::fs::write(path, serde_json::to_string_pretty(&payload)?)?;
        tracing::info!("Metrics written to {}", path.display());
        artifacts.output_path = Some(path.clone());
    }

    tracing::info!("Trending metrics complete ({} metrics)", artifacts.metrics.len());
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockWorkSource;
    use std::sync::Arc;

    fn work(value: Value) -> RawWork {
        RawWork::from_value(value).unwrap()
    }

    fn metric() -> &'static TrendingMetric {
        &TRENDING_METRICS[0]
    }

    #[test]
    fn test_plan_names_every_metric() {
        let plan = metrics_plan(2020, 2024);
        assert_eq!(plan.len(), 6);
        assert_eq!(
            plan[1],
            "For each metric (resource scarcity, planetary footprint, biodiversity loss, sustainable nanotechnology):"
        );
        assert!(plan[2].contains("between 2020 and 2024"));
    }

    #[test]
    fn test_metric_query() {
        let query = build_metric_query(metric(), 2020, 2024);
        assert_eq!(query.search.as_deref(), Some(metric().search));
        assert_eq!(
            query.serialise_filters().as_deref(),
            Some(
                "from_publication_date:2020-01-01,to_publication_date:2024-12-31,primary_location.source.type:journal"
            )
        );
        assert_eq!(query.sort.as_deref(), Some("cited_by_count:desc"));
        assert_eq!(query.per_page, 100);
        assert_eq!(query.max_pages, Some(5));
        assert!(query.select.iter().any(|f| f == "sustainable_development_goals"));
    }

    #[test]
    fn test_summarise_year_series_and_totals() {
        let works = vec![
            work(json!({"display_name": "A", "publication_year": 2021, "cited_by_count": 10})),
            work(json!({"display_name": "B", "publication_year": 2021, "cited_by_count": 5})),
            work(json!({"display_name": "C", "publication_year": 2023, "cited_by_count": 1})),
            work(json!({"display_name": "Undated", "cited_by_count": 100})),
        ];
        let summary = summarise_works(metric(), &works);

        assert_eq!(summary.citation_trend, BTreeMap::from([(2021, 15), (2023, 1)]));
        assert_eq!(summary.work_count_by_year, BTreeMap::from([(2021, 2), (2023, 1)]));
        assert_eq!(summary.total_citations, 16);
        assert_eq!(summary.total_works, 3);

        let titles: Vec<_> = summary.top_works.iter().map(|w| w.title.as_deref().unwrap()).collect();
        assert_eq!(titles, vec!["Undated", "A", "B", "C"]);
    }

    #[test]
    fn test_concept_filters_and_weights() {
        let works = vec![
            work(json!({
                "publication_year": 2022,
                "cited_by_count": 4,
                "concepts": [
                    {"display_name": "Biodiversity", "level": 1, "score": 0.9},
                    {"display_name": "Niche", "level": 3, "score": 0.9},
                    {"display_name": "Weak", "level": 0, "score": 0.2},
                    {"display_name": "Unlevelled", "score": 0.5},
                    {"level": 0, "score": 0.9}
                ]
            })),
            work(json!({
                "publication_year": 2023,
                "cited_by_count": 0,
                "concepts": [{"display_name": "Biodiversity", "level": 2, "score": 0.35}]
            })),
        ];
        let summary = summarise_works(metric(), &works);
        let concepts: Vec<(&str, f64)> = summary
            .top_concepts
            .iter()
            .map(|c| (c.name.as_str(), c.weighted_citations))
            .collect();
        assert_eq!(concepts, vec![("Biodiversity", 5.0), ("Unlevelled", 4.0)]);
    }

    #[test]
    fn test_top_lists_are_capped_and_doi_falls_back_to_ids() {
        let works: Vec<RawWork> = (0..8)
            .map(|i| {
                work(json!({
                    "display_name": format!("W{}", i),
                    "publication_year": 2022,
                    "cited_by_count": i,
                    "ids": {"doi": format!("https://doi.org/10.1/{}", i)},
                    "concepts": [{"display_name": format!("C{}", i), "level": 1, "score": 0.8}]
                }))
            })
            .collect();
        let summary = summarise_works(metric(), &works);
        assert_eq!(summary.top_works.len(), 5);
        assert_eq!(summary.top_works[0].title.as_deref(), Some("W7"));
        assert_eq!(summary.top_works[0].doi.as_deref(), Some("https://doi.org/10.1/7"));
        assert_eq!(summary.top_concepts.len(), 6);
        assert_eq!(summary.top_concepts[0].name, "C7");
    }

    #[tokio::test]
    async fn test_dry_run_returns_plan_only() {
        let works = Arc::new(MockWorkSource::from_values(vec![json!({"id": "W1"})]));
        let services = ResearchServices::new(works.clone());
        let options = TrendingMetricsOptions {
            end_year: Some(2024),
            dry_run: true,
            ..Default::default()
        };
        let artifacts = run_trending_metrics_workflow(&services, &options).await.unwrap();
        assert_eq!(artifacts.plan.as_ref().map(Vec::len), Some(6));
        assert!(artifacts.metrics.is_empty());
        assert!(works.queries().is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let services = ResearchServices::new(Arc::new(MockWorkSource::default()));
        let options = TrendingMetricsOptions {
            start_year: 2025,
            end_year: Some(2020),
            ..Default::default()
        };
        let err = run_trending_metrics_workflow(&services, &options).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidYears { start: 2025, end: 2020 }));
    }

    #[tokio::test]
    async fn test_run_caps_records_and_writes_output() {
        let values: Vec<Value> = (0..30)
            .map(|i| json!({"id": format!("W{}", i), "publication_year": 2022, "cited_by_count": 1}))
            .collect();
        let works = Arc::new(MockWorkSource::from_values(values));
        let services = ResearchServices::new(works.clone());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.json");
        let options = TrendingMetricsOptions {
            start_year: 2021,
            end_year: Some(2023),
            max_records_per_metric: 25,
            output_path: Some(path.clone()),
            dry_run: false,
        };

        let artifacts = run_trending_metrics_workflow(&services, &options).await.unwrap();
        assert_eq!(artifacts.metrics.len(), TRENDING_METRICS.len());
        assert!(artifacts.metrics.iter().all(|m| m.total_works == 25));
        assert_eq!(artifacts.raw_records["biodiversity_loss"].len(), RAW_RECORDS_PER_METRIC);
        assert_eq!(works.queries().len(), TRENDING_METRICS.len());

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["start_year"], 2021);
        assert_eq!(written["metrics"][0]["metric_id"], "resource_scarcity");
        assert_eq!(written["metrics"][0]["citation_trend"]["2022"], 25);
        assert_eq!(artifacts.output_path, Some(path));
    }

    #[tokio::test]
    async fn test_empty_metric_gets_zero_summary() {
        let services = ResearchServices::new(Arc::new(MockWorkSource::default()));
        let options = TrendingMetricsOptions {
            end_year: Some(2024),
            ..Default::default()
        };
        let artifacts = run_trending_metrics_workflow(&services, &options).await.unwrap();
        assert_eq!(artifacts.metrics[2], MetricSummary::empty(&TRENDING_METRICS[2]));
        assert!(artifacts.raw_records["sustainable_nanotechnology"].is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_aborts() {
        let works = MockWorkSource::from_values(vec![json!({"id": "W1"})]).fail_after(0, "reset");
        let services = ResearchServices::new(Arc::new(works));
        let options = TrendingMetricsOptions {
            end_year: Some(2024),
            ..Default::default()
        };
        let err = run_trending_metrics_workflow(&services, &options).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Source(_)));
    }
}
