//! Trending topics from citation-weighted concept series.

use std::collections::{BTreeMap, HashMap};

use crate::models::{PaperRecord, TrendingTopic};

/// Concepts scored below this are ignored
pub const MIN_CONCEPT_SCORE: f64 = 0.2;

/// Topics reported per run
pub const TOP_TOPICS: usize = 10;

/// Titles attached to each topic
const TOP_PAPERS_PER_TOPIC: usize = 3;

/// Per-concept yearly sums of `citation_count × concept score`.
///
/// Concepts iterate in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptSeries {
    order: Vec<String>,
    yearly: HashMap<String, BTreeMap<i32, f64>>,
}

impl ConceptSeries {
    /// Accumulate a weighted value for a concept in a year
    pub fn add(&mut self, concept: &str, year: i32, value: f64) {
        if !self.yearly.contains_key(concept) {
            self.order.push(concept.to_string());
        }
        *self
            .yearly
            .entry(concept.to_string())
            .or_default()
            .entry(year)
            .or_insert(0.0) += value;
    }

    /// Yearly values for a concept
    pub fn get(&self, concept: &str) -> Option<&BTreeMap<i32, f64>> {
        self.yearly.get(concept)
    }

    /// Concept names in first-seen order
    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Dense series over `start..=end`, zero-filled
    pub fn values(&self, concept: &str, start: i32, end: i32) -> Vec<f64> {
        let yearly = self.get(concept);
        (start..=end)
            .map(|year| yearly.and_then(|y| y.get(&year)).copied().unwrap_or(0.0))
            .collect()
    }

    /// Sum of the values recorded in `from_year` or later
    pub fn total_since(&self, concept: &str, from_year: i32) -> f64 {
        self.get(concept)
            .map(|yearly| yearly.range(from_year..).map(|(_, v)| v).sum::<f64>())
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Least-squares slope of `ys` against `xs`. Zero when the input is empty,
/// mismatched or has no variance in `xs`.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n == 0 || n != ys.len() {
        return 0.0;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let numerator: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let denominator: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Build concept series over all papers and keep the concepts whose
/// weighted citations trend upwards across `start_year..=end_year`.
pub fn summarise_trending_topics(
    papers: &[PaperRecord],
    start_year: i32,
    end_year: i32,
) -> (Vec<TrendingTopic>, ConceptSeries) {
    let mut series = ConceptSeries::default();
    let mut concept_papers: HashMap<&str, Vec<&PaperRecord>> = HashMap::new();

    for paper in papers {
        for concept in &paper.concepts {
            let score = concept.score_or_zero();
            if score < MIN_CONCEPT_SCORE {
                continue;
            }
            series.add(&concept.display_name, paper.year, paper.citation_count as f64 * score);
            concept_papers
                .entry(concept.display_name.as_str())
                .or_default()
                .push(paper);
        }
    }

    let years: Vec<f64> = (start_year..=end_year).map(f64::from).collect();
    let mut topics = Vec::new();
    for name in series.concepts() {
        let values = series.values(name, start_year, end_year);
        let total: f64 = values.iter().sum();
        if total == 0.0 {
            continue;
        }
        let slope = linear_slope(&years, &values);
        if slope <= 0.0 {
            continue;
        }

        let growth = values[values.len() - 1] - values[0];
        let recent: f64 = values.iter().rev().take(2).sum();
        let recent_share = recent / total.max(1.0);

        let mut ranked = concept_papers.get(name).cloned().unwrap_or_default();
        ranked.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
        let top_papers = ranked
            .iter()
            .take(TOP_PAPERS_PER_TOPIC)
            .map(|p| p.title.clone())
            .collect();

        topics.push(TrendingTopic {
            topic: name.to_string(),
            trend_score: round_to(slope, 2),
            citation_growth: round_to(growth, 2),
            recent_share: round_to(recent_share, 3),
            coverage_years: (start_year, end_year),
            top_papers,
        });
    }

    topics.sort_by(|a, b| {
        b.trend_score
            .total_cmp(&a.trend_score)
            .then(b.citation_growth.total_cmp(&a.citation_growth))
    });
    topics.truncate(TOP_TOPICS);

    (topics, series)
}
