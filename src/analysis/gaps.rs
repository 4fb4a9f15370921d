//! Research gaps: small paper groups that collect outsized citations.

use std::collections::HashMap;

use super::trends::{round_to, ConceptSeries, MIN_CONCEPT_SCORE};
use crate::models::{PaperRecord, ResearchGap};

/// Gaps reported per run
pub const TOP_GAPS: usize = 8;

/// Concept groups need at least this many papers
const CONCEPT_MIN_PAPERS: usize = 2;

/// Concept groups larger than this are considered well studied
const CONCEPT_MAX_PAPERS: usize = 5;

/// Average citations a concept group needs
const CONCEPT_MIN_AVG_CITATIONS: f64 = 25.0;

/// Keyword groups larger than this are considered well studied
const KEYWORD_MAX_PAPERS: usize = 3;

/// Total citations a keyword group needs
const KEYWORD_MIN_TOTAL_CITATIONS: u64 = 40;

/// Papers grouped under a label, labels kept in first-seen order
#[derive(Default)]
struct Groups<'a> {
    labels: Vec<String>,
    members: HashMap<String, Vec<&'a PaperRecord>>,
}

impl<'a> Groups<'a> {
    fn push(&mut self, label: &str, paper: &'a PaperRecord) {
        match self.members.get_mut(label) {
            Some(group) => group.push(paper),
            None => {
                self.labels.push(label.to_string());
                self.members.insert(label.to_string(), vec![paper]);
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[&'a PaperRecord])> {
        self.labels
            .iter()
            .filter_map(|label| self.members.get(label).map(|g| (label.as_str(), g.as_slice())))
    }
}

/// First paper with the highest citation count
fn representative<'a>(group: &[&'a PaperRecord]) -> Option<&'a PaperRecord> {
    let mut best: Option<&'a PaperRecord> = None;
    for &paper in group {
        if best.map_or(true, |b| paper.citation_count > b.citation_count) {
            best = Some(paper);
        }
    }
    best
}

fn total_citations(group: &[&PaperRecord]) -> u64 {
    group.iter().map(|p| p.citation_count).sum()
}

fn recent_count(group: &[&PaperRecord], end_year: i32) -> usize {
    group.iter().filter(|p| p.year >= end_year - 1).count()
}

/// Find concept and keyword groups with few papers but high citations.
///
/// `keywords` decides which keyword groups are considered and their order;
/// `gap_suffix` finishes the keyword rationale sentence.
pub fn identify_research_gaps<S: AsRef<str>>(
    papers: &[PaperRecord],
    series: &ConceptSeries,
    start_year: i32,
    end_year: i32,
    keywords: &[S],
    gap_suffix: &str,
) -> Vec<ResearchGap> {
    let mut concept_groups = Groups::default();
    let mut keyword_groups = Groups::default();

    for paper in papers {
        for concept in &paper.concepts {
            if concept.score_or_zero() >= MIN_CONCEPT_SCORE {
                concept_groups.push(&concept.display_name, paper);
            }
        }
    }
    for keyword in keywords.iter().map(|kw| kw.as_ref()) {
        for paper in papers.iter().filter(|p| p.hits(keyword) > 0) {
            keyword_groups.push(keyword, paper);
        }
    }

    let mut candidates = Vec::new();

    for (topic, group) in concept_groups.iter() {
        if group.len() < CONCEPT_MIN_PAPERS || group.len() > CONCEPT_MAX_PAPERS {
            continue;
        }
        let total = total_citations(group);
        let avg = total as f64 / group.len() as f64;
        if avg < CONCEPT_MIN_AVG_CITATIONS {
            continue;
        }
        let Some(rep) = representative(group) else {
            continue;
        };
        let recent = recent_count(group, end_year);

        let mut rationale = format!(
            "Only {} journal articles since {}, yet they accumulated {} citations ({:.1} per paper). {} appeared in the last 24 months.",
            group.len(),
            start_year,
            total,
            avg,
            recent
        );
        let energy = series.total_since(topic, end_year - 1);
        if energy > 0.0 {
            rationale.push_str(&format!(
                " Recent citation energy: {:.1} weighted references.",
                energy
            ));
        }

        candidates.push(ResearchGap {
            topic: topic.to_string(),
            paper_count: group.len(),
            avg_citations: round_to(avg, 2),
            recent_papers: recent,
            representative_title: rep.title.clone(),
            supporting_doi: rep.doi.clone(),
            rationale,
        });
    }

    for (keyword, group) in keyword_groups.iter() {
        if group.len() > KEYWORD_MAX_PAPERS {
            continue;
        }
        let total = total_citations(group);
        if total < KEYWORD_MIN_TOTAL_CITATIONS {
            continue;
        }
        let Some(rep) = representative(group) else {
            continue;
        };
        let avg = total as f64 / group.len() as f64;
        let suffix = if gap_suffix.is_empty() { "." } else { gap_suffix };

        candidates.push(ResearchGap {
            topic: format!("Keyword focus: {}", keyword),
            paper_count: group.len(),
            avg_citations: round_to(avg, 2),
            recent_papers: recent_count(group, end_year),
            representative_title: rep.title.clone(),
            supporting_doi: rep.doi.clone(),
            rationale: format!(
                "Keyword '{}' appears in {} papers but collects {} citations (avg {:.1}). This suggests demand for deeper investigation{}",
                keyword,
                group.len(),
                total,
                avg,
                suffix
            ),
        });
    }

    candidates.sort_by(|a, b| {
        b.avg_citations
            .total_cmp(&a.avg_citations)
            .then(a.paper_count.cmp(&b.paper_count))
    });
    candidates.truncate(TOP_GAPS);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trends::summarise_trending_topics;
    use crate::models::Concept;
    use std::collections::BTreeMap;

    const SUFFIX: &str = " with LCA framing.";

    fn paper(id: &str, year: i32, citations: u64, concept: Option<&str>) -> PaperRecord {
        let mut p = PaperRecord::new(id, format!("Paper {}", id), year);
        p.citation_count = citations;
        p.doi = Some(format!("10.1/{}", id));
        p.concepts = concept.map(|c| vec![Concept::new(c, 0.5)]).unwrap_or_default();
        p
    }

    fn gaps(papers: &[PaperRecord], keywords: &[&str]) -> Vec<ResearchGap> {
        let (_, series) = summarise_trending_topics(papers, 2020, 2024);
        identify_research_gaps(papers, &series, 2020, 2024, keywords, SUFFIX)
    }

    #[test]
    fn test_small_cited_concept_is_a_gap() {
        let papers = vec![
            paper("W1", 2024, 100, Some("Soil carbon")),
            paper("W2", 2021, 50, Some("Soil carbon")),
        ];
        let found = gaps(&papers, &[]);
        assert_eq!(found.len(), 1);
        let gap = &found[0];
        assert_eq!(gap.topic, "Soil carbon");
        assert_eq!(gap.paper_count, 2);
        assert_eq!(gap.avg_citations, 75.0);
        assert_eq!(gap.recent_papers, 1);
        assert_eq!(gap.representative_title, "Paper W1");
        assert_eq!(gap.supporting_doi.as_deref(), Some("10.1/W1"));
        assert_eq!(
            gap.rationale,
            "Only 2 journal articles since 2020, yet they accumulated 150 citations (75.0 per paper). \
             1 appeared in the last 24 months. Recent citation energy: 50.0 weighted references."
        );
    }

    #[test]
    fn test_large_concept_group_is_not_a_gap() {
        let papers: Vec<PaperRecord> = (0..6)
            .map(|i| paper(&format!("W{}", i), 2022, if i == 0 { 100 } else { 50 }, Some("Soil carbon")))
            .collect();
        assert!(gaps(&papers, &[]).is_empty());
    }

    #[test]
    fn test_low_average_and_singletons_are_skipped() {
        let papers = vec![
            paper("W1", 2022, 20, Some("Packaging")),
            paper("W2", 2022, 20, Some("Packaging")),
            paper("W3", 2022, 900, Some("Solo")),
        ];
        assert!(gaps(&papers, &[]).is_empty());
    }

    #[test]
    fn test_representative_is_first_most_cited() {
        let papers = vec![
            paper("W1", 2022, 60, Some("Tie")),
            paper("W2", 2022, 60, Some("Tie")),
        ];
        assert_eq!(gaps(&papers, &[])[0].representative_title, "Paper W1");
    }

    #[test]
    fn test_keyword_pool() {
        let mut papers = vec![
            paper("W1", 2020, 30, None),
            paper("W2", 2023, 15, None),
            paper("W3", 2023, 500, None),
        ];
        papers[0].keyword_hits = BTreeMap::from([("sdg".to_string(), 1)]);
        papers[1].keyword_hits = BTreeMap::from([("sdg".to_string(), 2), ("lca".to_string(), 0)]);

        let found = gaps(&papers, &["lca", "sdg"]);
        assert_eq!(found.len(), 1);
        let gap = &found[0];
        assert_eq!(gap.topic, "Keyword focus: sdg");
        assert_eq!(gap.paper_count, 2);
        assert_eq!(gap.avg_citations, 22.5);
        assert_eq!(gap.recent_papers, 1);
        assert_eq!(gap.representative_title, "Paper W1");
        assert_eq!(
            gap.rationale,
            "Keyword 'sdg' appears in 2 papers but collects 45 citations (avg 22.5). \
             This suggests demand for deeper investigation with LCA framing."
        );
    }

    #[test]
    fn test_sorting_and_truncation() {
        let mut papers = Vec::new();
        for i in 0..10 {
            let citations = 30 + i as u64 * 10;
            papers.push(paper(&format!("A{}", i), 2022, citations, Some(format!("Topic {}", i).as_str())));
            papers.push(paper(&format!("B{}", i), 2022, citations, Some(format!("Topic {}", i).as_str())));
        }
        let found = gaps(&papers, &[]);
        assert_eq!(found.len(), TOP_GAPS);
        assert_eq!(found[0].topic, "Topic 9");
        assert!(found.windows(2).all(|w| w[0].avg_citations >= w[1].avg_citations));
    }

    #[test]
    fn test_equal_average_prefers_fewer_papers() {
        let papers = vec![
            paper("W1", 2022, 40, Some("Three")),
            paper("W2", 2022, 40, Some("Three")),
            paper("W3", 2022, 40, Some("Three")),
            paper("W4", 2022, 40, Some("Two")),
            paper("W5", 2022, 40, Some("Two")),
        ];
        let topics: Vec<_> = gaps(&papers, &[]).into_iter().map(|g| g.topic).collect();
        assert_eq!(topics, vec!["Two", "Three"]);
    }
}
