//! Markdown rendering for citation and deep research reports.

use chrono::{DateTime, Utc};
use std::path::Path;

use super::citations::CitationArtifacts;
use super::profiles::{CitationProfile, DeepResearchProfile};
use crate::models::{rank_by_citations, CitationQuestion, TrendingTopic};

/// Papers listed in the citation report appendix
pub const APPENDIX_PAPERS: usize = 15;

/// Rows per table in the deep research report
pub const DEEP_REPORT_ROWS: usize = 8;

/// Name stamped into generated reports
pub const GENERATOR: &str = env!("CARGO_PKG_NAME");

fn heading(title: &str, start_year: i32, end_year: i32) -> String {
    format!("# {} ({}–{})", title, start_year, end_year)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn doi_link(doi: Option<&str>) -> String {
    match doi {
        Some(doi) => format!("[{}](https://doi.org/{})", doi, doi),
        None => "—".to_string(),
    }
}

/// Report written when the corpus came back empty
pub fn render_empty_report(profile: &CitationProfile, start_year: i32, end_year: i32) -> String {
    [
        heading(&profile.report_title(), start_year, end_year),
        String::new(),
        "No qualifying papers were retrieved. Verify that OpenAlex is reachable and that the query \
         window contains relevant publications."
            .to_string(),
    ]
    .join("\n")
}

/// Report written when collection failed upstream
pub fn render_failure_report(
    profile: &CitationProfile,
    start_year: i32,
    end_year: i32,
    message: &str,
) -> String {
    [
        heading(&profile.report_title(), start_year, end_year),
        String::new(),
        "The workflow failed to collect literature from OpenAlex.".to_string(),
        format!("Error detail: {}", message),
    ]
    .join("\n")
}

/// Full citation report for a non-empty corpus
pub fn render_citation_report(profile: &CitationProfile, artifacts: &CitationArtifacts) -> String {
    let (start_year, end_year) = (artifacts.start_year, artifacts.end_year);
    let questions = &artifacts.questions;
    let topics = &artifacts.trending_topics;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{}\n", heading(&profile.report_title(), start_year, end_year)));

    lines.push("## Why it matters\n".into());
    lines.push(format!("- Focus: {}.", profile.focus_description));
    let mut keywords: Vec<&str> = artifacts.keywords.iter().map(String::as_str).collect();
    keywords.sort_unstable();
    keywords.dedup();
    lines.push(format!("- Query keywords: {}.", keywords.join(", ")));
    lines.push(format!(
        "- Corpus size: {} papers within the last {} years.\n",
        artifacts.papers.len(),
        end_year - start_year + 1
    ));

    if let Some(top) = questions.first() {
        lines.push("## Quick insight\n".into());
        lines.push(format!(
            "- Highest cited question: **{}** ({} citations, {}).",
            top.question, top.citation_count, top.publication_year
        ));
        if let Some(topic) = topics.first() {
            lines.push(format!(
                "- Fastest growing topic: **{}** (trend score {:+.2}, {:.1}% of weighted citations from the last two years).\n",
                topic.topic,
                topic.trend_score,
                topic.recent_share * 100.0
            ));
        }
    }

    lines.push("## Top citation questions\n".into());
    if questions.is_empty() {
        lines.push("Not enough citation metadata to surface leading questions.\n".into());
    } else {
        lines.push("| Question | Citations | Year | Journal | Key authors | DOI |".into());
        lines.push("|----------|-----------|------|---------|-------------|-----|".into());
        for item in questions {
            let authors = if item.authors.is_empty() {
                "N/A".to_string()
            } else {
                item.authors.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            };
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} |",
                item.question,
                item.citation_count,
                item.publication_year,
                item.journal.as_deref().unwrap_or("—"),
                authors,
                doi_link(item.doi.as_deref())
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Emerging topics\n".into());
    if topics.is_empty() {
        lines.push("No accelerating topic clusters detected; consider widening the query window.\n".into());
    } else {
        lines.push("| Topic | Trend score | Citation growth | Recent share | Representative papers |".into());
        lines.push("|-------|-------------|-----------------|--------------|------------------------|".into());
        for topic in topics {
            let papers = if topic.top_papers.is_empty() {
                "—".to_string()
            } else {
                topic.top_papers.iter().take(2).cloned().collect::<Vec<_>>().join("; ")
            };
            lines.push(format!(
                "| {} | {:+.2} | {:+.1} | {:.1}% | {} |",
                topic.topic,
                topic.trend_score,
                topic.citation_growth,
                topic.recent_share * 100.0,
                papers
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Research gaps worth exploring\n".into());
    if artifacts.research_gaps.is_empty() {
        lines.push("- No high-impact gaps detected under current filters.\n".into());
    } else {
        for gap in &artifacts.research_gaps {
            let doi = gap
                .supporting_doi
                .as_ref()
                .map(|doi| format!(" (DOI: https://doi.org/{})", doi))
                .unwrap_or_default();
            lines.push(format!(
                "- **{}** — {} Representative study: *{}*{}.",
                gap.topic, gap.rationale, gap.representative_title, doi
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Visualization\n".into());
    match &artifacts.chart_path {
        Some(path) => lines.push(format!("![{}]({})\n", profile.chart_caption(), path.display())),
        None => lines.push(
            "- Chart generation unavailable. Ensure the AntV MCP chart server is reachable.\n".into(),
        ),
    }

    lines.push("## Appendix — Sampled papers\n".into());
    for idx in rank_by_citations(&artifacts.papers).into_iter().take(APPENDIX_PAPERS) {
        let paper = &artifacts.papers[idx];
        lines.push(format!(
            "- **{}** ({}) — {} — {} citations — {}",
            paper.title,
            paper.year,
            paper.journal.as_deref().unwrap_or("Unknown venue"),
            paper.citation_count,
            paper.link().unwrap_or_else(|| "N/A".to_string())
        ));
    }
    lines.push(String::new());

    if let Some(path) = &artifacts.raw_data_path {
        lines.push(format!(
            "Raw dataset cached at `{}` for further exploration.\n",
            path.display()
        ));
    }

    lines.join("\n")
}

fn question_table(questions: &[CitationQuestion]) -> Vec<String> {
    let mut rows = vec![
        "| Question | Citations | Year | Journal | DOI |".to_string(),
        "|----------|-----------|------|---------|-----|".to_string(),
    ];
    for item in questions {
        rows.push(format!(
            "| {} | {} | {} | {} | {} |",
            item.question,
            item.citation_count,
            item.publication_year,
            item.journal.as_deref().unwrap_or("—"),
            doi_link(item.doi.as_deref())
        ));
    }
    rows.push(String::new());
    rows
}

fn trending_table(topics: &[TrendingTopic]) -> Vec<String> {
    let mut rows = vec![
        "| Topic | Trend score | Citation growth | Recent share |".to_string(),
        "|-------|-------------|-----------------|--------------|".to_string(),
    ];
    for topic in topics {
        rows.push(format!(
            "| {} | {:+.2} | {:+.1} | {:.1}% |",
            topic.topic,
            topic.trend_score,
            topic.citation_growth,
            topic.recent_share * 100.0
        ));
    }
    rows.push(String::new());
    rows
}

/// Inputs to the deep research report beyond the citation artefacts
#[derive(Debug, Clone)]
pub struct DeepReportContext<'a> {
    pub summary: Option<&'a str>,

    /// Keywords shown under "Keyword focus"
    pub keyword_label: String,
    pub generated_at: DateTime<Utc>,
}

/// Final deep research report wrapping the citation scan
pub fn render_deep_report(
    profile: &DeepResearchProfile,
    artifacts: &CitationArtifacts,
    context: &DeepReportContext<'_>,
) -> String {
    let (start_year, end_year) = (artifacts.start_year, artifacts.end_year);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{}\n", heading(profile.deep_report_title, start_year, end_year)));
    lines.push(format!(
        "_Generated {} by {}_\n",
        context.generated_at.format("%Y-%m-%d %H:%M UTC"),
        GENERATOR
    ));

    lines.push("## Executive Summary\n".into());
    match context.summary {
        Some(summary) => lines.push(format!("{}\n", summary.trim())),
        None => lines.push(
            "Deep Research synthesis was unavailable. See the deterministic citation scan and raw \
             data sections below.\n"
                .into(),
        ),
    }

    lines.push("## Citation Highlights\n".into());
    lines.push(format!("- Rolling window: **{}–{}**", start_year, end_year));
    lines.push(format!("- Keyword focus: **{}**", context.keyword_label));
    lines.push(format!("- Processed papers: **{}**\n", artifacts.papers.len()));
    let report_name = file_name(&artifacts.report_path);
    lines.push(format!("Full citation table: [`{}`]({}).\n", report_name, report_name));
    if let Some(chart) = &artifacts.chart_path {
        let caption = format!("{} citation visualisation", profile.display_name());
        lines.push(format!("![{}]({})\n", caption, file_name(chart)));
    }

    lines.push("### Top Citation Questions\n".into());
    if artifacts.questions.is_empty() {
        lines.push("- No citation questions were extracted.\n".into());
    } else {
        let shown = artifacts.questions.len().min(DEEP_REPORT_ROWS);
        lines.extend(question_table(&artifacts.questions[..shown]));
    }

    lines.push("### Emerging Topics\n".into());
    if artifacts.trending_topics.is_empty() {
        lines.push("- No accelerating topic clusters detected in the rolling window.\n".into());
    } else {
        let shown = artifacts.trending_topics.len().min(DEEP_REPORT_ROWS);
        lines.extend(trending_table(&artifacts.trending_topics[..shown]));
    }

    lines.push("### Research Gaps with High Citation Potential\n".into());
    if artifacts.research_gaps.is_empty() {
        lines.push("- No high-leverage gaps identified.\n".into());
    } else {
        for gap in artifacts.research_gaps.iter().take(DEEP_REPORT_ROWS) {
            let doi = gap
                .supporting_doi
                .as_ref()
                .map(|doi| format!("https://doi.org/{}", doi))
                .unwrap_or_else(|| "N/A".to_string());
            lines.push(format!(
                "- **{}** — {} Representative study: *{}* ({}).",
                gap.topic, gap.rationale, gap.representative_title, doi
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Assets & Raw Data\n".into());
    let dataset = artifacts
        .raw_data_path
        .as_deref()
        .map(file_name)
        .unwrap_or_else(|| "N/A".to_string());
    lines.push(format!("- Citation dataset: `{}`", dataset));
    lines.push(format!("- Citation report: `{}`", report_name));
    if let Some(chart) = &artifacts.chart_path {
        lines.push(format!("- Chart: `{}`", file_name(chart)));
    }
    if context.summary.is_some() {
        lines.push("- Deep Research summary embedded above.".into());
    }
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperRecord, ResearchGap};
    use crate::workflows::profiles::LCA_PROFILE;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn question(title: &str, citations: u64, doi: Option<&str>) -> CitationQuestion {
        CitationQuestion {
            question: format!("Why {}?", title),
            citation_count: citations,
            publication_year: 2023,
            paper_title: title.to_string(),
            journal: None,
            doi: doi.map(str::to_string),
            url: None,
            authors: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            keyword_hits: Default::default(),
        }
    }

    fn topic(name: &str) -> TrendingTopic {
        TrendingTopic {
            topic: name.to_string(),
            trend_score: 12.5,
            citation_growth: -3.0,
            recent_share: 0.5,
            coverage_years: (2020, 2024),
            top_papers: vec!["P1".into(), "P2".into(), "P3".into()],
        }
    }

    fn gap(doi: Option<&str>) -> ResearchGap {
        ResearchGap {
            topic: "Soil carbon".into(),
            paper_count: 2,
            avg_citations: 75.0,
            recent_papers: 1,
            representative_title: "Soil study".into(),
            supporting_doi: doi.map(str::to_string),
            rationale: "Few papers.".into(),
        }
    }

    fn artifacts() -> CitationArtifacts {
        let mut paper = PaperRecord::new("W1", "Cited paper", 2023);
        paper.citation_count = 9;
        let mut uncited = PaperRecord::new("W2", "Quiet paper", 2022);
        uncited.url = Some("https://example.org/w2".into());
        CitationArtifacts {
            report_path: PathBuf::from("out/lca_citations.md"),
            chart_path: None,
            raw_data_path: Some(PathBuf::from("out/lca_citations.json")),
            start_year: 2020,
            end_year: 2024,
            keywords: vec!["sdg".into(), "lca".into(), "sdg".into()],
            papers: vec![uncited, paper],
            questions: vec![question("steel", 9, Some("10.1/x"))],
            trending_topics: vec![topic("Carbon")],
            research_gaps: vec![gap(Some("10.1/g")), gap(None)],
        }
    }

    #[test]
    fn test_empty_and_failure_reports() {
        let profile = &LCA_PROFILE.citation;
        let empty = render_empty_report(profile, 2020, 2024);
        assert!(empty.starts_with("# LCA Citation Intelligence (2020–2024)\n\nNo qualifying papers"));
        let failed = render_failure_report(profile, 2020, 2024, "boom");
        assert_eq!(
            failed,
            "# LCA Citation Intelligence (2020–2024)\n\n\
             The workflow failed to collect literature from OpenAlex.\nError detail: boom"
        );
    }

    #[test]
    fn test_citation_report_sections() {
        let report = render_citation_report(&LCA_PROFILE.citation, &artifacts());
        assert!(report.contains("- Query keywords: lca, sdg."));
        assert!(report.contains("- Corpus size: 2 papers within the last 5 years.\n"));
        assert!(report.contains("- Highest cited question: **Why steel?** (9 citations, 2023)."));
        assert!(report.contains("(trend score +12.50, 50.0% of weighted citations"));
        assert!(report.contains("| Why steel? | 9 | 2023 | — | A, B, C | [10.1/x](https://doi.org/10.1/x) |"));
        assert!(report.contains("| Carbon | +12.50 | -3.0 | 50.0% | P1; P2 |"));
        assert!(report.contains(
            "- **Soil carbon** — Few papers. Representative study: *Soil study* (DOI: https://doi.org/10.1/g)."
        ));
        assert!(report.contains("Representative study: *Soil study*.\n"));
        assert!(report.contains("- Chart generation unavailable."));
        assert!(report.contains("Raw dataset cached at `out/lca_citations.json`"));
    }

    #[test]
    fn test_appendix_is_ordered_by_citations() {
        let report = render_citation_report(&LCA_PROFILE.citation, &artifacts());
        let cited = report.find("- **Cited paper** (2023) — Unknown venue — 9 citations — N/A").unwrap();
        let quiet = report
            .find("- **Quiet paper** (2022) — Unknown venue — 0 citations — https://example.org/w2")
            .unwrap();
        assert!(cited < quiet);
    }

    #[test]
    fn test_chart_embedded_when_present() {
        let mut artifacts = artifacts();
        artifacts.chart_path = Some(PathBuf::from("out/lca_trends.png"));
        let report = render_citation_report(&LCA_PROFILE.citation, &artifacts);
        assert!(report.contains("![Emerging LCA topics](out/lca_trends.png)\n"));
    }

    #[test]
    fn test_empty_sections() {
        let mut artifacts = artifacts();
        artifacts.questions.clear();
        artifacts.trending_topics.clear();
        artifacts.research_gaps.clear();
        artifacts.raw_data_path = None;
        let report = render_citation_report(&LCA_PROFILE.citation, &artifacts);
        assert!(!report.contains("## Quick insight"));
        assert!(report.contains("Not enough citation metadata to surface leading questions."));
        assert!(report.contains("No accelerating topic clusters detected; consider widening the query window."));
        assert!(report.contains("- No high-impact gaps detected under current filters."));
        assert!(!report.contains("Raw dataset cached"));
    }

    #[test]
    fn test_deep_report() {
        let mut artifacts = artifacts();
        artifacts.chart_path = Some(PathBuf::from("out/lca_trends.png"));
        let context = DeepReportContext {
            summary: Some("  Key findings.  "),
            keyword_label: "lca, sdg".into(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        };
        let report = render_deep_report(&LCA_PROFILE, &artifacts, &context);
        assert!(report.starts_with("# LCA × Planetary Boundaries Deep Research (2020–2024)\n"));
        assert!(report.contains("_Generated 2024-05-01 09:30 UTC by lca-scout_"));
        assert!(report.contains("## Executive Summary\n\nKey findings.\n"));
        assert!(report.contains("- Keyword focus: **lca, sdg**"));
        assert!(report.contains("Full citation table: [`lca_citations.md`](lca_citations.md)."));
        assert!(report.contains("![LCA × Planetary Boundaries citation visualisation](lca_trends.png)"));
        assert!(report.contains("| Why steel? | 9 | 2023 | — | [10.1/x](https://doi.org/10.1/x) |"));
        assert!(report.contains("| Carbon | +12.50 | -3.0 | 50.0% |"));
        assert!(report.contains("Representative study: *Soil study* (N/A)."));
        assert!(report.contains("- Citation dataset: `lca_citations.json`"));
        assert!(report.contains("- Chart: `lca_trends.png`"));
        assert!(report.contains("- Deep Research summary embedded above."));
    }

    #[test]
    fn test_deep_report_without_summary() {
        let mut artifacts = artifacts();
        artifacts.questions.clear();
        artifacts.raw_data_path = None;
        let context = DeepReportContext {
            summary: None,
            keyword_label: String::new(),
            generated_at: Utc::now(),
        };
        let report = render_deep_report(&LCA_PROFILE, &artifacts, &context);
        assert!(report.contains("Deep Research synthesis was unavailable."));
        assert!(report.contains("- No citation questions were extracted."));
        assert!(report.contains("- Citation dataset: `N/A`"));
        assert!(!report.contains("embedded above"));
        assert!(!report.contains("- Chart:"));
    }
}
