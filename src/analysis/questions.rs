//! Citation questions synthesised from paper titles.

use crate::models::{rank_by_citations, CitationQuestion, PaperRecord};

/// Questions derived per run
pub const DEFAULT_QUESTION_LIMIT: usize = 8;

/// Characters kept before a marker when cutting the title phrase
const WINDOW_BEFORE: usize = 40;

/// Characters kept from the marker start onwards
const WINDOW_AFTER: usize = 60;

/// Marker substrings checked in order, each with its question template
const MARKER_TEMPLATES: &[(&str, &str)] = &[
    (
        "integrat",
        "How can {phrase} be integrated into mainstream life cycle assessment practice?",
    ),
    ("impact", "What is the impact of {phrase} on sustainability outcomes?"),
    ("framework", "Which frameworks enable {phrase} in LCA studies?"),
    ("method", "Which methodological advances address {phrase}?"),
    ("policy", "How does policy guidance influence {phrase}?"),
];

/// Turn a paper title into a research question with fixed string rules
pub fn title_to_question(title: &str) -> String {
    let clean = title.trim().trim_end_matches('.');
    if clean.ends_with('?') {
        return clean.to_string();
    }

    if let Some((lead, tail)) = clean.split_once(':') {
        let (lead, tail) = (lead.trim(), tail.trim());
        if !lead.is_empty() && !tail.is_empty() {
            return format!(
                "How does {} relate to {} within life cycle assessment?",
                lead.to_lowercase(),
                tail.to_lowercase()
            );
        }
    }

    let lower = clean.to_lowercase();
    for (marker, template) in MARKER_TEMPLATES {
        if lower.contains(marker) {
            return template.replace("{phrase}", &phrase_around(clean, &lower, marker));
        }
    }

    format!(
        "What does \"{}\" reveal about advancing life cycle assessment?",
        clean
    )
}

/// Cut a window of the title around the first marker occurrence, measured in
/// characters of the lower-cased title
fn phrase_around(title: &str, lower: &str, marker: &str) -> String {
    let Some(byte_idx) = lower.find(marker) else {
        return title.to_lowercase();
    };
    let idx = lower[..byte_idx].chars().count();
    let start = idx.saturating_sub(WINDOW_BEFORE);
    let end = idx + WINDOW_AFTER;

    let snippet: String = title.chars().skip(start).take(end.saturating_sub(start)).collect();
    snippet.trim().to_lowercase()
}

/// Project the `limit` most cited papers into citation questions
pub fn derive_top_questions(papers: &[PaperRecord], limit: usize) -> Vec<CitationQuestion> {
    rank_by_citations(papers)
        .into_iter()
        .take(limit)
        .map(|idx| {
            let paper = &papers[idx];
            CitationQuestion {
                question: title_to_question(&paper.title),
                citation_count: paper.citation_count,
                publication_year: paper.year,
                paper_title: paper.title.clone(),
                journal: paper.journal.clone(),
                doi: paper.doi.clone(),
                url: paper.url.clone(),
                authors: paper.authors.clone(),
                keyword_hits: paper.keyword_hits.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colon_split() {
        assert_eq!(
            title_to_question("Circular economy: a review"),
            "How does circular economy relate to a review within life cycle assessment?"
        );
    }

    #[test]
    fn test_question_passthrough() {
        let title = "Is LCA ready for planetary boundaries?";
        assert_eq!(title_to_question(title), title);
        assert_eq!(title_to_question("  Does it work?.  "), "Does it work?");
    }

    #[test]
    fn test_empty_colon_half_falls_through() {
        assert_eq!(
            title_to_question("Policy:"),
            "How does policy guidance influence policy:?"
        );
    }

    #[test]
    fn test_marker_priority() {
        // "impact" precedes "method" in the marker order
        assert_eq!(
            title_to_question("A method to quantify the impact of dams."),
            "What is the impact of a method to quantify the impact of dams on sustainability outcomes?"
        );
        assert_eq!(
            title_to_question("Integrating social indicators"),
            "How can integrating social indicators be integrated into mainstream life cycle assessment practice?"
        );
    }

    #[test]
    fn test_marker_window_is_character_based() {
        let prefix = "é".repeat(50);
        let title = format!("{} framework {}", prefix, "x".repeat(80));
        let question = title_to_question(&title);
        let phrase = question
            .strip_prefix("Which frameworks enable ")
            .and_then(|q| q.strip_suffix(" in LCA studies?"))
            .unwrap();
        // 40 characters before the marker, 60 from its start
        assert_eq!(phrase.chars().count(), 100);
        assert!(phrase.starts_with(&"é".repeat(39)));
        assert!(phrase.contains("framework"));
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            title_to_question("Wind turbines in Denmark"),
            "What does \"Wind turbines in Denmark\" reveal about advancing life cycle assessment?"
        );
    }

    #[test]
    fn test_derive_top_questions() {
        let papers: Vec<PaperRecord> = [(3, "Low"), (30, "High"), (10, "Mid")]
            .iter()
            .enumerate()
            .map(|(i, (c, t))| {
                let mut p = PaperRecord::new(format!("W{}", i), *t, 2022);
                p.citation_count = *c;
                p
            })
            .collect();
        let questions = derive_top_questions(&papers, 2);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].paper_title, "High");
        assert_eq!(questions[1].citation_count, 10);
    }
}
