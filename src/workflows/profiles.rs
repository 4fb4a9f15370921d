//! Built-in research profiles.
//!
//! A profile fixes everything domain specific about a run: which keywords
//! gate the corpus, how OpenAlex is queried, how charts are titled and which
//! prompt seeds the synthesis step.

use super::WorkflowError;
use crate::analysis::DEFAULT_KEYWORDS;

/// Citation scan settings for one research domain
#[derive(Debug, Clone, PartialEq)]
pub struct CitationProfile {
    pub slug: &'static str,
    pub display_name: &'static str,

    /// Short label used in report titles and chart captions
    pub short_name: &'static str,

    /// One-sentence description of the corpus, rendered in the report
    pub focus_description: &'static str,

    pub default_keywords: &'static [&'static str],

    /// Keyword every retained paper must mention
    pub anchor_keyword: &'static str,

    /// OpenAlex free-text search phrase
    pub search_phrase: &'static str,

    /// OpenAlex concept ids, OR-ed together
    pub concept_ids: &'static [&'static str],

    /// Closes the rationale sentence of keyword gaps
    pub gap_suffix: &'static str,

    pub chart_topic_title: Option<&'static str>,
    pub chart_question_title: Option<&'static str>,
}

impl CitationProfile {
    /// Trimmed, lower-cased default keywords
    pub fn normalised_keywords(&self) -> Vec<String> {
        self.default_keywords
            .iter()
            .map(|kw| kw.trim().to_lowercase())
            .filter(|kw| !kw.is_empty())
            .collect()
    }

    pub fn topic_chart_title(&self) -> String {
        match self.chart_topic_title {
            Some(title) => title.to_string(),
            None => format!("Emerging {} topics by citation momentum", self.display_name),
        }
    }

    pub fn question_chart_title(&self) -> String {
        match self.chart_question_title {
            Some(title) => title.to_string(),
            None => format!("Top {} questions by citation count", self.display_name),
        }
    }

    /// Title of the citation report
    pub fn report_title(&self) -> String {
        format!("{} Citation Intelligence", self.short_name)
    }

    /// Alt text of the trend chart
    pub fn chart_caption(&self) -> String {
        format!("Emerging {} topics", self.short_name)
    }
}

/// A citation profile plus the synthesis prompt and artefact naming
#[derive(Debug, Clone, PartialEq)]
pub struct DeepResearchProfile {
    pub citation: CitationProfile,
    pub deep_report_title: &'static str,
    pub prompt_question: &'static str,
    pub prompt_follow_ups: &'static [&'static str],

    /// Fallback prompt context; `{years}` is substituted
    pub prompt_context_template: &'static str,
    pub prompt_instructions: &'static str,
}

impl DeepResearchProfile {
    pub fn slug(&self) -> &'static str {
        self.citation.slug
    }

    pub fn display_name(&self) -> &'static str {
        self.citation.display_name
    }

    pub fn prompt_context(&self, years: u32) -> String {
        self.prompt_context_template
            .replace("{years}", &years.to_string())
    }

    pub fn citation_report_filename(&self) -> String {
        format!("{}_citations.md", self.slug())
    }

    pub fn chart_filename(&self) -> String {
        format!("{}_trends.png", self.slug())
    }

    pub fn dataset_filename(&self) -> String {
        format!("{}_citations.json", self.slug())
    }

    pub fn final_report_filename(&self) -> String {
        format!("{}_deep_report.md", self.slug())
    }
}

/// Life cycle assessment literature at the planetary boundaries / SDG intersection
pub const LCA_PROFILE: DeepResearchProfile = DeepResearchProfile {
    citation: CitationProfile {
        slug: "lca",
        display_name: "LCA × Planetary Boundaries",
        short_name: "LCA",
        focus_description: "peer-reviewed LCA journals intersecting planetary boundaries and SDGs, \
                            filtered via OpenAlex (concept-driven) with Semantic Scholar enrichment when available",
        default_keywords: DEFAULT_KEYWORDS,
        anchor_keyword: "life cycle assessment",
        search_phrase: "life cycle assessment sustainability \"planetary boundaries\" \"sustainable development goals\"",
        concept_ids: &["C2778706760"],
        gap_suffix: " with LCA framing.",
        chart_topic_title: Some("Emerging LCA topics by citation momentum"),
        chart_question_title: Some("Top LCA questions by citation count"),
    },
    deep_report_title: "LCA × Planetary Boundaries Deep Research",
    prompt_question: "Investigate how recent peer-reviewed life cycle assessment (LCA) research connects \
                      planetary boundaries with the Sustainable Development Goals.",
    prompt_follow_ups: &[
        "Which research questions attract the highest citation energy and why?",
        "Which LCA sub-topics show accelerating citation trends in the last few years?",
        "Where do clear research gaps remain that could yield high impact if addressed?",
    ],
    prompt_context_template: "Time horizon: last {years} years. Assume the deterministic citation scan has \
                              already filtered relevant journals and returns structured summaries.",
    prompt_instructions: "Synthesize the findings into concise sections that complement the deterministic \
                          citation scan provided in the context. Highlight citation leaders, accelerating \
                          themes, and unanswered questions.",
};

static PROFILES: &[DeepResearchProfile] = &[LCA_PROFILE];

/// All built-in profiles
pub fn list_profiles() -> &'static [DeepResearchProfile] {
    PROFILES
}

pub fn get_citation_profile(slug: &str) -> Result<&'static CitationProfile, WorkflowError> {
    PROFILES
        .iter()
        .find(|p| p.slug() == slug)
        .map(|p| &p.citation)
        .ok_or_else(|| WorkflowError::UnknownProfile {
            kind: "citation",
            slug: slug.to_string(),
        })
}

pub fn get_deep_research_profile(slug: &str) -> Result<&'static DeepResearchProfile, WorkflowError> {
    PROFILES
        .iter()
        .find(|p| p.slug() == slug)
        .ok_or_else(|| WorkflowError::UnknownProfile {
            kind: "deep research",
            slug: slug.to_string(),
        })
}
