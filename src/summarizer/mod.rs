pub mod openai;

use crate::config::SummarizerSettings;
use crate::error::{Error, Result};
use openai::RepoSummary;
use regex::Regex;
use tracing::{info, warn};

/// Result of one summarization attempt. The mock flag marks results from
/// the deterministic offline fallback and is surfaced to the caller.
#[derive(Debug, Clone)]
pub enum SummaryOutcome {
    Success {
        summary: String,
        cool_facts: Vec<String>,
        mock: bool,
    },
    Failure(String),
}

/// Turns README text into `{summary, cool_facts}`: one structured
/// completion call when a credential is configured, otherwise the
/// deterministic offline heuristic.
#[derive(Clone)]
pub struct Summarizer {
    client: reqwest::Client,
    settings: SummarizerSettings,
}

impl Summarizer {
    pub fn new(settings: SummarizerSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// One attempt per caller request. A configured credential that fails
    /// yields Failure; it never silently falls back to the mock path.
    pub async fn summarize(&self, readme: &str) -> SummaryOutcome {
        if !self.settings.is_configured() {
            info!("MOCK MODE: no completion API key configured, returning mock summary");
            let RepoSummary {
                summary,
                cool_facts,
            } = mock_summary(readme);
            return SummaryOutcome::Success {
                summary,
                cool_facts,
                mock: true,
            };
        }

        match openai::complete_summary(&self.client, &self.settings, readme).await {
            Ok(result) => SummaryOutcome::Success {
                summary: result.summary,
                cool_facts: result.cool_facts,
                mock: false,
            },
            Err(e) => {
                warn!("Summarization failed: {}", e.log_safe());
                SummaryOutcome::Failure(e.to_string())
            }
        }
    }
}

/// Deterministic offline summary: first level-1 heading becomes the title,
/// up to 3 bullet lines become pseudo-facts, everything clearly labeled
/// as mock output.
pub fn mock_summary(readme: &str) -> RepoSummary {
    let title_re = Regex::new(r"(?m)^#\s+(.+)$").unwrap();
    let title = title_re
        .captures(readme)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "This project".to_string());

    let bullet_re = Regex::new(r"(?m)^[-*]\s+(.+)$").unwrap();
    let features: Vec<String> = bullet_re
        .captures_iter(readme)
        .take(3)
        .map(|c| format!("[MOCK] {}", c[1].trim()))
        .collect();

    let cool_facts = if features.is_empty() {
        vec![
            "[MOCK] This is a placeholder fact #1".to_string(),
            "[MOCK] This is a placeholder fact #2".to_string(),
            "[MOCK] This is a placeholder fact #3".to_string(),
        ]
    } else {
        features
    };

    RepoSummary {
        summary: format!(
            "{title} is a software project. This is a MOCK summary generated for testing \
             purposes because no completion API key was provided. The actual summary would \
             analyze the README content and provide meaningful insights."
        ),
        cool_facts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    #[test]
    fn test_mock_summary_extracts_title_and_bullets() {
        let readme = "# Foo\n\nSome intro.\n\n- fast\n- safe\n- small\n- extra";
        let result = mock_summary(readme);

        assert!(result.summary.contains("Foo"));
        assert!(result.summary.contains("MOCK"));
        assert_eq!(result.cool_facts.len(), 3);
        assert_eq!(result.cool_facts[0], "[MOCK] fast");
        assert_eq!(result.cool_facts[1], "[MOCK] safe");
        assert_eq!(result.cool_facts[2], "[MOCK] small");
    }

    #[test]
    fn test_mock_summary_star_bullets_and_missing_title() {
        let readme = "intro without heading\n* alpha\n* beta";
        let result = mock_summary(readme);

        assert!(result.summary.starts_with("This project"));
        assert_eq!(result.cool_facts, vec!["[MOCK] alpha", "[MOCK] beta"]);
    }

    #[test]
    fn test_mock_summary_placeholder_facts_without_bullets() {
        let result = mock_summary("# Bare\n\nNo lists here.");
        assert_eq!(result.cool_facts.len(), 3);
        assert!(result.cool_facts.iter().all(|f| f.starts_with("[MOCK] ")));
    }

    #[test]
    fn test_mock_summary_ignores_deeper_headings() {
        // Level-2 headings must not be mistaken for the title
        let result = mock_summary("## Subsection\n\n# Real Title\n");
        assert!(result.summary.contains("Real Title"));
    }

    #[tokio::test]
    async fn test_summarize_marks_mock_without_credential() {
        let summarizer = Summarizer::new(test_settings().summarizer).unwrap();
        match summarizer.summarize("# Foo\n- a\n- b\n- c").await {
            SummaryOutcome::Success {
                summary,
                cool_facts,
                mock,
            } => {
                assert!(mock);
                assert!(summary.contains("Foo"));
                assert_eq!(cool_facts.len(), 3);
            }
            SummaryOutcome::Failure(e) => panic!("unexpected failure: {e}"),
        }
    }
}
