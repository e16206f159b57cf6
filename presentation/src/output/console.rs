//! Console output formatter for round results

use crate::output::formatter::OutputFormatter;
use crate::output::view::RoundView;
use colored::Colorize;
use roundtable_domain::RecordStatus;

/// Formats round results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete round
    pub fn format(round: &RoundView) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Round {}", round.round_number + 1)));
        output.push('\n');

        if !round.title.is_empty() {
            output.push_str(&format!("{} {}\n", "Thread:".cyan().bold(), round.title));
        }
        output.push_str(&format!(
            "{} {}\n\n",
            "Question:".cyan().bold(),
            round.question
        ));

        if let Some(search) = &round.search {
            output.push_str(&Self::section_header("Web Search"));
            if search.status == RecordStatus::Complete {
                for query in &search.queries {
                    output.push_str(&format!("  {} {}\n", "query:".dimmed(), query));
                }
                for source in &search.sources {
                    output.push_str(&format!("  * {}\n", source));
                }
            } else {
                output.push_str(&format!(
                    "  {} {}\n",
                    search.status.as_str().yellow(),
                    search.error.as_deref().unwrap_or("no results")
                ));
            }
        }

        output.push_str(&Self::section_header("Participants"));
        for answer in &round.answers {
            if answer.succeeded() {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!("── {} ──", answer.model).yellow().bold(),
                    answer.text
                ));
            } else {
                output.push_str(&format!(
                    "\n{}\nError ({}): {}\n",
                    format!("── {} ──", answer.model).red().bold(),
                    answer.error_category.as_deref().unwrap_or("unknown"),
                    answer.error.as_deref().unwrap_or("Unknown")
                ));
            }
        }

        output.push_str(&Self::section_header("Moderator"));
        output.push_str(&Self::synthesis_block(round));

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(round: &RoundView) -> String {
        serde_json::to_string_pretty(round).unwrap_or_else(|_| "{}".to_string())
    }

    /// Several rounds as one JSON array
    pub fn format_json_rounds(rounds: &[RoundView]) -> String {
        serde_json::to_string_pretty(rounds).unwrap_or_else(|_| "[]".to_string())
    }

    /// Format the synthesis only (concise output)
    pub fn format_synthesis_only(round: &RoundView) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            format!("=== Round {} Conclusion ===", round.round_number + 1)
                .cyan()
                .bold()
        ));
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), round.question));

        let models: Vec<&str> = round.answers.iter().map(|a| a.model.as_str()).collect();
        output.push_str(&format!(
            "{} {}\n",
            "Models consulted:".dimmed(),
            models.join(", ")
        ));
        for failed in round.failed_answers() {
            output.push_str(&format!(
                "{} {} ({})\n",
                "x".red(),
                failed.model,
                failed.error_category.as_deref().unwrap_or("unknown")
            ));
        }
        output.push('\n');

        output.push_str(&Self::synthesis_block(round));
        output
    }

    fn synthesis_block(round: &RoundView) -> String {
        match (&round.synthesis, round.moderator_status) {
            (Some(synthesis), Some(RecordStatus::Complete)) => {
                let heading = round
                    .moderator_model
                    .as_deref()
                    .map(|m| format!("Moderator: {}", m))
                    .unwrap_or_else(|| "Moderator".to_string());
                format!("\n{}\n\n{}\n", heading.yellow().bold(), synthesis)
            }
            (_, Some(status)) => format!(
                "\n{}\n",
                format!("Moderator synthesis {}", status.as_str()).red()
            ),
            (_, None) => format!("\n{}\n", "No moderator synthesis".dimmed()),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, round: &RoundView) -> String {
        Self::format(round)
    }

    fn format_json(&self, round: &RoundView) -> String {
        Self::format_json(round)
    }

    fn format_synthesis_only(&self, round: &RoundView) -> String {
        Self::format_synthesis_only(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::view::AnswerView;
    use roundtable_domain::FlowState;

    fn round() -> RoundView {
        RoundView {
            thread_id: "thread-1".to_string(),
            title: "Why Rust".to_string(),
            slug: "why-rust-1".to_string(),
            round_number: 0,
            question: "Why Rust?".to_string(),
            search: None,
            answers: vec![
                AnswerView {
                    index: 0,
                    model: "gpt-5.2".to_string(),
                    text: "Memory safety.".to_string(),
                    error_category: None,
                    error: None,
                },
                AnswerView {
                    index: 1,
                    model: "grok-4".to_string(),
                    text: String::new(),
                    error_category: Some("rate_limit".to_string()),
                    error: Some("Rate limit exceeded".to_string()),
                },
            ],
            moderator_model: Some("claude-sonnet-4.5".to_string()),
            moderator_status: Some(RecordStatus::Complete),
            synthesis: Some("**Conclusion**: safety wins.".to_string()),
            flow_state: FlowState::Complete,
        }
    }

    #[test]
    fn test_full_lists_every_participant() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format(&round());
        assert!(text.contains("── gpt-5.2 ──\nMemory safety."));
        assert!(text.contains("Error (rate_limit): Rate limit exceeded"));
        assert!(text.contains("Moderator: claude-sonnet-4.5"));
    }

    #[test]
    fn test_summary_marks_failures() {
        colored::control::set_override(false);
        let text = ConsoleFormatter.render(&round(), roundtable_domain::OutputFormat::Summary);
        assert!(text.contains("x grok-4 (rate_limit)"));
        assert!(text.ends_with("**Conclusion**: safety wins.\n"));
        assert!(!text.contains("Memory safety."));
    }

    #[test]
    fn test_failed_synthesis() {
        colored::control::set_override(false);
        let mut round = round();
        round.synthesis = None;
        round.moderator_status = Some(RecordStatus::Failed);
        assert!(ConsoleFormatter::format_synthesis_only(&round).contains("Moderator synthesis failed"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&round());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["flow_state"], "COMPLETE");

        let all = ConsoleFormatter::format_json_rounds(&[round(), round()]);
        let value: serde_json::Value = serde_json::from_str(&all).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }
}
