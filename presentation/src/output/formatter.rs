//! Output formatter trait

use crate::output::view::RoundView;

/// Trait for formatting round results
pub trait OutputFormatter {
    /// Format every message of the round
    fn format(&self, round: &RoundView) -> String;

    /// Format as JSON
    fn format_json(&self, round: &RoundView) -> String;

    /// Format the synthesis only (concise output)
    fn format_synthesis_only(&self, round: &RoundView) -> String;

    /// Dispatch on the configured format.
    fn render(&self, round: &RoundView, format: roundtable_domain::OutputFormat) -> String {
        match format {
            roundtable_domain::OutputFormat::Full => self.format(round),
            roundtable_domain::OutputFormat::Summary => self.format_synthesis_only(round),
            roundtable_domain::OutputFormat::Json => self.format_json(round),
        }
    }
}
