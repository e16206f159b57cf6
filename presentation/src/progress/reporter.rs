//! Progress reporting for round execution

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use roundtable_application::ports::progress::RoundProgressNotifier;
use roundtable_domain::Model;
use std::sync::Mutex;

/// Reports progress during a round with progress bars
pub struct ProgressReporter {
    multi: MultiProgress,
    round_bar: Mutex<Option<ProgressBar>>,
    moderator_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            round_bar: Mutex::new(None),
            moderator_bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_round_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bar) = self.round_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundProgressNotifier for ProgressReporter {
    fn on_round_start(&self, round_number: u32, participant_count: usize) {
        let pb = self.multi.add(ProgressBar::new(participant_count as u64));
        pb.set_style(Self::round_style());
        pb.set_prefix(format!("Round {}", round_number + 1));
        pb.set_message("Starting...");

        if let Ok(mut bar) = self.round_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_pre_search_start(&self, _round_number: u32) {
        self.with_round_bar(|pb| pb.set_message("Searching the web..."));
    }

    fn on_pre_search_complete(&self, _round_number: u32, success: bool) {
        let status = if success {
            format!("{} web search", "v".green())
        } else {
            format!("{} web search (continuing without)", "x".yellow())
        };
        self.with_round_bar(|pb| pb.set_message(status));
    }

    fn on_participant_start(&self, _index: usize, model: &Model) {
        self.with_round_bar(|pb| pb.set_message(format!("{} answering...", model)));
    }

    fn on_participant_complete(&self, _index: usize, model: &Model, success: bool) {
        let status = if success {
            format!("{} {}", "v".green(), model)
        } else {
            format!("{} {}", "x".red(), model)
        };
        self.with_round_bar(|pb| {
            pb.set_message(status);
            pb.inc(1);
        });
    }

    fn on_moderator_start(&self, model: &Model) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix("Moderator");
        pb.set_message(format!("{} synthesizing...", model));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        if let Ok(mut bar) = self.moderator_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_moderator_complete(&self, success: bool) {
        if let Some(pb) = self.moderator_bar.lock().ok().and_then(|mut bar| bar.take()) {
            if success {
                pb.finish_with_message("synthesis ready".green().to_string());
            } else {
                pb.finish_with_message("synthesis failed".red().to_string());
            }
        }
    }

    fn on_round_complete(&self, round_number: u32) {
        if let Some(pb) = self.round_bar.lock().ok().and_then(|mut bar| bar.take()) {
            pb.finish_with_message(format!(
                "{} complete!",
                format!("Round {}", round_number + 1).green()
            ));
        }
    }
}

/// Simple text-based progress (no progress bars)
///
/// Writes to stderr so JSON output on stdout stays parseable.
pub struct SimpleProgress;

impl RoundProgressNotifier for SimpleProgress {
    fn on_round_start(&self, round_number: u32, participant_count: usize) {
        eprintln!(
            "{} {} ({} participants)",
            "->".cyan(),
            format!("Round {}", round_number + 1).bold(),
            participant_count
        );
    }

    fn on_pre_search_complete(&self, _round_number: u32, success: bool) {
        if success {
            eprintln!("  {} web search", "v".green());
        } else {
            eprintln!("  {} web search (continuing without)", "x".yellow());
        }
    }

    fn on_participant_complete(&self, _index: usize, model: &Model, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), model);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), model);
        }
    }

    fn on_moderator_complete(&self, success: bool) {
        if success {
            eprintln!("  {} moderator", "v".green());
        } else {
            eprintln!("  {} moderator (failed)", "x".red());
        }
    }

    fn on_round_complete(&self, _round_number: u32) {
        eprintln!();
    }
}
