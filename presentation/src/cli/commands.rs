//! CLI command definitions

use clap::{Parser, ValueEnum};
use roundtable_domain::{ChatMode, ErrorCategory, Model};
use std::path::PathBuf;

/// Output format for round results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every message of the round
    Full,
    /// Only the moderator synthesis and failure markers
    Summary,
    /// JSON output
    Json,
}

impl From<OutputFormat> for roundtable_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => roundtable_domain::OutputFormat::Full,
            OutputFormat::Summary => roundtable_domain::OutputFormat::Summary,
            OutputFormat::Json => roundtable_domain::OutputFormat::Json,
        }
    }
}

/// Chat mode of a new thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Debating,
    Analyzing,
    Brainstorming,
    Solving,
}

impl From<Mode> for ChatMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Debating => ChatMode::Debating,
            Mode::Analyzing => ChatMode::Analyzing,
            Mode::Brainstorming => ChatMode::Brainstorming,
            Mode::Solving => ChatMode::Solving,
        }
    }
}

/// CLI arguments for roundtable
#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(author, version, about = "Multi-model roundtable - models answer in turn, a moderator synthesizes")]
#[command(long_about = r#"
Roundtable runs one conversation thread with several AI participants.

Each question is a round:
1. Optional web search whose results every participant sees
2. Participants answer one after another, each seeing the earlier answers
3. A moderator synthesizes the round

Several questions run as consecutive rounds of the same thread.

Configuration files are loaded from (in priority order):
1. ROUNDTABLE_* environment variables
2. --config <path>        Explicit config file
3. ./roundtable.toml      Project-level config
4. ~/.config/roundtable/config.toml   Global config

Example:
  roundtable "What's the best way to handle errors in Rust?"
  roundtable -p gpt-5.2 -p claude-sonnet-4.5 --web-search "Compare async runtimes"
  roundtable --fail grok-4=rate_limit -p grok-4 -p gpt-5.2 "Is unsafe ever fine?"
"#)]
pub struct Cli {
    /// Questions to ask, one round each
    pub questions: Vec<String>,

    /// Participants in speaking order (can be specified multiple times)
    #[arg(short, long = "participant", value_name = "MODEL")]
    pub participants: Vec<String>,

    /// Model to use as moderator for the synthesis
    #[arg(long, value_name = "MODEL")]
    pub moderator: Option<String>,

    /// Chat mode for the new thread
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Run a web search before each round
    #[arg(long)]
    pub web_search: bool,

    /// Inject a failure: MODEL=CATEGORY (e.g. gpt-5.2=rate_limit)
    #[arg(long = "fail", value_name = "MODEL=CATEGORY", value_parser = parse_failure)]
    pub failures: Vec<(Model, ErrorCategory)>,

    /// Drop the connection during MODEL's answer, reload and resume the stream
    #[arg(long, value_name = "MODEL")]
    pub interrupt: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    pub fn interrupt_model(&self) -> Option<Model> {
        let Ok(model) = self.interrupt.as_deref()?.parse::<Model>();
        Some(model)
    }
}

/// Parse `MODEL=CATEGORY`.
pub fn parse_failure(s: &str) -> Result<(Model, ErrorCategory), String> {
    let (model, category) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MODEL=CATEGORY, got '{}'", s))?;
    if model.trim().is_empty() {
        return Err("model name cannot be empty".to_string());
    }
    let category = category
        .trim()
        .parse::<ErrorCategory>()
        .map_err(|e| e.to_string())?;
    let Ok(model) = model.trim().parse::<Model>();
    Ok((model, category))
}
