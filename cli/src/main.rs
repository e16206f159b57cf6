//! CLI entrypoint for roundtable
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use roundtable_application::{
    ChatStore, ConversationLogger, NoConversationLogger, NoProgress, RoundOutcome, RoundParams,
    RoundProgressNotifier, ResumeStreamUseCase, RunRoundUseCase,
};
use roundtable_domain::{
    ChatMode, ConfigIssue, Model, OutputFormat, Participant, ScreenMode, StalenessPolicy,
};
use roundtable_infrastructure::{
    ConfigLoader, FileConfig, InMemoryStreamRegistry, InMemoryThreadRepository,
    JsonlConversationLogger, SimulatedParticipantStreamer, StaticSearchProvider,
};
use roundtable_presentation::{
    Cli, ConsoleFormatter, ConsoleNavigator, InterruptAfterFirstChunk, OutputFormatter,
    ProgressReporter, RoundView,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

type Rounds =
    RunRoundUseCase<SimulatedParticipantStreamer, StaticSearchProvider, InMemoryThreadRepository>;
type Resume = ResumeStreamUseCase<InMemoryStreamRegistry, InMemoryThreadRepository>;

/// Council settings after CLI flags are layered over the config file
struct Council {
    participants: Vec<Model>,
    moderator: Model,
    mode: ChatMode,
    web_search: bool,
}

impl Council {
    fn resolve(cli: &Cli, config: &FileConfig) -> Self {
        let participants = if cli.participants.is_empty() {
            let (models, _) = config.council.parse_participants();
            if models.is_empty() {
                Model::default_participants()
            } else {
                models
            }
        } else {
            cli.participants.iter().map(|s| parse_model(s)).collect()
        };

        let moderator = cli
            .moderator
            .as_deref()
            .map(parse_model)
            .or_else(|| config.council.parse_moderator().0)
            .unwrap_or_else(Model::default_moderator);

        let mode = cli
            .mode
            .map(ChatMode::from)
            .or_else(|| config.council.parse_mode().0)
            .unwrap_or_default();

        Self {
            participants,
            moderator,
            mode,
            web_search: cli.web_search || config.council.web_search,
        }
    }
}

fn parse_model(s: &str) -> Model {
    let Ok(model) = s.parse::<Model>();
    model
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, &config)?;
    info!("Starting roundtable");

    let issues = config.validate();
    report_issues(&issues);
    if issues.iter().any(ConfigIssue::is_error) {
        bail!("Invalid configuration");
    }

    if cli.questions.is_empty() {
        bail!("At least one question is required. See --help.");
    }

    if !config.output.color {
        colored::control::set_override(false);
    }
    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();
    let council = Council::resolve(&cli, &config);
    let (policy, _) = config.timeouts.to_policy();

    // === Dependency Injection ===
    let repository = Arc::new(InMemoryThreadRepository::new());
    let registry = Arc::new(InMemoryStreamRegistry::new().with_repository(repository.clone()));
    let streamer = cli.failures.iter().fold(
        SimulatedParticipantStreamer::new().with_registry(registry.clone()),
        |streamer, (model, category)| streamer.with_failure(model, *category),
    );
    let navigator = Arc::new(ConsoleNavigator::new(cli.quiet));
    let logger: Arc<dyn ConversationLogger> = match config
        .logging
        .conversation_dir
        .as_ref()
        .and_then(|dir| JsonlConversationLogger::in_dir(dir))
    {
        Some(logger) => {
            info!(path = %logger.path().display(), "Writing conversation log");
            Arc::new(logger)
        }
        None => Arc::new(NoConversationLogger),
    };

    let rounds: Rounds = RunRoundUseCase::new(
        Arc::new(streamer),
        Arc::new(StaticSearchProvider::default()),
        repository.clone(),
    )
    .with_params(RoundParams::default().with_moderator(council.moderator.clone()))
    .with_navigator(navigator.clone())
    .with_conversation_logger(logger.clone());

    let resume: Resume = ResumeStreamUseCase::new(registry.clone(), repository.clone())
        .with_conversation_logger(logger)
        .with_idle_timeout(rounds.params().stream_idle_timeout);

    let mut store = ChatStore::with_policy(policy);
    store.update_participants(Participant::roster(&council.participants))?;
    store.set_chat_mode(council.mode)?;
    store.set_web_search_enabled(council.web_search)?;

    if !cli.quiet {
        eprintln!(
            "{} {}",
            "Participants:".cyan().bold(),
            council
                .participants
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        eprintln!("{} {}", "Moderator:".cyan().bold(), council.moderator);
        eprintln!();
    }

    let progress: Box<dyn RoundProgressNotifier> = if cli.quiet || !config.output.show_progress {
        Box::new(NoProgress)
    } else {
        Box::new(ProgressReporter::new())
    };

    let mut interrupt = cli.interrupt_model();
    let mut views = Vec::new();
    for question in &cli.questions {
        let outcome = match interrupt.take() {
            Some(target) => {
                run_interrupted(
                    &rounds,
                    &resume,
                    &repository,
                    policy,
                    &mut store,
                    question,
                    target,
                    progress.as_ref(),
                )
                .await?
            }
            None => {
                rounds
                    .execute_with_progress(
                        &mut store,
                        question,
                        progress.as_ref(),
                        &CancellationToken::new(),
                    )
                    .await?
            }
        };

        if !outcome.failed.is_empty() {
            warn!(
                round_number = outcome.round_number,
                failed = ?outcome.failed,
                "Some participants failed"
            );
        }
        if let Some(view) = RoundView::from_store(&store, outcome.round_number) {
            views.push(view);
        }
    }

    let formatter = ConsoleFormatter;
    if format == OutputFormat::Json {
        println!("{}", ConsoleFormatter::format_json_rounds(&views));
    } else {
        for view in &views {
            println!("{}", formatter.render(view, format));
        }
    }

    if let Some(location) = navigator.location() {
        info!(%location, "Thread location");
    }

    Ok(())
}

/// Run a round, drop the connection once `target` starts answering, then
/// reload the thread from persistence, resume the stream and finish the
/// round.
#[allow(clippy::too_many_arguments)]
async fn run_interrupted(
    rounds: &Rounds,
    resume: &Resume,
    repository: &InMemoryThreadRepository,
    policy: StalenessPolicy,
    store: &mut ChatStore,
    question: &str,
    target: Model,
    progress: &dyn RoundProgressNotifier,
) -> Result<RoundOutcome> {
    let cancel = CancellationToken::new();
    let notifier = InterruptAfterFirstChunk::new(progress, target.clone(), cancel.clone());

    match rounds
        .execute_with_progress(store, question, &notifier, &cancel)
        .await
    {
        Ok(outcome) => {
            warn!(model = %target, "Interrupt target never streamed; round ran uninterrupted");
            return Ok(outcome);
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    eprintln!(
        "{} connection dropped while {} was answering, reloading thread",
        "!".yellow().bold(),
        target
    );

    let thread_id = store
        .state()
        .thread_id()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Interrupted before a thread was created"))?;
    let (thread, participants) = repository
        .thread(&thread_id)
        .with_context(|| format!("Thread {} is not persisted", thread_id))?;

    // A reload lands on the thread page itself, so no navigation follows.
    let mut reloaded = ChatStore::with_policy(policy);
    reloaded.set_screen_mode(ScreenMode::Thread);
    reloaded.initialize_thread(thread, participants, repository.messages_for_thread(&thread_id));
    *store = reloaded;

    let resumed = resume.execute(store).await?;
    info!(?resumed, "Resumption finished");

    let Some((round_number, next_participant)) = resumed.continuation() else {
        bail!("Could not resume the interrupted round: {:?}", resumed);
    };
    Ok(rounds
        .continue_round(
            store,
            round_number,
            next_participant,
            progress,
            &CancellationToken::new(),
        )
        .await?)
}

/// Console logging from `-v`, plus an optional log file from config.
fn init_logging(verbose: u8, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(level));

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        if issue.is_error() {
            eprintln!("{} {}", "config error:".red().bold(), issue.message);
        } else {
            eprintln!("{} {}", "config warning:".yellow().bold(), issue.message);
        }
    }
}

fn print_config_sources() {
    println!("{}", "Configuration files (highest priority first):".bold());
    println!("  {} ROUNDTABLE_* environment variables", "-".dimmed());
    for (label, path) in ConfigLoader::config_sources() {
        match path {
            Some(path) if path.exists() => {
                println!("  {} {} ({})", "v".green(), label, path.display())
            }
            Some(path) => println!("  {} {} ({})", "-".dimmed(), label, path.display()),
            None => println!("  {} {}", "-".dimmed(), label),
        }
    }
}
