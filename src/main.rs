use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};

use rosary::app::SessionApp;
use rosary::completion::{CompletionService, JournalIntegration};
use rosary::config::Config;
use rosary::content::{Catalog, ContentResolver};
use rosary::effects::{
    Haptics, InhibitorKeepAwake, KeepAwake, NoopHaptics, NoopKeepAwake, SideEffects, TerminalBell,
};
use rosary::logging;
use rosary::persistence::{FileStore, PersistedSnapshot, SessionGateway, SystemClock};
use rosary::progress;
use rosary::sequence::{Mystery, Sequence};
use rosary::session::Stepper;
use rosary::ui;

/// How long to wait for completion deliveries before exiting
const COMPLETION_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "rosary")]
#[command(about = "Guided rosary sessions in the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pray a session (default when no command is given)
    Pray {
        /// Mysteries to pray (default: today's)
        mysteries: Vec<Mystery>,

        /// Pray all four sets of mysteries
        #[arg(long, conflicts_with = "mysteries")]
        complete: bool,

        /// Ignore any saved session
        #[arg(long)]
        fresh: bool,

        /// Skip the resume prompt and resume when possible
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Resume the saved session
    Resume,

    /// Show the saved session
    Status,

    /// Print the steps of a sequence without starting a session
    Sequence {
        mysteries: Vec<Mystery>,

        #[arg(long, conflicts_with = "mysteries")]
        complete: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Discard the saved session
    Clear,

    /// List completed sessions
    History {
        /// Number of most recent completions to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Print JSON schemas of the configuration and the saved session
    Schema,

    /// Write the effective configuration to .rosary/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Pray {
        mysteries: Vec::new(),
        complete: false,
        fresh: false,
        yes: false,
    });
    let is_interactive = matches!(command, Commands::Pray { .. } | Commands::Resume);

    let logging_handle = logging::init_logging(&config, is_interactive, cli.debug)?;

    let result = match command {
        Commands::Pray {
            mysteries,
            complete,
            fresh,
            yes,
        } => cmd_pray(&config, selectors_for(mysteries, complete), fresh, yes).await,
        Commands::Resume => cmd_resume(&config).await,
        Commands::Status => cmd_status(&config),
        Commands::Sequence {
            mysteries,
            complete,
            json,
        } => cmd_sequence(&config, &selectors_for(mysteries, complete), json),
        Commands::Clear => cmd_clear(&config),
        Commands::History { limit } => cmd_history(&config, limit),
        Commands::Schema => cmd_schema(),
        Commands::Init => cmd_init(&config),
    };

    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    result
}

/// Named mysteries, all four, or today's by the weekday schedule
fn selectors_for(mysteries: Vec<Mystery>, complete: bool) -> Vec<Mystery> {
    if complete {
        Mystery::complete()
    } else if mysteries.is_empty() {
        vec![Mystery::for_weekday(Local::now().weekday())]
    } else {
        mysteries
    }
}

fn open_gateway(config: &Config) -> SessionGateway {
    SessionGateway::new(
        Arc::new(FileStore::new(config.state_path())),
        Arc::new(SystemClock),
        config.session.storage_key.clone(),
        config.session.max_age(),
    )
}

/// Stepper for commands that only read or clear storage
fn headless_stepper(config: &Config) -> Stepper<Mystery> {
    Stepper::new(config.sequence, open_gateway(config), SideEffects::noop())
}

fn interactive_stepper(config: &Config, completion: Arc<CompletionService>) -> Stepper<Mystery> {
    let keep_awake: Box<dyn KeepAwake> = if config.effects.keep_awake {
        Box::new(InhibitorKeepAwake::detect())
    } else {
        Box::new(NoopKeepAwake)
    };
    let haptics: Box<dyn Haptics> = if config.effects.haptics {
        Box::new(TerminalBell)
    } else {
        Box::new(NoopHaptics)
    };

    let effects = SideEffects::new(keep_awake, haptics, completion)
        .with_keep_awake_enabled(config.effects.keep_awake);
    Stepper::new(config.sequence, open_gateway(config), effects)
}

fn content_for(config: &Config) -> Catalog {
    Catalog::load(config.content.catalog.as_deref().map(Path::new))
}

async fn cmd_pray(
    config: &Config,
    selectors: Vec<Mystery>,
    fresh: bool,
    skip_confirm: bool,
) -> Result<()> {
    let completion = Arc::new(CompletionService::from_config(config)?);
    let mut stepper = interactive_stepper(config, completion.clone());

    let mut resumed = false;
    if fresh {
        stepper.gateway().clear();
    } else if let Some(snapshot) = stepper.gateway().load::<Mystery>() {
        let now_millis = stepper.gateway().now_millis();
        if skip_confirm || confirm_resume(config, &snapshot, now_millis)? {
            resumed = stepper.try_resume();
        }
    }

    if !resumed {
        stepper
            .start(&selectors)
            .context("Cannot build a sequence for these mysteries")?;
    }

    let selectors = restart_selectors(&stepper, selectors);
    run_session(stepper, config, selectors, &completion).await
}

async fn cmd_resume(config: &Config) -> Result<()> {
    let completion = Arc::new(CompletionService::from_config(config)?);
    let mut stepper = interactive_stepper(config, completion.clone());

    if !stepper.try_resume() {
        println!("No session to resume");
        return Ok(());
    }

    let selectors = restart_selectors(&stepper, Vec::new());
    run_session(stepper, config, selectors, &completion).await
}

/// Mysteries a restart from the finished screen prays: those of the loaded
/// session, or `requested` when nothing is loaded
fn restart_selectors(stepper: &Stepper<Mystery>, requested: Vec<Mystery>) -> Vec<Mystery> {
    stepper
        .state()
        .map(|state| state.parametrization().to_vec())
        .unwrap_or(requested)
}

async fn run_session(
    stepper: Stepper<Mystery>,
    config: &Config,
    selectors: Vec<Mystery>,
    completion: &CompletionService,
) -> Result<()> {
    ui::install_panic_hook();

    let mut app = SessionApp::new(stepper, Box::new(content_for(config)), selectors);
    let result = app.run();

    // Release keep-awake before waiting on deliveries
    drop(app);
    completion.flush(COMPLETION_FLUSH_TIMEOUT).await;

    result
}

fn confirm_resume(
    config: &Config,
    snapshot: &PersistedSnapshot<Mystery>,
    now_millis: i64,
) -> Result<bool> {
    let total = config
        .sequence
        .sequence_len(snapshot.parametrization.len());

    println!("A saved session is waiting:");
    println!();
    println!("  Mysteries: {}", describe(&snapshot.parametrization));
    println!("  Step:      {} of {}", snapshot.current_index + 1, total);
    println!("  Saved:     {}", format_age(snapshot.age_millis(now_millis)));
    println!();
    print!("Resume? [Y/n] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim();

    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}

fn cmd_status(config: &Config) -> Result<()> {
    let stepper = headless_stepper(config);
    let gateway = stepper.gateway();

    let Some(snapshot) = gateway.load::<Mystery>() else {
        println!("No saved session");
        return Ok(());
    };

    let sequence = Sequence::build(&snapshot.parametrization, config.sequence)?;
    let percentage = progress::percentage(snapshot.current_index, sequence.len(), false);

    println!("Saved Session");
    println!("{}", "─".repeat(40));
    println!("  Mysteries: {}", describe(&snapshot.parametrization));
    println!(
        "  Step:      {} of {} ({}%)",
        snapshot.current_index + 1,
        sequence.len(),
        percentage
    );
    println!(
        "  Saved:     {}",
        format_age(snapshot.age_millis(gateway.now_millis()))
    );

    let remaining = gateway
        .max_age_millis()
        .saturating_sub(snapshot.age_millis(gateway.now_millis()));
    println!("  Expires:   in {}", format_duration(remaining.max(0)));

    Ok(())
}

fn cmd_sequence(config: &Config, selectors: &[Mystery], json: bool) -> Result<()> {
    let sequence = Sequence::build(selectors, config.sequence)?;
    let layout = progress::project(&sequence, 0);

    if json {
        let output = serde_json::json!({
            "shape": sequence.shape(),
            "selectors": sequence.selectors(),
            "len": sequence.len(),
            "steps": sequence.steps(),
            "layout": layout,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let catalog = content_for(config);
    println!("{} ({} steps)", describe(selectors), sequence.len());
    println!("{}", "─".repeat(60));

    for (index, step) in sequence.steps().iter().enumerate() {
        let context = progress::step_context(&sequence, index).unwrap_or_default();
        println!(
            "{:>4}  {:<20} {}",
            index + 1,
            format!("{:?}", step.kind()),
            catalog.resolve(step.title_key(), &context)
        );
    }

    println!();
    for group in &layout.groups {
        println!(
            "  {:<10} {} steps {}-{}",
            group.selector_key.as_deref().unwrap_or("-"),
            group.position.map(|p| p.to_string()).unwrap_or_default(),
            group.span.start + 1,
            group.span.end + 1
        );
    }

    Ok(())
}

fn cmd_clear(config: &Config) -> Result<()> {
    let stepper = headless_stepper(config);
    if stepper.gateway().load::<Mystery>().is_none() {
        println!("No saved session");
        return Ok(());
    }
    stepper.gateway().clear();
    println!("Saved session cleared");
    Ok(())
}

fn cmd_history(config: &Config, limit: usize) -> Result<()> {
    let entries = JournalIntegration::history(&config.journal_path())?;
    if entries.is_empty() {
        println!("No completed sessions");
        return Ok(());
    }

    println!("Completed Sessions ({} total)", entries.len());
    println!("{}", "─".repeat(60));

    for entry in entries.iter().rev().take(limit) {
        let record = &entry.record;
        println!(
            "✓ {}  {:<40} {:>4} min{}",
            record.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.selectors.join(", "),
            record.duration_seconds() / 60,
            if record.resumed { " since resume" } else { "" }
        );
    }

    Ok(())
}

fn cmd_schema() -> Result<()> {
    let output = serde_json::json!({
        "config": schemars::schema_for!(Config),
        "snapshot": schemars::schema_for!(PersistedSnapshot<Mystery>),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_init(config: &Config) -> Result<()> {
    let path: PathBuf = Config::local_config_path();
    if path.exists() {
        println!("{} already exists", path.display());
        return Ok(());
    }
    let written = config.save()?;
    println!("Wrote {}", written.display());
    Ok(())
}

fn describe(selectors: &[Mystery]) -> String {
    selectors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_age(age_millis: i64) -> String {
    if age_millis < 0 {
        return "just now".to_string();
    }
    format!("{} ago", format_duration(age_millis))
}

fn format_duration(millis: i64) -> String {
    let minutes = millis / 60_000;
    match (minutes / 60, minutes % 60) {
        (0, 0) => "less than a minute".to_string(),
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} h"),
        (h, m) => format!("{h} h {m} min"),
    }
}
