use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use wordbomb::config::{self, AppConfig, SelectionMode};
use wordbomb::dictionary::Dictionary;
use wordbomb::planner::RoundPlanner;
use wordbomb::playback::util::sleep_while_running;
use wordbomb::positions::{self, Positions};
use wordbomb::selector::UsageState;
use wordbomb::session::{Bot, Collaborators, RoundReport, SessionState};
use wordbomb::sim;
use wordbomb::trace::{plan_console_trace, print_trace_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Long,
    Short,
    Any,
    Alphabet,
}

impl ModeArg {
    fn to_library(self) -> SelectionMode {
        match self {
            ModeArg::Long => SelectionMode::Long,
            ModeArg::Short => SelectionMode::Short,
            ModeArg::Any => SelectionMode::Any,
            ModeArg::Alphabet => SelectionMode::Alphabet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
}

impl PlaybackBackendArg {
    fn to_library(self) -> wordbomb::playback::PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => wordbomb::playback::PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => wordbomb::playback::PlaybackBackend::X11,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "wordbomb")]
#[command(about = "Word-bomb game assistant: finds a word for the round's letters and types it like a person", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play rounds against the game window until Ctrl+C
    Run {
        /// Configuration file (JSON)
        #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Learned screen positions (JSON)
        #[arg(long, value_name = "PATH", default_value = positions::DEFAULT_POSITIONS_PATH)]
        positions: PathBuf,

        /// Override the configured selection mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Playback backend.
        ///
        /// - auto: choose a backend based on the runtime environment
        /// - x11: force X11 (XTEST + CLIPBOARD)
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Countdown seconds before the first round
        #[arg(long, default_value_t = 3)]
        countdown: u64,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Disable console plan trace output
        #[arg(long)]
        no_trace: bool,
    },

    /// Plan a single round offline and print it (JSON)
    Plan {
        /// The round's letters
        #[arg(long)]
        fragment: String,

        /// Configuration file (JSON)
        #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Word list to use instead of the configured one
        #[arg(long, value_name = "PATH")]
        dictionary: Option<PathBuf>,

        /// Override the configured selection mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Run rounds against in-memory collaborators and print the session summary
    Simulate {
        /// Fragments to play, in order (repeated to fill `--rounds`)
        #[arg(long, value_delimiter = ',', required = true)]
        fragments: Vec<String>,

        /// Number of rounds
        #[arg(long, default_value_t = 10)]
        rounds: usize,

        /// Configuration file (JSON)
        #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Word list to use instead of the configured one
        #[arg(long, value_name = "PATH")]
        dictionary: Option<PathBuf>,

        /// Override the configured selection mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Print plan trace lines for every round
        #[arg(long)]
        trace: bool,
    },

    /// Write default configuration and positions files
    InitConfig {
        #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[arg(long, value_name = "PATH", default_value = positions::DEFAULT_POSITIONS_PATH)]
        positions: PathBuf,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn load_config(path: &Path, mode: Option<ModeArg>, dictionary: Option<PathBuf>) -> AppConfig {
    apply_overrides(config::load(path), mode, dictionary)
}

fn apply_overrides(
    mut cfg: AppConfig,
    mode: Option<ModeArg>,
    dictionary: Option<PathBuf>,
) -> AppConfig {
    if let Some(mode) = mode {
        cfg.mode = mode.to_library();
    }
    if let Some(dictionary) = dictionary {
        cfg.dictionary_path = dictionary;
    }
    cfg
}

fn load_dictionary(cfg: &AppConfig) -> Result<Dictionary> {
    let mut dictionary = Dictionary::new();
    dictionary.load(&cfg.dictionary_path)?;
    dictionary.load_blacklist(&cfg.blacklist_path)?;
    tracing::info!(
        words = dictionary.len(),
        blacklisted = dictionary.blacklist_len(),
        "dictionary loaded"
    );
    Ok(dictionary)
}

fn run(
    config_path: &Path,
    positions_path: &Path,
    mode: Option<ModeArg>,
    backend: PlaybackBackendArg,
    countdown: u64,
    seed: Option<u64>,
    no_trace: bool,
) -> Result<()> {
    // The log file location lives in the config, so a parse failure can only be reported
    // once the subscriber is installed.
    let (cfg, config_err) = config::load_or_default(config_path);
    let cfg = apply_overrides(cfg, mode, None);
    wordbomb::logging::init(cfg.save_log.then_some(cfg.log_path.as_path()));
    if let Some(err) = config_err {
        config::report_fallback(&err);
    }
    let positions = positions::load(positions_path);

    let state = Arc::new(SessionState::new(cfg.clone()));
    if let Err(err) = state.reload_dictionary() {
        tracing::error!("{err}; not starting");
        return Ok(());
    }

    // Fail fast on unsupported environments/backends.
    let backend = wordbomb::playback::resolve_backend(backend.to_library())?;
    let io = wordbomb::playback::connect_collaborators(backend, &cfg, &positions)?;

    state.start();
    let handler_state = Arc::clone(&state);
    ctrlc::set_handler(move || {
        tracing::info!("stop requested");
        handler_state.stop();
    })
    .context("failed to install Ctrl+C handler")?;

    if countdown > 0 {
        eprintln!("Starting in {countdown}s; focus the game window. Ctrl+C stops.");
        sleep_while_running(|| state.is_running(), countdown * 1000);
    }
    if !state.is_running() {
        return Ok(());
    }

    let worker = Bot::new(Arc::clone(&state), io, positions, rng_from_seed(seed))
        .with_trace(!no_trace)
        .spawn()?;

    worker
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))??;

    let stats = state.stats();
    eprintln!(
        "Stopped after {} rounds: {} submissions, {} turn losses, {} fallbacks",
        stats.rounds, stats.submissions, stats.turn_losses, stats.fallbacks
    );
    Ok(())
}

fn plan(
    fragment: &str,
    cfg: &AppConfig,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let dictionary = load_dictionary(cfg)?;
    let usage = UsageState::new(cfg.repeat_cooldown);
    let mut rng = rng_from_seed(seed);

    let plan = RoundPlanner::from_config(cfg).plan_round(
        &dictionary,
        &usage,
        cfg.mode,
        fragment,
        cfg.humanize.numbers_allowed(cfg.humanize.number_rounds),
        &mut rng,
    );

    for event in plan_console_trace(&plan) {
        print_trace_line(&event.line);
    }

    let stats = sim::stats(&plan);
    eprintln!(
        "Planned: {} steps, {} submissions, {} chars, ~{:.2}s",
        stats.steps, stats.submissions, stats.typed_chars, stats.estimated_s
    );

    let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
    match output {
        Some(out) => write_output(out, &json),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn simulate(
    fragments: &[String],
    rounds: usize,
    cfg: AppConfig,
    seed: Option<u64>,
    trace: bool,
) -> Result<()> {
    let state = Arc::new(SessionState::new(cfg));
    state.install_dictionary(load_dictionary(&state.config())?);

    let chat = sim::SimChat::new();
    let io = Collaborators {
        turns: Box::new(sim::ScriptedTurns::always()),
        capture: Box::new(sim::ScriptedFragments::cycle(fragments, rounds)),
        injector: Box::new(chat.clone()),
        sleeper: Box::new(sim::RecordingSleeper::new()),
    };

    let mut bot = Bot::new(Arc::clone(&state), io, Positions::default(), rng_from_seed(seed))
        .with_trace(trace);

    for report in bot.run_rounds(rounds) {
        if let RoundReport::Failed(err) = report {
            eprintln!("round failed: {err}");
        }
    }

    let summary = serde_json::json!({
        "stats": state.stats(),
        "history": state.history(),
        "chat": chat.submitted(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
    );
    Ok(())
}

fn init_config(config_path: &Path, positions_path: &Path, force: bool) -> Result<()> {
    for path in [config_path, positions_path] {
        if path.exists() && !force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ));
        }
    }

    config::save(config_path, &AppConfig::default())?;
    positions::save(positions_path, &Positions::default())?;
    eprintln!(
        "Wrote {} and {}",
        config_path.display(),
        positions_path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            positions,
            mode,
            backend,
            countdown,
            seed,
            no_trace,
        } => run(&config, &positions, mode, backend, countdown, seed, no_trace)?,
        Command::Plan {
            fragment,
            config,
            dictionary,
            mode,
            seed,
            output,
        } => {
            wordbomb::logging::init(None);
            let cfg = load_config(&config, mode, dictionary);
            plan(&fragment, &cfg, seed, output.as_deref())?;
        }
        Command::Simulate {
            fragments,
            rounds,
            config,
            dictionary,
            mode,
            seed,
            trace,
        } => {
            wordbomb::logging::init(None);
            let cfg = load_config(&config, mode, dictionary);
            simulate(&fragments, rounds, cfg, seed, trace)?;
        }
        Command::InitConfig {
            config,
            positions,
            force,
        } => init_config(&config, &positions, force)?,
    }

    Ok(())
}
