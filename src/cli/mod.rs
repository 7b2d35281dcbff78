//! Command-line interface for eventlens.
//!
//! Provides commands for scoring text, browsing and loading the precomputed
//! library, showing the annotated text and printing the plotted series.
//! The session is persisted between invocations.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::ModelServerClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{LocalStorage, SessionStore, SubmitOutcome};
use crate::domain::ScorePolicy;
use crate::layout::to_markup;
use crate::smoothing::SmoothingStrategy;

/// Width of the text column in `plot` output
const PLOT_TEXT_WIDTH: usize = 48;

/// eventlens - Narrative-event annotation viewer
#[derive(Parser, Debug)]
#[command(name = "eventlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a text with the model server
    Submit {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Read input from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// List or search the precomputed library
    Library {
        /// Filter by title, author or release year
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of books to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Load a precomputed prediction by book id
    Load {
        /// Book id from `library`
        id: String,
    },

    /// Show the annotated text
    Show {
        /// Only show this paragraph (0-based)
        #[arg(short, long)]
        paragraph: Option<usize>,
    },

    /// Print event scores and the smoothed curve
    Plot {
        /// Smoothing window size (saved for later runs)
        #[arg(short, long)]
        window: Option<usize>,

        /// Smoothing strategy (saved for later runs)
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Score source (saved for later runs)
        #[arg(short, long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Jump to the paragraph of plot point N
    Focus {
        /// Plot point (event index)
        point: usize,
    },

    /// Show or change per-kind score weights
    Weights {
        /// KIND=SCORE, score in 0..=20 (repeatable)
        #[arg(long = "set", value_name = "KIND=SCORE")]
        set: Vec<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Smoothing strategy for CLI (maps to SmoothingStrategy)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Plain moving average
    MovingAverage,

    /// Centre-weighted Gaussian average
    Gaussian,
}

impl From<StrategyArg> for SmoothingStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::MovingAverage => SmoothingStrategy::MovingAverage,
            StrategyArg::Gaussian => SmoothingStrategy::Gaussian,
        }
    }
}

/// Score policy for CLI (maps to ScorePolicy)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Per-kind weights
    KindWeight,

    /// Model confidence
    ModelConfidence,
}

impl From<PolicyArg> for ScorePolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::KindWeight => ScorePolicy::KindWeight,
            PolicyArg::ModelConfidence => ScorePolicy::ModelConfidence,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Submit { input, stdin } => submit(input, stdin).await,
            Commands::Library { search, limit } => list_library(search, limit).await,
            Commands::Load { id } => load_precomputed(&id).await,
            Commands::Show { paragraph } => show(paragraph),
            Commands::Plot {
                window,
                strategy,
                policy,
            } => plot(window, strategy, policy),
            Commands::Focus { point } => focus(point),
            Commands::Weights { set } => weights(set),
            Commands::Config => show_config(),
        }
    }
}

/// Build the session store from config and restore the saved session
fn open_session(config: &ResolvedConfig) -> Result<SessionStore> {
    let client = ModelServerClient::with_timeout(config.server_url.clone(), config.timeout)
        .context("Failed to build model server client")?;
    let store = SessionStore::from_config(Arc::new(client), config)
        .with_storage(LocalStorage::from_config()?);
    store.restore().context("Failed to restore saved session")?;
    Ok(store)
}

/// Score the input text
async fn submit(input_file: Option<PathBuf>, use_stdin: bool) -> Result<()> {
    let text = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if use_stdin || !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    if text.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }

    let store = open_session(config::config()?)?;
    let outcome = store.submit(text).await;
    report_outcome(&store, outcome)
}

/// Load a precomputed prediction
async fn load_precomputed(id: &str) -> Result<()> {
    let store = open_session(config::config()?)?;
    let outcome = store.load_precomputed(id).await;
    report_outcome(&store, outcome)
}

fn report_outcome(store: &SessionStore, outcome: SubmitOutcome) -> Result<()> {
    match outcome {
        SubmitOutcome::Applied { events } => {
            let layout = store.layout();
            eprintln!(
                "[{} events over {} paragraphs]",
                events,
                layout.paragraph_count()
            );
            Ok(())
        }
        SubmitOutcome::Superseded => {
            eprintln!("[Response ignored: superseded by a newer request]");
            Ok(())
        }
        SubmitOutcome::Failed { message } => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    }
}

/// List the precomputed library
async fn list_library(search: Option<String>, limit: usize) -> Result<()> {
    let store = open_session(config::config()?)?;
    let catalog = match store.library().await {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let books = match search.as_deref() {
        Some(query) => catalog.search(query),
        None => catalog.sorted_by_title(),
    };

    if books.is_empty() {
        println!("No books found");
        return Ok(());
    }

    println!("{:<16} {:<40} {:<28} {:<6}", "ID", "TITLE", "AUTHOR", "YEAR");
    println!("{}", "-".repeat(93));

    for book in books.into_iter().take(limit) {
        println!(
            "{:<16} {:<40} {:<28} {:<6}",
            book.id,
            truncate(&book.title, 40),
            truncate(&book.author, 28),
            book.release_year_label()
        );
    }

    Ok(())
}

/// Print the annotated text
fn show(paragraph: Option<usize>) -> Result<()> {
    let store = open_session(config::config()?)?;
    let snapshot = store.snapshot();
    let layout = snapshot.layout();

    if snapshot.text.is_empty() {
        println!("No text loaded. Use `eventlens submit` or `eventlens load`.");
        return Ok(());
    }

    let range = match paragraph {
        Some(k) if k < layout.paragraph_count() => k..k + 1,
        Some(k) => anyhow::bail!(
            "Paragraph {} out of range (0..{})",
            k,
            layout.paragraph_count()
        ),
        None => 0..layout.paragraph_count(),
    };

    for k in range {
        println!("{}", to_markup(&layout.render(k), snapshot.ui.active_event));
        println!();
    }

    Ok(())
}

/// Print the plotted series
fn plot(
    window: Option<usize>,
    strategy: Option<StrategyArg>,
    policy: Option<PolicyArg>,
) -> Result<()> {
    let store = open_session(config::config()?)?;
    if let Some(window) = window {
        store.set_window_size(window);
    }
    if let Some(strategy) = strategy {
        store.set_strategy(strategy.into());
    }
    if let Some(policy) = policy {
        store.set_score_policy(policy.into());
    }

    let snapshot = store.snapshot();
    if snapshot.events.is_empty() {
        println!("No events");
        return Ok(());
    }

    let xs = snapshot.x_values();
    let ys = snapshot.y_values();
    let smoothed = snapshot.smoothed_values();
    let texts = snapshot.display_texts();

    println!(
        "window={} strategy={} policy={:?}",
        snapshot.smoothing.window_size, snapshot.smoothing.strategy, snapshot.policy
    );
    println!(
        "{:<6} {:<16} {:>8} {:>9}  {}",
        "POINT", "KIND", "SCORE", "SMOOTHED", "TEXT"
    );
    println!("{}", "-".repeat(50 + PLOT_TEXT_WIDTH));

    for (i, x) in xs.iter().enumerate() {
        println!(
            "{:<6} {:<16} {:>8.2} {:>9.3}  {}",
            x,
            snapshot.events[i].kind,
            ys[i],
            smoothed[i],
            truncate(&texts[i].replace('\n', " "), PLOT_TEXT_WIDTH)
        );
    }

    Ok(())
}

/// Focus a plot point and print its paragraph
fn focus(point: usize) -> Result<()> {
    let store = open_session(config::config()?)?;
    if store.focus_point(point).is_none() {
        anyhow::bail!("Plot point {} has no event", point);
    }

    let Some((id, paragraph)) = store.take_scroll_request() else {
        anyhow::bail!("Plot point {} could not be located", point);
    };

    let snapshot = store.snapshot();
    let layout = snapshot.layout();
    if let Some(event) = snapshot.event(id) {
        eprintln!(
            "[Event {} {} ({}) in paragraph {}]",
            id,
            event.anchor(),
            event.kind,
            paragraph
        );
    }
    println!("{}", to_markup(&layout.render(paragraph), Some(id)));

    Ok(())
}

/// Show or change kind weights
fn weights(assignments: Vec<String>) -> Result<()> {
    let store = open_session(config::config()?)?;

    for assignment in &assignments {
        let (name, score) = assignment
            .split_once('=')
            .with_context(|| format!("Expected KIND=SCORE, got '{}'", assignment))?;
        let score: i64 = score
            .trim()
            .parse()
            .with_context(|| format!("Invalid score in '{}'", assignment))?;
        store.set_kind_score(name.trim(), score)?;
    }

    let snapshot = store.snapshot();
    println!("{:<18} {:>5}", "KIND", "SCORE");
    println!("{}", "-".repeat(24));
    for config in snapshot.weights.configs() {
        println!("{:<18} {:>5}", config.name, config.score);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("eventlens configuration");
    println!("=======================");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none, using defaults)".to_string())
    );
    println!("Home:        {}", config.home.display());
    println!("Session:     {}", config.session_path().display());
    println!("Server:      {}", config.server_url);
    println!("Timeout:     {}s", config.timeout.as_secs());
    println!(
        "Smoothing:   window={} strategy={}",
        config.smoothing.window_size, config.smoothing.strategy
    );
    println!("Policy:      {:?}", config.policy);
    println!("Weights:");
    for kind in config.weights.configs() {
        println!("  {:<16} {}", kind.name, kind.score);
    }

    println!();
    println!("Environment overrides:");
    if let Ok(v) = std::env::var("EVENTLENS_HOME") {
        println!("  EVENTLENS_HOME={}", v);
    }
    if let Ok(v) = std::env::var("EVENTLENS_SERVER") {
        println!("  EVENTLENS_SERVER={}", v);
    }

    Ok(())
}

/// Truncate to `max` chars with an ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
