//! binday: recurring collection schedules
//!
//! Subcommands:
//! - `next`: print each schedule's next collection date
//! - `check`: validate a configuration file
//! - `daemon`: keep schedules refreshed until interrupted

use std::path::{Path, PathBuf};

use binday_scheduler::Registry;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod daemon;
mod display;

use config::AppConfig;
use display::SensorView;

#[derive(Parser)]
#[command(name = "binday")]
#[command(about = "Recurring collection schedules", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true, env = "BINDAY_CONFIG", default_value = "binday.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the next collection date of every schedule
    Next {
        /// Date to compute from (YYYY-MM-DD), defaults to the local date
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Only show this schedule
        #[arg(long)]
        name: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    Check,

    /// Run the refresh loop until Ctrl-C
    Daemon {
        /// Seconds between refresh ticks (overrides the config file)
        #[arg(long)]
        tick_interval: Option<u64>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, binday_scheduler::calendar::DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "binday=info,binday_scheduler=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Next { today, name, json } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            run_next(&cli.config, today, name.as_deref(), json)
        }
        Commands::Check => run_check(&cli.config),
        Commands::Daemon { tick_interval } => {
            let config = load(&cli.config)?;
            let tick = config.tick_interval(tick_interval);
            daemon::run(config, tick).await
        }
    }
}

fn load(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path).map_err(|e| miette::miette!("{}", e))
}

fn run_next(path: &Path, today: NaiveDate, name: Option<&str>, json: bool) -> Result<()> {
    let config = load(path)?;
    let mut registry = Registry::from_definitions(&config.definitions())
        .map_err(|e| miette::miette!("invalid schedules: {}", e))?;
    registry.refresh_all(today);

    if let Some(name) = name
        && registry.snapshot(name).is_none()
    {
        return Err(miette::miette!("no enabled schedule named '{}'", name));
    }

    let views: Vec<SensorView> = registry
        .snapshots()
        .iter()
        .filter(|snapshot| name.is_none_or(|n| n == snapshot.name))
        .filter_map(|snapshot| {
            config
                .sensor(&snapshot.name)
                .map(|sensor| SensorView::new(snapshot, sensor))
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&views)
            .map_err(|e| miette::miette!("failed to serialize: {}", e))?;
        println!("{}", out);
    } else {
        for view in &views {
            println!("{}", view.line());
        }
    }
    Ok(())
}

fn run_check(path: &Path) -> Result<()> {
    let config = load(path)?;
    let registry = Registry::from_definitions(&config.definitions())
        .map_err(|e| miette::miette!("invalid schedules: {}", e))?;

    let problems = registry.problems();
    for (name, problem) in &problems {
        println!("{}: {}", name, problem);
    }
    if !problems.is_empty() {
        return Err(miette::miette!(
            "{} of {} schedules are invalid",
            problems.len(),
            registry.len()
        ));
    }

    println!(
        "{} schedules ok, refresh order: {}",
        registry.len(),
        registry.refresh_order().join(", ")
    );
    Ok(())
}
