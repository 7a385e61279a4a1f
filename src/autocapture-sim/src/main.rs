//! Autocapture simulator — replays a scripted browser session against the
//! autocapture module and prints every dispatch attempt as a JSON line.

mod scenario;
mod settings;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use crate::scenario::Scenario;
use crate::settings::SimSettings;

#[derive(Parser, Debug)]
#[command(name = "autocapture-sim")]
#[command(about = "Replay a browser session against the autocapture module")]
#[command(version)]
struct Cli {
    /// Scenario file (JSON)
    #[arg(long, short)]
    scenario: PathBuf,

    /// Simulator settings file (overrides defaults)
    #[arg(long, env = "AUTOCAPTURE_SIM__CONFIG")]
    config: Option<PathBuf>,

    /// Log filter (overrides config)
    #[arg(long, env = "AUTOCAPTURE_SIM__LOG_FILTER")]
    log_filter: Option<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Pretty-print dispatch lines instead of one JSON object per line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, load_error) = match SimSettings::load(cli.config.as_deref()) {
        Ok(settings) => (settings, None),
        Err(e) => (SimSettings::default(), Some(e)),
    };
    if let Some(filter) = cli.log_filter {
        settings.log_filter = filter;
    }
    settings.json_logs |= cli.json_logs;
    settings.pretty |= cli.pretty;

    init_tracing(&settings);
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load simulator config, using defaults");
    }

    let raw = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("reading scenario {}", cli.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", cli.scenario.display()))?;

    let run_id = Uuid::new_v4();
    info!(%run_id, scenario = %cli.scenario.display(), url = %scenario.url, "replaying scenario");
    let lines = scenario::run(&scenario, run_id)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in &lines {
        if settings.pretty {
            serde_json::to_writer_pretty(&mut out, line)?;
        } else {
            serde_json::to_writer(&mut out, line)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn init_tracing(settings: &SimSettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.log_filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if settings.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}
