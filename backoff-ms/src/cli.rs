use crate::backoff::{compute_backoff, compute_backoff_with, BackoffConfig};
use crate::config::{Overrides, Settings};
use crate::output::{emit_data, number_value, OutputFormat};
use crate::random::{FixedRandom, RngSource};
use crate::util::{format_millis, parse_millis};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Upper bound on generated schedule rows.
pub const MAX_SCHEDULE_ROWS: u32 = 1_000;

#[derive(Parser, Debug)]
#[command(
    name = "backoff-ms",
    about = "Exponential backoff delay calculator",
    version,
    disable_help_subcommand = true,
    after_help = r#"Examples:
  backoff-ms compute --attempt 3
  backoff-ms --base-time 250ms --max-time 30s schedule
  backoff-ms --raw compute --attempt 2 --seed 7
  BACKOFF_MAX_ATTEMPTS=5 backoff-ms config show
  backoff-ms config set max_time 1h"#
)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// JSON output
    #[arg(long, global = true)]
    pub json: bool,
    /// Raw output (bare value)
    #[arg(long, global = true)]
    pub raw: bool,
    /// Settings file (defaults to $BACKOFF_MS_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Delay before the first retry (e.g. 1000, 250ms, 1.5s)
    #[arg(long = "base-time", global = true, value_parser = parse_millis, allow_hyphen_values = true)]
    pub base_time: Option<f64>,
    /// Upper bound on any delay (e.g. 30s, 24h)
    #[arg(long = "max-time", global = true, value_parser = parse_millis, allow_hyphen_values = true)]
    pub max_time: Option<f64>,
    /// Attempt index past which the delay saturates at --max-time
    #[arg(long = "max-attempts", global = true, allow_negative_numbers = true)]
    pub max_attempts: Option<f64>,
    /// Fraction of the raw delay added as jitter
    #[arg(long = "randomization-factor", global = true, allow_negative_numbers = true)]
    pub randomization_factor: Option<f64>,
    /// Verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,
    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,
    /// Color control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the delay before one retry
    Compute {
        /// 0-based attempt index
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        attempt: f64,
        /// Seed the jitter draw for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Reject non-finite, negative or out-of-range parameters
        #[arg(long)]
        strict: bool,
    },
    /// Show the delay bounds for each attempt
    Schedule {
        /// Last attempt to show (defaults to max attempts + 1)
        #[arg(long)]
        through: Option<u32>,
        #[arg(long)]
        strict: bool,
    },
    Config(ConfigCmd),
}

#[derive(Args, Debug)]
pub struct ConfigCmd {
    #[command(subcommand)]
    sub: ConfigSub,
}
#[derive(Subcommand, Debug)]
pub enum ConfigSub {
    Path,
    Show,
    Get { key: String },
    Set { key: String, value: String },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_time_ms: self.base_time,
            max_time_ms: self.max_time,
            max_attempts: self.max_attempts,
            randomization_factor: self.randomization_factor,
        }
    }

    pub fn format(&self) -> OutputFormat {
        if self.raw {
            OutputFormat::Raw
        } else if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Yaml
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Compute { attempt, seed, strict } => {
            let settings = resolve_settings(&cli)?;
            run_compute(&cli, &settings, *attempt, *seed, *strict)
        }
        Commands::Schedule { through, strict } => {
            let settings = resolve_settings(&cli)?;
            run_schedule(&cli, &settings, *through, *strict)
        }
        Commands::Config(cmd) => run_config(&cli, cmd),
    }
}

/// Defaults, then the settings file, then environment, then flags.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("load config")?;
    settings.apply_env()?;
    settings.apply_overrides(&cli.overrides());
    debug!(?settings, "resolved settings");
    Ok(settings)
}

fn run_compute(cli: &Cli, settings: &Settings, attempt: f64, seed: Option<u64>, strict: bool) -> Result<()> {
    let cfg = settings.backoff(attempt);
    if strict {
        cfg.validate().context("invalid backoff configuration")?;
    }
    let delay = match seed {
        Some(seed) => compute_backoff_with(&cfg, &mut RngSource(StdRng::seed_from_u64(seed))),
        None => compute_backoff(&cfg),
    };
    info!(attempt, delay_ms = delay, "computed delay");
    let fmt = cli.format();
    if fmt == OutputFormat::Raw {
        emit_data(&fmt, &number_value(delay))
    } else {
        emit_data(&fmt, &compute_payload(&cfg, delay))
    }
}

pub fn compute_payload(cfg: &BackoffConfig, delay_ms: f64) -> JsonValue {
    json!({
        "attempt": number_value(cfg.attempt),
        "delay_ms": number_value(delay_ms),
        "delay": format_millis(delay_ms),
    })
}

fn run_schedule(cli: &Cli, settings: &Settings, through: Option<u32>, strict: bool) -> Result<()> {
    if strict {
        settings.backoff(1.0).validate().context("invalid backoff configuration")?;
    }
    let through = match through {
        Some(n) => {
            if n > MAX_SCHEDULE_ROWS {
                warn!(requested = n, max = MAX_SCHEDULE_ROWS, "schedule truncated");
            }
            n.min(MAX_SCHEDULE_ROWS)
        }
        None => default_through(settings.max_attempts),
    };
    emit_data(&cli.format(), &build_schedule(settings, through))
}

/// `max_attempts + 1` so the first saturated attempt is visible.
pub fn default_through(max_attempts: f64) -> u32 {
    if max_attempts.is_nan() || max_attempts < 0.0 {
        return 1;
    }
    if max_attempts >= MAX_SCHEDULE_ROWS as f64 {
        warn!(max_attempts, max = MAX_SCHEDULE_ROWS, "schedule truncated");
        return MAX_SCHEDULE_ROWS;
    }
    max_attempts.floor() as u32 + 1
}

/// Jitter-free lower bound and jitter ceiling for attempts `1..=through`.
pub fn build_schedule(settings: &Settings, through: u32) -> JsonValue {
    let mut rows = Vec::with_capacity(through as usize);
    let (mut total_min, mut total_max) = (0.0, 0.0);
    for attempt in 1..=through {
        let cfg = settings.backoff(attempt as f64);
        let min = compute_backoff_with(&cfg, &mut FixedRandom(0.0));
        let max = compute_backoff_with(&cfg, &mut FixedRandom(1.0));
        total_min += min;
        total_max += max;
        rows.push(json!({
            "attempt": attempt,
            "min_ms": number_value(min),
            "max_ms": number_value(max),
            "min": format_millis(min),
            "max": format_millis(max),
            "saturated": cfg.attempt > cfg.max_attempts,
        }));
    }
    json!({
        "attempts": rows,
        "total_min_ms": number_value(total_min),
        "total_max_ms": number_value(total_max),
    })
}

fn run_config(cli: &Cli, cmd: &ConfigCmd) -> Result<()> {
    match &cmd.sub {
        ConfigSub::Path => {
            let path = match &cli.config {
                Some(p) => p.clone(),
                None => Settings::config_path()?,
            };
            emit_data(&OutputFormat::Raw, &JsonValue::String(path.display().to_string()))
        }
        ConfigSub::Show => {
            let settings = resolve_settings(cli)?;
            emit_data(&cli.format(), &settings_payload(&settings))
        }
        ConfigSub::Get { key } => {
            let settings = resolve_settings(cli)?;
            let value = settings.get(key)?;
            emit_data(&OutputFormat::Raw, &number_value(value))
        }
        ConfigSub::Set { key, value } => {
            // Only the file layer is persisted; env and flag overrides stay transient.
            let mut settings = Settings::load(cli.config.as_deref()).context("load config")?;
            settings.set(key, value)?;
            settings.save()?;
            let stored = number_value(settings.get(key)?);
            emit_data(&cli.format(), &json!({"status": "ok", "key": key, "value": stored}))
        }
    }
}

pub fn settings_payload(settings: &Settings) -> JsonValue {
    let path = settings.path().map(|p| p.display().to_string()).ok();
    json!({
        "base_time_ms": number_value(settings.base_time_ms),
        "max_time_ms": number_value(settings.max_time_ms),
        "max_attempts": number_value(settings.max_attempts),
        "randomization_factor": number_value(settings.randomization_factor),
        "path": path,
    })
}
