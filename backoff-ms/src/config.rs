use crate::backoff::{
    BackoffConfig, DEFAULT_BASE_TIME_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_TIME_MS,
    DEFAULT_RANDOMIZATION_FACTOR,
};
use crate::util::parse_millis;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV: &str = "BACKOFF_MS_CONFIG";
pub const BASE_TIME_ENV: &str = "BACKOFF_BASE_TIME";
pub const MAX_TIME_ENV: &str = "BACKOFF_MAX_TIME";
pub const MAX_ATTEMPTS_ENV: &str = "BACKOFF_MAX_ATTEMPTS";
pub const RANDOMIZATION_FACTOR_ENV: &str = "BACKOFF_RANDOMIZATION_FACTOR";

pub const KEYS: [&str; 4] = ["base_time", "max_time", "max_attempts", "randomization_factor"];

/// Tuning parameters shared by every computation. Attempt counters never
/// live here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "baseTimeMs")]
    pub base_time_ms: f64,
    #[serde(alias = "maxTimeMs")]
    pub max_time_ms: f64,
    #[serde(alias = "maxAttempts")]
    pub max_attempts: f64,
    #[serde(alias = "randomizationFactor")]
    pub randomization_factor: f64,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_time_ms: DEFAULT_BASE_TIME_MS,
            max_time_ms: DEFAULT_MAX_TIME_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            path: None,
        }
    }
}

/// Flag values that override every other layer.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub base_time_ms: Option<f64>,
    pub max_time_ms: Option<f64>,
    pub max_attempts: Option<f64>,
    pub randomization_factor: Option<f64>,
}

impl Settings {
    /// Reads the settings file at `path`, or the default location when
    /// `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        let mut settings = if path.exists() {
            let data = fs::read_to_string(&path).context("read config file")?;
            if data.trim().is_empty() {
                Settings::default()
            } else {
                serde_yaml::from_str(&data).context("parse config yaml")?
            }
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Settings::default()
        };
        settings.path = Some(path);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        let path = self.path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("create config dir")?;
        }
        let data = serde_yaml::to_string(&self).context("serialize config")?;
        let mut f = fs::File::create(&path).context("create config file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = f.metadata()?.permissions();
            perms.set_mode(0o600);
            f.set_permissions(perms)?;
        }
        f.write_all(data.as_bytes()).context("write config file")?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(p) => Ok(p.clone()),
            None => Self::config_path(),
        }
    }

    /// `$BACKOFF_MS_CONFIG` if set, else the platform config dir.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            if !p.is_empty() {
                return Ok(PathBuf::from(p));
            }
        }
        let proj = ProjectDirs::from("", "", "backoff-ms").context("resolve config dir")?;
        Ok(proj.config_dir().join("config.yaml"))
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_value(BASE_TIME_ENV) {
            self.base_time_ms = parse_millis(&v).with_context(|| format!("invalid {BASE_TIME_ENV}"))?;
        }
        if let Some(v) = env_value(MAX_TIME_ENV) {
            self.max_time_ms = parse_millis(&v).with_context(|| format!("invalid {MAX_TIME_ENV}"))?;
        }
        if let Some(v) = env_value(MAX_ATTEMPTS_ENV) {
            self.max_attempts = v.trim().parse().with_context(|| format!("invalid {MAX_ATTEMPTS_ENV}"))?;
        }
        if let Some(v) = env_value(RANDOMIZATION_FACTOR_ENV) {
            self.randomization_factor = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {RANDOMIZATION_FACTOR_ENV}"))?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, o: &Overrides) {
        if let Some(v) = o.base_time_ms {
            self.base_time_ms = v;
        }
        if let Some(v) = o.max_time_ms {
            self.max_time_ms = v;
        }
        if let Some(v) = o.max_attempts {
            self.max_attempts = v;
        }
        if let Some(v) = o.randomization_factor {
            self.randomization_factor = v;
        }
    }

    /// Calculator input for `attempt` using these settings.
    pub fn backoff(&self, attempt: f64) -> BackoffConfig {
        BackoffConfig {
            attempt,
            base_time_ms: self.base_time_ms,
            max_time_ms: self.max_time_ms,
            max_attempts: self.max_attempts,
            randomization_factor: self.randomization_factor,
        }
    }

    pub fn get(&self, key: &str) -> Result<f64> {
        Ok(match key {
            "base_time" => self.base_time_ms,
            "max_time" => self.max_time_ms,
            "max_attempts" => self.max_attempts,
            "randomization_factor" => self.randomization_factor,
            _ => bail!("unsupported key '{key}' (expected one of: {})", KEYS.join(", ")),
        })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "base_time" => self.base_time_ms = parse_millis(value)?,
            "max_time" => self.max_time_ms = parse_millis(value)?,
            "max_attempts" => {
                self.max_attempts = value.trim().parse().context("max_attempts must be a number")?
            }
            "randomization_factor" => {
                self.randomization_factor = value
                    .trim()
                    .parse()
                    .context("randomization_factor must be a number")?
            }
            _ => bail!("unsupported key '{key}' (expected one of: {})", KEYS.join(", ")),
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
