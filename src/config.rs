//! Runner configuration -- pipeline location, directories, tiers, defaults.
//!
//! Loaded from `oddsrunner.toml` in the project directory when present,
//! otherwise built from defaults. The project directory itself always comes
//! from the CLI, never from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional configuration file inside the project directory.
pub const CONFIG_FILE: &str = "oddsrunner.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the Python pipeline (where manage.py lives). CLI-provided.
    #[serde(skip)]
    pub project_dir: PathBuf,

    /// Data directory, relative to the project dir unless absolute.
    pub data_dir: PathBuf,

    /// Log directory, relative to the project dir unless absolute.
    pub logs_dir: PathBuf,

    /// Dependency manifest for the best-effort pip install.
    pub requirements: PathBuf,

    /// Tag string identifying this runner's schedule entries.
    pub schedule_tag: String,

    pub tiers: Tiers,
    pub backfill: BackfillDefaults,
}

/// Sport keys grouped into backfill tiers, processed in A -> B -> C order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tiers {
    #[serde(rename = "tierA")]
    pub tier_a: Vec<String>,
    #[serde(rename = "tierB")]
    pub tier_b: Vec<String>,
    #[serde(rename = "tierC")]
    pub tier_c: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillDefaults {
    /// How many days back each backfill pass covers.
    pub days: u32,
    /// Hours between historical snapshots (24 = one per day).
    pub interval_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            data_dir: PathBuf::from("data"),
            logs_dir: PathBuf::from("logs"),
            requirements: PathBuf::from("requirements.txt"),
            schedule_tag: "oddsrunner".to_string(),
            tiers: Tiers::default(),
            backfill: BackfillDefaults::default(),
        }
    }
}

impl Default for Tiers {
    fn default() -> Self {
        Self {
            tier_a: vec!["basketball_nba".to_string()],
            tier_b: vec!["americanfootball_nfl".to_string()],
            tier_c: vec!["icehockey_nhl".to_string()],
        }
    }
}

impl Default for BackfillDefaults {
    fn default() -> Self {
        Self {
            days: 30,
            interval_hours: 24,
        }
    }
}

impl Config {
    /// Load the configuration for a project directory.
    pub fn load(project_dir: &Path) -> Result<Config> {
        let file = project_dir.join(CONFIG_FILE);
        let mut cfg = if file.is_file() {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", file.display()))?
        } else {
            Config::default()
        };
        cfg.project_dir = project_dir.to_path_buf();
        Ok(cfg)
    }

    pub fn data_path(&self) -> PathBuf {
        self.project_dir.join(&self.data_dir)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.project_dir.join(&self.logs_dir)
    }

    /// The runner's own run-history database.
    pub fn db_path(&self) -> PathBuf {
        self.data_path().join("oddsrunner.db")
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.project_dir.join(&self.requirements)
    }

    /// Log file for a named task, e.g. `ingest` -> `logs/ingest.log`.
    pub fn log_file(&self, task: &str) -> PathBuf {
        self.logs_path().join(format!("{task}.log"))
    }
}
