//! Tiered backfill orchestration.
//!
//! Modes: `tierA`, `tierB`, `tierC`, `all`, or `sport:<key>`. `all` walks the
//! tiers in order and stops at the first failure; completed results are kept.

use crate::config::{BackfillDefaults, Config, Tiers};
use crate::env::EnvironmentProfile;
use crate::storage::Pool;
use crate::tasks::{invoker, RunResult, Task, TaskKind};
use anyhow::Result;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    A,
    B,
    C,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::A => "tierA",
            Tier::B => "tierB",
            Tier::C => "tierC",
        }
    }

    pub fn sports<'a>(&self, tiers: &'a Tiers) -> &'a [String] {
        match self {
            Tier::A => &tiers.tier_a,
            Tier::B => &tiers.tier_b,
            Tier::C => &tiers.tier_c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Tier(Tier),
    All,
    Sport(String),
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Mode::All);
        }
        if s.eq_ignore_ascii_case("tiera") {
            return Ok(Mode::Tier(Tier::A));
        }
        if s.eq_ignore_ascii_case("tierb") {
            return Ok(Mode::Tier(Tier::B));
        }
        if s.eq_ignore_ascii_case("tierc") {
            return Ok(Mode::Tier(Tier::C));
        }
        if let Some(key) = s.strip_prefix("sport:") {
            if key.is_empty() {
                return Err("empty sport key after 'sport:'".to_string());
            }
            return Ok(Mode::Sport(key.to_string()));
        }
        Err(format!(
            "invalid mode '{s}' (expected tierA|tierB|tierC|all|sport:<key>)"
        ))
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Tier(t) => f.write_str(t.label()),
            Mode::All => f.write_str("all"),
            Mode::Sport(key) => write!(f, "sport:{key}"),
        }
    }
}

/// The sport keys a mode expands to, in execution order.
pub fn sports_for(mode: &Mode, tiers: &Tiers) -> Vec<String> {
    match mode {
        Mode::Tier(t) => t.sports(tiers).to_vec(),
        Mode::All => {
            let mut out = Vec::new();
            for t in [Tier::A, Tier::B, Tier::C] {
                out.extend_from_slice(t.sports(tiers));
            }
            out
        }
        Mode::Sport(key) => vec![key.clone()],
    }
}

/// Argument template for one backfill invocation.
pub fn backfill_args(sport: &str, defaults: &BackfillDefaults) -> Vec<String> {
    vec![
        "--sport".to_string(),
        sport.to_string(),
        "--days".to_string(),
        defaults.days.to_string(),
        "--interval".to_string(),
        defaults.interval_hours.to_string(),
    ]
}

/// Run the backfill sequence for a mode. One invocation per sport key; a
/// failure aborts the remaining sequence.
pub async fn run(
    mode: &Mode,
    cfg: &Config,
    profile: &EnvironmentProfile,
    pool: &Pool,
) -> Result<Vec<RunResult>> {
    let task = Task::for_kind(TaskKind::Backfill, cfg, profile);
    let sports = sports_for(mode, &cfg.tiers);
    info!(%mode, count = sports.len(), "Starting backfill sequence");

    let mut results = Vec::new();
    for sport in sports {
        let args = backfill_args(&sport, &cfg.backfill);
        let result = invoker::invoke(&task, &args, profile, Some(pool)).await?;
        let ok = result.is_success();
        results.push(result);
        if !ok {
            warn!(%sport, "Backfill failed; aborting remaining sequence");
            break;
        }
    }
    Ok(results)
}
