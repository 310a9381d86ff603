//! Recurring-schedule generation -- typed entries rendered per platform.
//!
//! A `ScheduleEntry` binds a pipeline task to a trigger and a tag. The tag
//! identifies the runner's entry set inside the host scheduler so installs
//! can replace rather than duplicate.

pub mod crontab;

use crate::config::Config;
use crate::platform::PlatformAdapter;
use crate::tasks::Task;
use anyhow::{Context, Result};
use chrono::{Utc, Weekday};
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("no scheduler facility available: {0}")]
    FacilityUnavailable(String),

    #[error("preview window of {0} hours is out of range")]
    WindowOutOfRange(u64),
}

/// A recurring trigger. Rendered to five-field cron syntax on Unix targets
/// and to `schtasks` directives on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every N minutes (N < 60).
    Every { minutes: u32 },
    /// Once a day at the given time.
    Daily { hour: u8, minute: u8 },
    /// Once a week at the given day and time.
    Weekly { weekday: Weekday, hour: u8, minute: u8 },
}

impl Trigger {
    /// Render as a five-field cron expression (minute hour dom month dow).
    pub fn cron_expr(&self) -> String {
        match self {
            Trigger::Every { minutes } => format!("*/{minutes} * * * *"),
            Trigger::Daily { hour, minute } => format!("{minute} {hour} * * *"),
            Trigger::Weekly {
                weekday,
                hour,
                minute,
            } => format!("{minute} {hour} * * {}", weekday.num_days_from_sunday()),
        }
    }
}

/// One schedulable unit: a task reference, its trigger, and the tag that
/// marks it as owned by this runner.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub task: String,
    pub trigger: Trigger,
    pub tag: String,
}

/// The default out-of-box schedule set for the pipeline.
pub fn defaults(cfg: &Config) -> Vec<ScheduleEntry> {
    let tag = cfg.schedule_tag.clone();
    vec![
        ScheduleEntry {
            task: "ingest".to_string(),
            trigger: Trigger::Every { minutes: 5 },
            tag: tag.clone(),
        },
        ScheduleEntry {
            task: "decision".to_string(),
            trigger: Trigger::Daily {
                hour: 11,
                minute: 0,
            },
            tag: tag.clone(),
        },
        ScheduleEntry {
            task: "features".to_string(),
            trigger: Trigger::Daily { hour: 2, minute: 30 },
            tag: tag.clone(),
        },
        ScheduleEntry {
            task: "backfill".to_string(),
            trigger: Trigger::Weekly {
                weekday: Weekday::Sun,
                hour: 4,
                minute: 0,
            },
            tag,
        },
    ]
}

/// Render the full entry set for a platform without installing it.
pub fn render(
    entries: &[ScheduleEntry],
    tasks: &[Task],
    adapter: &dyn PlatformAdapter,
    cfg: &Config,
) -> Result<String> {
    let mut out = adapter.render_preamble(&cfg.schedule_tag);
    for entry in entries {
        let task = tasks
            .iter()
            .find(|t| t.name == entry.task)
            .with_context(|| format!("Unknown task '{}' in schedule entry", entry.task))?;
        out.push_str(&adapter.render_entry(entry, task, &cfg.project_dir));
        out.push('\n');
    }
    Ok(out)
}

/// Compute upcoming fire times for the entry set within the next `hours`.
/// Strictly a dry-run preview, not an execution loop.
pub fn preview_next_runs(entries: &[ScheduleEntry], hours: u64) -> Result<Vec<(String, String)>> {
    let now = Utc::now();
    let window = i64::try_from(hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .ok_or(ScheduleError::WindowOutOfRange(hours))?;
    let end = now
        .checked_add_signed(window)
        .ok_or(ScheduleError::WindowOutOfRange(hours))?;
    let mut preview = Vec::new();

    for entry in entries {
        // The cron crate wants a seconds field; prepend one.
        let expr = format!("0 {}", entry.trigger.cron_expr());
        let schedule = CronSchedule::from_str(&expr)
            .with_context(|| format!("Invalid cron expression '{expr}'"))?;
        for next_time in schedule.after(&now) {
            if next_time > end {
                break;
            }
            preview.push((next_time.to_rfc3339(), entry.task.clone()));
        }
    }

    preview.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(preview)
}
