//! Pipeline task definitions and run results.
//!
//! A `Task` is an immutable value: name, program, argument template, and the
//! log file its output is tee'd into. The five pipeline tasks wrap the
//! external Python application's entry points.

pub mod invoker;

use crate::config::Config;
use crate::env::EnvironmentProfile;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::str::FromStr;

/// The pipeline operations this runner knows how to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// `manage.py setup` -- database and schema initialization.
    Setup,
    /// `manage.py scrape` -- live odds ingestion.
    Ingest,
    /// `main.py` -- the daily decision-engine cycle.
    Decision,
    /// `manage.py compute-features` -- feature computation over snapshots.
    Features,
    /// `python -m src.backfill` -- historical odds backfill.
    Backfill,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Setup => "setup",
            TaskKind::Ingest => "ingest",
            TaskKind::Decision => "decision",
            TaskKind::Features => "features",
            TaskKind::Backfill => "backfill",
        }
    }

    pub fn all() -> [TaskKind; 5] {
        [
            TaskKind::Setup,
            TaskKind::Ingest,
            TaskKind::Decision,
            TaskKind::Features,
            TaskKind::Backfill,
        ]
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An invokable task. Immutable once built.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub log_file: PathBuf,
}

impl Task {
    /// Build the task definition for the given pipeline operation.
    pub fn for_kind(kind: TaskKind, cfg: &Config, profile: &EnvironmentProfile) -> Task {
        let args: Vec<String> = match kind {
            TaskKind::Setup => vec!["manage.py".into(), "setup".into()],
            TaskKind::Ingest => vec!["manage.py".into(), "scrape".into()],
            TaskKind::Decision => vec!["main.py".into()],
            TaskKind::Features => vec!["manage.py".into(), "compute-features".into()],
            TaskKind::Backfill => vec!["-m".into(), "src.backfill".into()],
        };
        Task {
            name: kind.name(),
            program: profile.python.clone(),
            args,
            log_file: cfg.log_file(kind.name()),
        }
    }

    /// All five pipeline tasks, for schedule rendering.
    pub fn registry(cfg: &Config, profile: &EnvironmentProfile) -> Vec<Task> {
        TaskKind::all()
            .into_iter()
            .map(|k| Task::for_kind(k, cfg, profile))
            .collect()
    }

    /// `program arg1 arg2 ...` as a single line, for schedulers and logs.
    pub fn command_string(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RunStatus {
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// The recorded outcome of one task invocation. Append-only: written to the
/// run-history store before the invoking process exits, pass or fail.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunResult {
    pub id: uuid::Uuid,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    pub log_excerpt: String,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}
