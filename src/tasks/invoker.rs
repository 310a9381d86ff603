//! Task invoker -- spawn, stream output through the log sink, classify.
//!
//! Exit code 0 maps to Success, anything else to Failed with the observed
//! code preserved. A failed task is a normal return value, not an error;
//! whether it aborts a larger sequence is the caller's policy. The run
//! result is durably recorded (log line plus run-history row) before this
//! function returns.

use super::{RunResult, RunStatus, Task};
use crate::env::EnvironmentProfile;
use crate::logsink::LogSink;
use crate::storage::{self, Pool};
use anyhow::{Context, Result};
use chrono::Utc;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info};

async fn drain<R>(reader: R, sink: Arc<Mutex<LogSink>>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        sink.lock().await.record(&line)?;
    }
    Ok(())
}

/// Invoke a task with extra arguments appended to its template.
pub async fn invoke(
    task: &Task,
    extra_args: &[String],
    profile: &EnvironmentProfile,
    pool: Option<&Pool>,
) -> Result<RunResult> {
    let id = uuid::Uuid::new_v4();
    let started_at = Utc::now();

    let mut sink = LogSink::open(&task.log_file)?;
    let mut display = task.command_string();
    for arg in extra_args {
        display.push(' ');
        display.push_str(arg);
    }
    sink.record(&format!("run {id}: starting '{}' ({display})", task.name))?;

    let path_var = profile.path_var()?;
    let spawned = Command::new(&task.program)
        .args(&task.args)
        .args(extra_args)
        .current_dir(&profile.project_dir)
        .env("PATH", path_var)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            // The command never started; still record the failed run.
            sink.record(&format!("run {id}: failed to start: {e}"))?;
            let result = RunResult {
                id,
                task: task.name.to_string(),
                started_at,
                finished_at: Some(Utc::now()),
                status: RunStatus::Failed,
                exit_code: None,
                log_excerpt: sink.excerpt(),
            };
            record(pool, &result)?;
            error!(task = task.name, "Failed to spawn: {e}");
            return Ok(result);
        }
    };

    let stdout = child.stdout.take().context("Child stdout not captured")?;
    let stderr = child.stderr.take().context("Child stderr not captured")?;

    let sink = Arc::new(Mutex::new(sink));
    let (out_res, err_res) = tokio::join!(
        drain(stdout, sink.clone()),
        drain(stderr, sink.clone())
    );
    out_res?;
    err_res?;

    let status = child.wait().await.context("Failed to wait for child")?;
    let exit_code = status.code();
    let run_status = if status.success() {
        RunStatus::Success
    } else {
        RunStatus::Failed
    };

    // Both drain futures are done, so the Arc is ours again.
    let mut sink = Arc::try_unwrap(sink)
        .map_err(|_| anyhow::anyhow!("log sink still shared after drain"))?
        .into_inner();
    sink.record(&format!(
        "run {id}: '{}' finished: {run_status} (exit code {})",
        task.name,
        exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
    ))?;

    let result = RunResult {
        id,
        task: task.name.to_string(),
        started_at,
        finished_at: Some(Utc::now()),
        status: run_status,
        exit_code,
        log_excerpt: sink.excerpt(),
    };
    record(pool, &result)?;

    match run_status {
        RunStatus::Success => info!(task = task.name, "Task succeeded"),
        RunStatus::Failed => error!(task = task.name, code = ?exit_code, "Task failed"),
    }
    Ok(result)
}

fn record(pool: Option<&Pool>, result: &RunResult) -> Result<()> {
    if let Some(pool) = pool {
        storage::record_run(pool, result).context("Failed to record run result")?;
    }
    Ok(())
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::Path;

    fn fixture(dir: &Path) -> (Config, EnvironmentProfile) {
        let mut cfg = Config::default();
        cfg.project_dir = dir.to_path_buf();
        let profile = EnvironmentProfile {
            python: "/bin/sh".into(),
            project_dir: dir.to_path_buf(),
            path_prepend: vec![],
        };
        (cfg, profile)
    }

    fn shell_task(name: &'static str, script: &str, cfg: &Config) -> Task {
        Task {
            name,
            program: "/bin/sh".into(),
            args: vec!["-c".to_string(), script.to_string()],
            log_file: cfg.log_file(name),
        }
    }

    #[tokio::test]
    async fn test_zero_exit_is_success_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        let task = shell_task("ingest", "echo scraped 42 events", &cfg);

        let result = invoke(&task, &[], &profile, None).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.exit_code, Some(0));
        assert!(result.log_excerpt.contains("scraped 42 events"));

        let log = std::fs::read_to_string(cfg.log_file("ingest")).unwrap();
        assert!(log.contains("scraped 42 events"));
        assert!(log.contains("finished: success"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failed_with_code() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        let task = shell_task("decision", "echo boom >&2; exit 3", &cfg);

        let result = invoke(&task, &[], &profile, None).await.unwrap();
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.exit_code, Some(3));
        // stderr went through the sink too
        assert!(result.log_excerpt.contains("boom"));
    }

    #[tokio::test]
    async fn test_log_survives_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        let task = shell_task("backfill", "echo partial work; exit 1", &cfg);

        let _ = invoke(&task, &[], &profile, None).await.unwrap();
        let log = std::fs::read_to_string(cfg.log_file("backfill")).unwrap();
        assert!(log.contains("partial work"));
        assert!(log.contains("finished: failed (exit code 1)"));
    }

    #[tokio::test]
    async fn test_missing_program_yields_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        let task = Task {
            name: "ingest",
            program: dir.path().join("no-such-python"),
            args: vec![],
            log_file: cfg.log_file("ingest"),
        };

        let result = invoke(&task, &[], &profile, None).await.unwrap();
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.exit_code, None);
        let log = std::fs::read_to_string(cfg.log_file("ingest")).unwrap();
        assert!(log.contains("failed to start"));
    }

    #[tokio::test]
    async fn test_run_recorded_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        let pool = crate::storage::open_pool(&dir.path().join("runner.db")).unwrap();
        let task = shell_task("features", "exit 0", &cfg);

        invoke(&task, &[], &profile, Some(&pool)).await.unwrap();
        let rows = crate::storage::recent_runs(&pool, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task, "features");
        assert!(rows[0].is_success());
    }

    #[tokio::test]
    async fn test_extra_args_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, profile) = fixture(dir.path());
        // `sh -c 'echo $0 $1' a b` prints the extra args.
        let task = shell_task("backfill", "echo got: \"$@\"", &cfg);
        let extra = vec![
            "--sport".to_string(),
            "icehockey_nhl".to_string(),
        ];

        let result = invoke(&task, &extra, &profile, None).await.unwrap();
        assert!(result.log_excerpt.contains("got: icehockey_nhl"));
    }
}
