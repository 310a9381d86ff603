//! One-time environment preparation.
//!
//! Sequence: ensure data/log directories exist (fatal on failure), check the
//! pipeline's Python dependencies (best-effort pip install from the manifest,
//! then one re-check), initialize the schema via `manage.py setup`, and
//! optionally kick off ingestion plus feature computation right away.

use crate::config::Config;
use crate::env::EnvironmentProfile;
use crate::storage::Pool;
use crate::tasks::{invoker, RunResult, Task, TaskKind};
use anyhow::Result;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Importable packages the pipeline cannot run without.
const CORE_IMPORTS: [&str; 4] = ["click", "sqlalchemy", "pandas", "requests"];

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to create directory {path}")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("required Python packages missing after install attempt ({0})")]
    DependencyMissing(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOptions {
    /// Skip the best-effort pip install (`--no-pip`).
    pub skip_pip: bool,
    /// Run ingest and feature computation immediately after setup.
    pub run_now: bool,
}

/// Outcome of a bootstrap run. The pip remediation step is best-effort:
/// its result is reported but never decides success -- only the import
/// re-check and the pipeline tasks in `results` do.
#[derive(Debug)]
pub struct BootstrapReport {
    /// Best-effort pip install outcome, if the step ran.
    pub remediation: Option<RunResult>,
    /// Pipeline task results (schema init, optional first run).
    pub results: Vec<RunResult>,
}

/// `python -c "import ..."` over the core packages.
async fn imports_ok(profile: &EnvironmentProfile) -> Result<bool> {
    let stmt = format!("import {}", CORE_IMPORTS.join(", "));
    let output = tokio::process::Command::new(&profile.python)
        .arg("-c")
        .arg(&stmt)
        .current_dir(&profile.project_dir)
        .env("PATH", profile.path_var()?)
        .output()
        .await?;
    Ok(output.status.success())
}

/// Run the bootstrap sequence. Returns the results of every task that was
/// invoked; the caller decides what a trailing failure in `results` means.
pub async fn bootstrap(
    cfg: &Config,
    profile: &EnvironmentProfile,
    pool: &Pool,
    opts: &BootstrapOptions,
) -> Result<BootstrapReport> {
    // 1. Directories. Nothing can run without them.
    for dir in [cfg.data_path(), cfg.logs_path()] {
        std::fs::create_dir_all(&dir).map_err(|source| BootstrapError::DirCreation {
            path: dir.clone(),
            source,
        })?;
        info!(dir = %dir.display(), "Directory ready");
    }

    let mut remediation = None;
    let mut results = Vec::new();

    // 2. Dependencies: check, remediate once, re-check.
    if !imports_ok(profile).await? {
        let manifest = cfg.requirements_path();
        if opts.skip_pip {
            info!("Dependency check failed; pip install skipped (--no-pip)");
        } else if manifest.is_file() {
            let pip = Task {
                name: "pip-install",
                program: profile.python.clone(),
                args: vec![
                    "-m".to_string(),
                    "pip".to_string(),
                    "install".to_string(),
                    "-r".to_string(),
                    manifest.display().to_string(),
                ],
                log_file: cfg.log_file("setup"),
            };
            let result = invoker::invoke(&pip, &[], profile, Some(pool)).await?;
            if !result.is_success() {
                // Best effort: only the re-check below decides if we abort.
                warn!("pip install failed; re-checking imports anyway");
            }
            remediation = Some(result);
        } else {
            warn!(manifest = %manifest.display(), "Dependency manifest not found; skipping install");
        }

        if !imports_ok(profile).await? {
            return Err(BootstrapError::DependencyMissing(CORE_IMPORTS.join(", ")).into());
        }
    }

    // 3. Schema initialization.
    let setup = Task::for_kind(TaskKind::Setup, cfg, profile);
    let result = invoker::invoke(&setup, &[], profile, Some(pool)).await?;
    let ok = result.is_success();
    results.push(result);
    if !ok {
        warn!("Schema initialization failed; aborting bootstrap");
        return Ok(BootstrapReport {
            remediation,
            results,
        });
    }

    // 4. Optional immediate first run.
    if opts.run_now {
        for kind in [TaskKind::Ingest, TaskKind::Features] {
            let task = Task::for_kind(kind, cfg, profile);
            let result = invoker::invoke(&task, &[], profile, Some(pool)).await?;
            let ok = result.is_success();
            results.push(result);
            if !ok {
                warn!(task = kind.name(), "Initial run failed; aborting bootstrap");
                break;
            }
        }
    }

    Ok(BootstrapReport {
        remediation,
        results,
    })
}
