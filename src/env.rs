//! Environment resolver -- deterministic, read-only interpreter discovery.
//!
//! Probe order: explicit `ODDSRUNNER_PYTHON` override, then project-local
//! virtualenvs (`.venv` before `venv`, platform subpaths per adapter), then
//! system-wide interpreters on PATH. The resolved profile is an explicit
//! value handed to the invoker; ambient process state is never mutated.

use crate::platform::PlatformAdapter;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Explicit interpreter override.
pub const PYTHON_OVERRIDE_VAR: &str = "ODDSRUNNER_PYTHON";

/// Extra directories prepended to the child's PATH.
pub const PATH_EXTEND_VAR: &str = "ODDSRUNNER_PATH";

/// Virtualenv directory names probed inside the project, priority order.
const VENV_NAMES: [&str; 2] = [".venv", "venv"];

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("no usable Python interpreter found (checked .venv, venv, and PATH)")]
    EnvironmentNotFound,
}

/// The resolved runtime environment for one invocation. Derived fresh each
/// time, never persisted.
#[derive(Debug, Clone)]
pub struct EnvironmentProfile {
    pub python: PathBuf,
    pub project_dir: PathBuf,
    pub path_prepend: Vec<PathBuf>,
}

impl EnvironmentProfile {
    /// Build the PATH value for a child process: prepended directories first,
    /// then the current PATH.
    pub fn path_var(&self) -> Result<OsString> {
        let mut parts = self.path_prepend.clone();
        if let Some(current) = std::env::var_os("PATH") {
            parts.extend(std::env::split_paths(&current));
        }
        Ok(std::env::join_paths(parts)?)
    }
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match path.metadata() {
            Ok(meta) => meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Directories from `ODDSRUNNER_PATH`, if set.
fn path_extension() -> Vec<PathBuf> {
    match std::env::var_os(PATH_EXTEND_VAR) {
        Some(raw) => std::env::split_paths(&raw).collect(),
        None => Vec::new(),
    }
}

/// Resolve the interpreter for a project. Pure filesystem probing; the first
/// existing executable candidate wins.
pub fn resolve(
    project_dir: &Path,
    adapter: &dyn PlatformAdapter,
) -> Result<EnvironmentProfile, EnvError> {
    // 1. Explicit override.
    if let Some(raw) = std::env::var_os(PYTHON_OVERRIDE_VAR) {
        let candidate = PathBuf::from(raw);
        if is_executable(&candidate) {
            debug!(python = %candidate.display(), "Using interpreter override");
            return Ok(profile(candidate, project_dir));
        }
        warn!(
            python = %candidate.display(),
            "ODDSRUNNER_PYTHON points at a missing interpreter; probing instead"
        );
    }

    // 2. Project-local virtualenvs.
    for venv in VENV_NAMES {
        for sub in adapter.venv_interpreters() {
            let candidate = project_dir.join(venv).join(sub);
            if is_executable(&candidate) {
                debug!(python = %candidate.display(), "Found virtualenv interpreter");
                return Ok(profile(candidate, project_dir));
            }
        }
    }

    // 3. System-wide fallback.
    for name in adapter.system_interpreters() {
        if let Ok(found) = which::which(name) {
            debug!(python = %found.display(), "Falling back to system interpreter");
            return Ok(profile(found, project_dir));
        }
    }

    Err(EnvError::EnvironmentNotFound)
}

fn profile(python: PathBuf, project_dir: &Path) -> EnvironmentProfile {
    let mut path_prepend = path_extension();
    if let Some(bin_dir) = python.parent() {
        path_prepend.insert(0, bin_dir.to_path_buf());
    }
    EnvironmentProfile {
        python,
        project_dir: project_dir.to_path_buf(),
        path_prepend,
    }
}
