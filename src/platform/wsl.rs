//! WSL adapter -- a Unix host that may carry a Windows-created virtualenv,
//! so both venv layouts are probed. Scheduling goes through cron inside the
//! WSL distribution.

use super::{unix::Unix, PlatformAdapter};
use crate::schedule::ScheduleEntry;
use crate::tasks::Task;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub struct Wsl;

/// WSL kernels identify themselves in /proc/version.
pub fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

#[async_trait]
impl PlatformAdapter for Wsl {
    fn name(&self) -> &'static str {
        "wsl"
    }

    fn venv_interpreters(&self) -> &'static [&'static str] {
        &["bin/python", "Scripts/python.exe"]
    }

    fn system_interpreters(&self) -> &'static [&'static str] {
        &["python3", "python"]
    }

    fn render_entry(&self, entry: &ScheduleEntry, task: &Task, project_dir: &Path) -> String {
        Unix.render_entry(entry, task, project_dir)
    }

    async fn install(&self, rendered: &str, tag: &str, helper_dir: &Path) -> Result<String> {
        Unix.install(rendered, tag, helper_dir).await
    }

    async fn remove(
        &self,
        entries: &[ScheduleEntry],
        tag: &str,
        helper_dir: &Path,
    ) -> Result<String> {
        Unix.remove(entries, tag, helper_dir).await
    }
}
