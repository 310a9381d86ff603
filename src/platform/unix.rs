//! Unix adapter -- `bin/python` venv layout, crontab installation.

use super::PlatformAdapter;
use crate::schedule::{crontab, ScheduleEntry};
use crate::tasks::Task;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub struct Unix;

#[async_trait]
impl PlatformAdapter for Unix {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn venv_interpreters(&self) -> &'static [&'static str] {
        &["bin/python"]
    }

    fn system_interpreters(&self) -> &'static [&'static str] {
        &["python3", "python"]
    }

    /// One five-field cron line per entry, tag comment at the end.
    fn render_entry(&self, entry: &ScheduleEntry, task: &Task, project_dir: &Path) -> String {
        format!(
            "{} cd {} && {} >> {} 2>&1 # {}",
            entry.trigger.cron_expr(),
            project_dir.display(),
            task.command_string(),
            task.log_file.display(),
            entry.tag
        )
    }

    async fn install(&self, rendered: &str, tag: &str, _helper_dir: &Path) -> Result<String> {
        let installed = crontab::install_block(rendered, tag).await?;
        Ok(format!(
            "Installed {installed} tagged entries into the user crontab."
        ))
    }

    async fn remove(
        &self,
        _entries: &[ScheduleEntry],
        tag: &str,
        _helper_dir: &Path,
    ) -> Result<String> {
        let removed = crontab::remove_tagged(tag).await?;
        Ok(format!("Removed {removed} tagged entries from the user crontab."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Trigger;
    use std::path::PathBuf;

    fn ingest_task() -> Task {
        Task {
            name: "ingest",
            program: PathBuf::from("/srv/engine/.venv/bin/python"),
            args: vec!["manage.py".to_string(), "scrape".to_string()],
            log_file: PathBuf::from("/srv/engine/logs/ingest.log"),
        }
    }

    #[test]
    fn test_render_entry_is_single_tagged_cron_line() {
        let entry = ScheduleEntry {
            task: "ingest".to_string(),
            trigger: Trigger::Every { minutes: 5 },
            tag: "oddsrunner".to_string(),
        };
        let line = Unix.render_entry(&entry, &ingest_task(), Path::new("/srv/engine"));
        assert!(line.starts_with("*/5 * * * * cd /srv/engine && "));
        assert!(line.contains("manage.py scrape"));
        assert!(line.contains(">> /srv/engine/logs/ingest.log 2>&1"));
        assert!(line.ends_with("# oddsrunner"));
        assert_eq!(line.lines().count(), 1);
    }
}
