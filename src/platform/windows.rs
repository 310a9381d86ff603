//! Native Windows adapter -- `Scripts\python.exe` layout, generated
//! `schtasks` helper script instead of direct scheduler access.

use super::PlatformAdapter;
use crate::schedule::{ScheduleEntry, Trigger};
use crate::tasks::Task;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

pub const INSTALL_HELPER: &str = "install_schedules.cmd";
pub const REMOVE_HELPER: &str = "remove_schedules.cmd";

pub struct WindowsNative;

fn day_abbrev(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "MON",
        chrono::Weekday::Tue => "TUE",
        chrono::Weekday::Wed => "WED",
        chrono::Weekday::Thu => "THU",
        chrono::Weekday::Fri => "FRI",
        chrono::Weekday::Sat => "SAT",
        chrono::Weekday::Sun => "SUN",
    }
}

fn schtasks_trigger(trigger: &Trigger) -> String {
    match trigger {
        Trigger::Every { minutes } => format!("/SC MINUTE /MO {minutes}"),
        Trigger::Daily { hour, minute } => format!("/SC DAILY /ST {hour:02}:{minute:02}"),
        Trigger::Weekly {
            weekday,
            hour,
            minute,
        } => format!(
            "/SC WEEKLY /D {} /ST {hour:02}:{minute:02}",
            day_abbrev(*weekday)
        ),
    }
}

#[async_trait]
impl PlatformAdapter for WindowsNative {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn venv_interpreters(&self) -> &'static [&'static str] {
        &["Scripts/python.exe"]
    }

    fn system_interpreters(&self) -> &'static [&'static str] {
        &["python.exe", "python"]
    }

    fn render_preamble(&self, tag: &str) -> String {
        format!("@echo off\nrem {tag}: scheduled tasks for the odds-engine pipeline\n")
    }

    /// Delete-then-create pair per entry; `/F` plus the preceding delete
    /// makes repeated runs of the helper replace rather than duplicate.
    fn render_entry(&self, entry: &ScheduleEntry, task: &Task, project_dir: &Path) -> String {
        let task_name = format!("{}\\{}", entry.tag, entry.task);
        let command = format!(
            "cmd /c cd /d {} && {} >> {} 2>&1",
            project_dir.display(),
            task.command_string(),
            task.log_file.display()
        );
        format!(
            "schtasks /Delete /TN \"{task_name}\" /F >NUL 2>&1\n\
             schtasks /Create /F /TN \"{task_name}\" {} /TR \"{command}\"",
            schtasks_trigger(&entry.trigger)
        )
    }

    /// "Installation" on Windows writes the helper script; the operator (or
    /// provisioning tooling) runs it with sufficient privileges.
    async fn install(&self, rendered: &str, _tag: &str, helper_dir: &Path) -> Result<String> {
        let path = helper_dir.join(INSTALL_HELPER);
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(format!(
            "Wrote scheduler helper {} -- run it to register the tasks.",
            path.display()
        ))
    }

    async fn remove(
        &self,
        entries: &[ScheduleEntry],
        tag: &str,
        helper_dir: &Path,
    ) -> Result<String> {
        let mut script = self.render_preamble(tag);
        for entry in entries {
            script.push_str(&format!(
                "schtasks /Delete /TN \"{}\\{}\" /F\n",
                entry.tag, entry.task
            ));
        }
        let path = helper_dir.join(REMOVE_HELPER);
        std::fs::write(&path, script)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(format!(
            "Wrote removal helper {} -- run it to delete the tasks.",
            path.display()
        ))
    }
}
