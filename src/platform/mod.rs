//! Platform adapters -- Unix, native Windows, and WSL.
//!
//! All OS-specific behavior (virtualenv layout, system interpreter names,
//! schedule rendering and installation) lives behind `PlatformAdapter` so the
//! rest of the crate never branches on the host OS.

pub mod unix;
pub mod windows;
pub mod wsl;

use crate::schedule::ScheduleEntry;
use crate::tasks::Task;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Interpreter locations inside a virtualenv directory, priority order.
    fn venv_interpreters(&self) -> &'static [&'static str];

    /// System-wide interpreter names to fall back to on PATH.
    fn system_interpreters(&self) -> &'static [&'static str];

    /// Header emitted before the rendered entry set, if any.
    fn render_preamble(&self, _tag: &str) -> String {
        String::new()
    }

    /// Render one schedule entry targeting this platform's scheduler.
    fn render_entry(&self, entry: &ScheduleEntry, task: &Task, project_dir: &Path) -> String;

    /// Idempotently install a rendered entry set. Returns a summary line.
    async fn install(&self, rendered: &str, tag: &str, helper_dir: &Path) -> Result<String>;

    /// Remove the tagged entry set. Returns a summary line.
    async fn remove(
        &self,
        entries: &[ScheduleEntry],
        tag: &str,
        helper_dir: &Path,
    ) -> Result<String>;
}

/// Detect the host platform.
pub fn detect() -> Box<dyn PlatformAdapter> {
    if cfg!(windows) {
        Box::new(windows::WindowsNative)
    } else if wsl::is_wsl() {
        Box::new(wsl::Wsl)
    } else {
        Box::new(unix::Unix)
    }
}

/// Look an adapter up by name (`unix`, `windows`, `wsl`), for explicit
/// cross-platform rendering.
pub fn by_name(name: &str) -> Option<Box<dyn PlatformAdapter>> {
    match name {
        "unix" => Some(Box::new(unix::Unix)),
        "windows" => Some(Box::new(windows::WindowsNative)),
        "wsl" => Some(Box::new(wsl::Wsl)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name_round_trip() {
        for name in ["unix", "windows", "wsl"] {
            let adapter = by_name(name).unwrap();
            assert_eq!(adapter.name(), name);
        }
        assert!(by_name("beos").is_none());
    }

    #[test]
    fn test_detect_returns_some_adapter() {
        let adapter = detect();
        assert!(["unix", "windows", "wsl"].contains(&adapter.name()));
    }
}
