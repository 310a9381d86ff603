//! Crontab plumbing -- read, tag-aware merge, write back.
//!
//! The merge is a pure function so the idempotence contract is testable
//! without touching a real crontab.

use super::ScheduleError;
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Drop every line carrying `# {tag}` from `existing`, then append `block`.
/// Applying this twice with the same block yields the same text, so installs
/// never duplicate the tagged set.
pub fn merge_block(existing: &str, block: &str, tag: &str) -> String {
    let marker = format!("# {tag}");
    let mut out = String::new();
    for line in existing.lines() {
        if line.contains(&marker) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(block);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Count the lines in `text` carrying `# {tag}`.
pub fn count_tagged(text: &str, tag: &str) -> usize {
    let marker = format!("# {tag}");
    text.lines().filter(|l| l.contains(&marker)).count()
}

/// Read the current user crontab. An empty crontab is not an error.
pub async fn read_current() -> Result<String> {
    let output = Command::new("crontab")
        .arg("-l")
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => anyhow::Error::new(ScheduleError::FacilityUnavailable(
                "crontab not found on PATH".to_string(),
            )),
            _ => anyhow::Error::new(e).context("Failed to run crontab -l"),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        // `crontab -l` exits nonzero when no crontab exists yet.
        Ok(String::new())
    }
}

/// Replace the user crontab with `text` via `crontab -`.
pub async fn write_all(text: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => anyhow::Error::new(ScheduleError::FacilityUnavailable(
                "crontab not found on PATH".to_string(),
            )),
            _ => anyhow::Error::new(e).context("Failed to spawn crontab -"),
        })?;

    let mut stdin = child
        .stdin
        .take()
        .context("crontab stdin not captured")?;
    stdin.write_all(text.as_bytes()).await?;
    drop(stdin);

    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("crontab rejected the new table (exit {:?})", status.code());
    }
    Ok(())
}

/// Idempotently install `block` under `tag`: strip the old tagged set,
/// append the new one, write back. Returns the installed line count.
pub async fn install_block(block: &str, tag: &str) -> Result<usize> {
    let existing = read_current().await?;
    let merged = merge_block(&existing, block, tag);
    write_all(&merged).await?;
    Ok(count_tagged(&merged, tag))
}

/// Remove every line under `tag`. Returns how many lines were dropped.
pub async fn remove_tagged(tag: &str) -> Result<usize> {
    let existing = read_current().await?;
    let removed = count_tagged(&existing, tag);
    if removed > 0 {
        let merged = merge_block(&existing, "", tag);
        write_all(&merged).await?;
    }
    Ok(removed)
}
