use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Hidden sibling a spool file is staged in before it is renamed into place.
fn staging_path(path: &Path, spool_dir: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("spool-file");
    spool_dir.join(format!(
        ".{file_name}.{}-{}.partial",
        std::process::id(),
        current_unix_timestamp_ms()
    ))
}

/// Writes text through a staged sibling and a rename so workers never read a partial file.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("spool file path is empty");
    }
    if path.is_dir() {
        bail!("cannot replace directory {} with a spool file", path.display());
    }

    let spool_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(spool_dir)
        .with_context(|| format!("failed to create {}", spool_dir.display()))?;

    let staged = staging_path(path, spool_dir);
    std::fs::write(&staged, content)
        .with_context(|| format!("failed to stage {}", staged.display()))?;
    std::fs::rename(&staged, path).with_context(|| {
        format!(
            "failed to publish staged {} as {}",
            staged.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Serializes `value` as pretty JSON with a trailing newline and writes it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    payload.push('\n');
    write_text_atomic(path, &payload)
}

/// Append-only JSON lines log shared by every clone of a queue handle.
#[derive(Debug)]
pub(crate) struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl JsonlEventLog {
    pub(crate) fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub(crate) fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value).context("failed to encode spool event")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("spool event log mutex is poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}
