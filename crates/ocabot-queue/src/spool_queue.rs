use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    spool_io::{current_unix_timestamp_ms, write_json_atomic, JsonlEventLog},
    task_queue::{TaskQueue, TaskReceipt},
    task_request::{TaskName, TaskRequest},
};

const SPOOL_TASK_SCHEMA_VERSION: u32 = 1;
const SPOOL_TASKS_DIR: &str = "tasks";
const SPOOL_EVENT_LOG_FILE: &str = "events.jsonl";
const SPOOL_TASK_ID_PREFIX: &str = "task";

static SPOOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn spool_task_schema_version() -> u32 {
    SPOOL_TASK_SCHEMA_VERSION
}

/// Durable manifest persisted for each spooled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolTaskRecord {
    #[serde(default = "spool_task_schema_version")]
    pub schema_version: u32,
    pub task_id: String,
    pub created_unix_ms: u64,
    pub request: TaskRequest,
}

#[derive(Debug, Serialize)]
struct SpoolEventRecord<'a> {
    timestamp_unix_ms: u64,
    task_id: &'a str,
    event: &'a str,
    task: TaskName,
}

/// File-backed queue: one JSON manifest per pending task plus an append-only event log.
///
/// Workers are expected to read `tasks/`, run each task and then call
/// [`SpoolTaskQueue::acknowledge`].
#[derive(Debug)]
pub struct SpoolTaskQueue {
    spool_dir: PathBuf,
    events: JsonlEventLog,
}

impl SpoolTaskQueue {
    /// Opens (and creates when missing) a spool rooted at `spool_dir`.
    pub fn open(spool_dir: impl Into<PathBuf>) -> Result<Self> {
        let spool_dir = spool_dir.into();
        let tasks_dir = spool_dir.join(SPOOL_TASKS_DIR);
        std::fs::create_dir_all(&tasks_dir)
            .with_context(|| format!("failed to create {}", tasks_dir.display()))?;
        let events = JsonlEventLog::open(spool_dir.join(SPOOL_EVENT_LOG_FILE))?;
        Ok(Self { spool_dir, events })
    }

    pub fn spool_dir(&self) -> &Path {
        self.spool_dir.as_path()
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.spool_dir.join(SPOOL_TASKS_DIR)
    }

    pub fn events_path(&self) -> PathBuf {
        self.spool_dir.join(SPOOL_EVENT_LOG_FILE)
    }

    /// Lists pending tasks, oldest first, capped at `limit` entries.
    pub fn list_pending(&self, limit: usize) -> Result<Vec<SpoolTaskRecord>> {
        let mut records = load_spool_task_records(&self.tasks_dir())?;
        records.sort_by(|left, right| {
            left.created_unix_ms
                .cmp(&right.created_unix_ms)
                .then_with(|| left.task_id.cmp(&right.task_id))
        });
        records.truncate(limit);
        Ok(records)
    }

    /// Removes a pending task once a worker has taken it. Returns false when it was not pending.
    pub fn acknowledge(&self, task_id: &str) -> Result<bool> {
        if !is_valid_spool_task_id(task_id) {
            bail!("invalid spooled task id '{task_id}'");
        }
        let path = spool_task_path(&self.tasks_dir(), task_id);
        if !path.exists() {
            return Ok(false);
        }
        let record = load_spool_task_record(&path)?;
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        self.events.append(&SpoolEventRecord {
            timestamp_unix_ms: current_unix_timestamp_ms(),
            task_id,
            event: "acknowledged",
            task: record.request.task,
        })?;
        Ok(true)
    }
}

impl TaskQueue for SpoolTaskQueue {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt> {
        let record = SpoolTaskRecord {
            schema_version: SPOOL_TASK_SCHEMA_VERSION,
            task_id: next_spool_task_id(),
            created_unix_ms: current_unix_timestamp_ms(),
            request,
        };
        let path = spool_task_path(&self.tasks_dir(), &record.task_id);
        write_json_atomic(&path, &record)
            .with_context(|| format!("failed to spool task {}", record.task_id))?;
        self.events.append(&SpoolEventRecord {
            timestamp_unix_ms: record.created_unix_ms,
            task_id: &record.task_id,
            event: "queued",
            task: record.request.task,
        })?;
        tracing::info!(
            task_id = %record.task_id,
            task = %record.request.task,
            organization = %record.request.target.organization,
            repository = %record.request.target.repository,
            number = record.request.target.number,
            dry_run = record.request.dry_run,
            "task spooled"
        );
        Ok(TaskReceipt::Queued {
            task_id: record.task_id,
            task: record.request.task,
        })
    }
}

fn next_spool_task_id() -> String {
    let now = current_unix_timestamp_ms();
    let suffix = SPOOL_TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{SPOOL_TASK_ID_PREFIX}-{now}-{suffix:04}")
}

/// Task ids name files under `tasks/`, so only the characters generated ids use are accepted.
fn is_valid_spool_task_id(task_id: &str) -> bool {
    !task_id.is_empty()
        && task_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn spool_task_path(tasks_dir: &Path, task_id: &str) -> PathBuf {
    tasks_dir.join(format!("{task_id}.json"))
}

fn load_spool_task_record(path: &Path) -> Result<SpoolTaskRecord> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let record = serde_json::from_str::<SpoolTaskRecord>(&raw)
        .with_context(|| format!("failed to parse spooled task {}", path.display()))?;
    if record.schema_version != SPOOL_TASK_SCHEMA_VERSION {
        bail!(
            "unsupported spooled task schema in {}: expected {}, found {}",
            path.display(),
            SPOOL_TASK_SCHEMA_VERSION,
            record.schema_version
        );
    }
    Ok(record)
}

fn load_spool_task_records(tasks_dir: &Path) -> Result<Vec<SpoolTaskRecord>> {
    if !tasks_dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in std::fs::read_dir(tasks_dir)
        .with_context(|| format!("failed to read {}", tasks_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to list {}", tasks_dir.display()))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        records.push(load_spool_task_record(&path)?);
    }
    Ok(records)
}
