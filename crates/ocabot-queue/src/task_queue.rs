use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::task_request::{TaskName, TaskRequest};

/// Outcome of handing one task to a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskReceipt {
    /// Task was accepted and will run asynchronously.
    Queued { task_id: String, task: TaskName },
    /// Task is switched off in configuration and was dropped.
    Disabled { task: TaskName },
}

impl TaskReceipt {
    pub fn task(&self) -> TaskName {
        match self {
            Self::Queued { task, .. } | Self::Disabled { task } => *task,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Queued { task_id, .. } => Some(task_id.as_str()),
            Self::Disabled { .. } => None,
        }
    }
}

/// Enqueue interface of the asynchronous execution backend.
///
/// Implementations return as soon as the request is recorded; they never wait
/// for the task itself to run.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt>;
}

impl<Q: TaskQueue + ?Sized> TaskQueue for &Q {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt> {
        (**self).enqueue(request)
    }
}

impl<Q: TaskQueue + ?Sized> TaskQueue for std::sync::Arc<Q> {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt> {
        (**self).enqueue(request)
    }
}

/// Queue that keeps requests in memory, in submission order.
#[derive(Debug, Default)]
pub struct InMemoryTaskQueue {
    requests: Mutex<Vec<TaskRequest>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every request accepted so far.
    pub fn requests(&self) -> Vec<TaskRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt> {
        let mut requests = lock_unpoisoned(&self.requests);
        let task = request.task;
        requests.push(request);
        Ok(TaskReceipt::Queued {
            task_id: format!("memory-{:04}", requests.len()),
            task,
        })
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
