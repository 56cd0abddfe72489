use std::collections::BTreeSet;

use anyhow::Result;

use crate::{
    task_queue::{TaskQueue, TaskReceipt},
    task_request::{TaskName, TaskRequest},
};

const ALL_TASKS_KEYWORD: &str = "all";

/// Enable/disable list for background tasks, keyed by [`TaskName::switch_name`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSwitches {
    enabled: Option<BTreeSet<String>>,
    disabled: BTreeSet<String>,
}

impl TaskSwitches {
    /// Builds switches from configuration lists.
    ///
    /// An `enabled` list containing `all` (or left empty) enables every task.
    pub fn from_lists<'a>(
        enabled: impl IntoIterator<Item = &'a str>,
        disabled: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let enabled = normalize_switch_names(enabled);
        let enabled = if enabled.is_empty() || enabled.contains(ALL_TASKS_KEYWORD) {
            None
        } else {
            Some(enabled)
        };
        Self {
            enabled,
            disabled: normalize_switch_names(disabled),
        }
    }

    pub fn is_enabled(&self, task: TaskName) -> bool {
        let name = task.switch_name();
        let allowed = self
            .enabled
            .as_ref()
            .map_or(true, |enabled| enabled.contains(name));
        allowed && !self.disabled.contains(name)
    }
}

fn normalize_switch_names<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Queue wrapper that drops requests for switched-off tasks.
#[derive(Debug)]
pub struct SwitchableTaskQueue<Q> {
    inner: Q,
    switches: TaskSwitches,
}

impl<Q: TaskQueue> SwitchableTaskQueue<Q> {
    pub fn new(inner: Q, switches: TaskSwitches) -> Self {
        Self { inner, switches }
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }
}

impl<Q: TaskQueue> TaskQueue for SwitchableTaskQueue<Q> {
    fn enqueue(&self, request: TaskRequest) -> Result<TaskReceipt> {
        if !self.switches.is_enabled(request.task) {
            tracing::info!(
                task = %request.task,
                switch = request.task.switch_name(),
                number = request.target.number,
                "task is disabled; not queued"
            );
            return Ok(TaskReceipt::Disabled { task: request.task });
        }
        self.inner.enqueue(request)
    }
}
