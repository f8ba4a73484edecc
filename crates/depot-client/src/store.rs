//! Upload Task Store
//!
//! Process-wide registry of upload tasks across every group. The orchestrator
//! is the only writer; any number of views read it or subscribe to
//! [`TaskEvent`]s. Tasks outlive the view that submitted them.

use crate::error::ClientError;
use depot_core::models::{TaskId, UploadStatus, UploadTask};
use depot_core::validation::validate_group_id;
use depot_core::UploadRules;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A file about to be uploaded, as declared by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
        }
    }
}

/// Change notification. Carries a snapshot of the task after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Added(UploadTask),
    Updated(UploadTask),
    Removed(TaskId),
}

pub struct UploadTaskStore {
    rules: UploadRules,
    // Vec keeps insertion order for per-group listings
    tasks: RwLock<Vec<UploadTask>>,
    events: broadcast::Sender<TaskEvent>,
}

impl UploadTaskStore {
    pub fn new(rules: UploadRules) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            rules,
            tasks: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn rules(&self) -> &UploadRules {
        &self.rules
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<UploadTask>> {
        self.tasks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<UploadTask>> {
        self.tasks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: TaskEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Apply `change` to a live task. Unknown and terminal tasks are left
    /// untouched and logged.
    fn mutate<F>(&self, task_id: TaskId, operation: &'static str, change: F) -> bool
    where
        F: FnOnce(&mut UploadTask) -> bool,
    {
        let snapshot = {
            let mut tasks = self.write();
            let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
                tracing::warn!(task_id = %task_id, operation, "Ignoring update for unknown task");
                return false;
            };
            if task.status.is_terminal() {
                tracing::warn!(
                    task_id = %task_id,
                    status = %task.status,
                    operation,
                    "Ignoring update for finished task"
                );
                return false;
            }
            if !change(task) {
                return false;
            }
            task.clone()
        };
        self.publish(TaskEvent::Updated(snapshot));
        true
    }

    /// Register a new Pending task. Fails if the file exceeds its category's
    /// size ceiling.
    pub fn add_task(&self, group_id: &str, file: &FileDescriptor) -> Result<TaskId, ClientError> {
        validate_group_id(group_id)?;
        self.rules
            .check_upload(&file.content_type, &file.name, file.size)?;

        let task = UploadTask::new(group_id, file.name.clone(), file.size);
        let task_id = task.id;
        self.write().push(task.clone());

        tracing::debug!(task_id = %task_id, group_id = %group_id, file_name = %file.name, "Upload task added");
        self.publish(TaskEvent::Added(task));
        Ok(task_id)
    }

    /// Raise a task's progress. Values are clamped to 100 and never lower the
    /// current progress.
    pub fn update_progress(&self, task_id: TaskId, percent: u8) -> bool {
        let percent = percent.min(100);
        self.mutate(task_id, "update_progress", |task| {
            if percent <= task.progress {
                return false;
            }
            task.progress = percent;
            true
        })
    }

    /// Record the issued object key. A key is set at most once.
    pub fn set_object_key(&self, task_id: TaskId, object_key: &str) -> bool {
        self.mutate(task_id, "set_object_key", |task| {
            if task.object_key.is_some() {
                tracing::warn!(task_id = %task.id, "Object key already recorded");
                return false;
            }
            task.object_key = Some(object_key.to_string());
            true
        })
    }

    /// Move a task to `status`. Only Pending to Uploading and any active
    /// status to Succeeded or Failed are accepted; anything else is ignored.
    pub fn update_status(
        &self,
        task_id: TaskId,
        status: UploadStatus,
        error_message: Option<String>,
    ) -> bool {
        self.mutate(task_id, "update_status", |task| {
            if !task.status.can_move_to(status) {
                tracing::warn!(
                    task_id = %task.id,
                    from = %task.status,
                    to = %status,
                    "Ignoring backward status change"
                );
                return false;
            }
            task.status = status;
            match status {
                UploadStatus::Succeeded => task.progress = 100,
                UploadStatus::Failed => task.error_message = error_message,
                UploadStatus::Pending | UploadStatus::Uploading => {}
            }
            true
        })
    }

    pub fn get_task(&self, task_id: TaskId) -> Option<UploadTask> {
        self.read().iter().find(|t| t.id == task_id).cloned()
    }

    /// Tasks of one group in the order they were added.
    pub fn get_tasks_by_group(&self, group_id: &str) -> Vec<UploadTask> {
        self.read()
            .iter()
            .filter(|t| t.group_id == group_id)
            .cloned()
            .collect()
    }

    /// Tasks still Pending or Uploading, across all groups.
    pub fn get_active_tasks(&self) -> Vec<UploadTask> {
        self.read()
            .iter()
            .filter(|t| t.status.is_active())
            .cloned()
            .collect()
    }

    pub fn has_active_tasks(&self) -> bool {
        self.read().iter().any(|t| t.status.is_active())
    }

    pub fn remove_task(&self, task_id: TaskId) -> Option<UploadTask> {
        let removed = {
            let mut tasks = self.write();
            let position = tasks.iter().position(|t| t.id == task_id)?;
            tasks.remove(position)
        };
        self.publish(TaskEvent::Removed(task_id));
        Some(removed)
    }
}
