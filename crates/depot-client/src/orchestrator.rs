//! Upload Orchestrator
//!
//! Drives each submitted file through three phases and mirrors them into the
//! [`UploadTaskStore`]:
//!
//! | phase        | progress |
//! |--------------|----------|
//! | issuance     | 0-15     |
//! | transfer     | 15-85    |
//! | finalization | 85-100   |
//!
//! Every task runs on its own Tokio task. A failure ends only the task it
//! belongs to and is never retried here; a retry is a fresh submission.

use crate::api::UploadApi;
use crate::dimensions::{is_measurable, measure_image};
use crate::error::ClientError;
use crate::store::{FileDescriptor, UploadTaskStore};
use crate::transport::{ObjectTransport, TransferEvent};
use bytes::Bytes;
use depot_core::models::{
    FinalizeRequest, IssuePutRequest, ObjectRecord, TaskId, UploadStatus,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const STARTED_PROGRESS: u8 = 5;
const ISSUED_PROGRESS: u8 = 12;
const TRANSFER_START_PROGRESS: u8 = 15;
const TRANSFER_END_PROGRESS: u8 = 85;

const DEFAULT_REMOVAL_DELAY: Duration = Duration::from_secs(2);

/// Raw transfer percent mapped into the transfer band.
fn transfer_progress(percent: u8) -> u8 {
    let band = u16::from(TRANSFER_END_PROGRESS - TRANSFER_START_PROGRESS);
    let scaled = u16::from(percent.min(100)) * band / 100;
    TRANSFER_START_PROGRESS + scaled as u8
}

/// One file handed to [`UploadOrchestrator::submit`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    pub alt: Option<String>,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    fn descriptor(&self) -> FileDescriptor {
        FileDescriptor::new(
            self.name.clone(),
            self.data.len() as u64,
            self.content_type.clone(),
        )
    }
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub task_id: TaskId,
    pub result: Result<ObjectRecord, ClientError>,
}

/// Tasks started by one `submit` call.
///
/// Dropping the handle does not stop anything: each task still runs to
/// Succeeded or Failed and stays observable through the store.
#[derive(Debug)]
pub struct BatchHandle {
    task_ids: Vec<TaskId>,
    rejected: Vec<(String, ClientError)>,
    workers: Vec<JoinHandle<UploadOutcome>>,
}

impl BatchHandle {
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    /// Files refused by the store before any request was made.
    pub fn rejected(&self) -> &[(String, ClientError)] {
        &self.rejected
    }

    /// Wait for every accepted task, in submission order.
    pub async fn wait(self) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(self.workers.len());
        for (task_id, worker) in self.task_ids.into_iter().zip(self.workers) {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => UploadOutcome {
                    task_id,
                    result: Err(ClientError::Transport(format!(
                        "Upload worker stopped: {}",
                        e
                    ))),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[derive(Clone)]
pub struct UploadOrchestrator {
    api: Arc<dyn UploadApi>,
    transport: Arc<dyn ObjectTransport>,
    store: Arc<UploadTaskStore>,
    removal_delay: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        api: Arc<dyn UploadApi>,
        transport: Arc<dyn ObjectTransport>,
        store: Arc<UploadTaskStore>,
    ) -> Self {
        Self {
            api,
            transport,
            store,
            removal_delay: DEFAULT_REMOVAL_DELAY,
        }
    }

    /// How long a Succeeded task stays visible before it is removed.
    pub fn with_removal_delay(mut self, delay: Duration) -> Self {
        self.removal_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<UploadTaskStore> {
        &self.store
    }

    /// Register one task per file and start them all. Files that fail the
    /// store's checks are reported in [`BatchHandle::rejected`].
    pub fn submit(&self, group_id: &str, files: Vec<UploadFile>) -> BatchHandle {
        let mut handle = BatchHandle {
            task_ids: Vec::with_capacity(files.len()),
            rejected: Vec::new(),
            workers: Vec::with_capacity(files.len()),
        };

        for file in files {
            let task_id = match self.store.add_task(group_id, &file.descriptor()) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(file_name = %file.name, error = %e, "File rejected before upload");
                    handle.rejected.push((file.name, e));
                    continue;
                }
            };

            let orchestrator = self.clone();
            let group_id = group_id.to_string();
            handle.task_ids.push(task_id);
            handle.workers.push(tokio::spawn(async move {
                let result = orchestrator.run(task_id, &group_id, file).await;
                UploadOutcome { task_id, result }
            }));
        }

        tracing::info!(
            group_id = %group_id,
            accepted = handle.task_ids.len(),
            rejected = handle.rejected.len(),
            "Upload batch submitted"
        );
        handle
    }

    async fn run(
        &self,
        task_id: TaskId,
        group_id: &str,
        file: UploadFile,
    ) -> Result<ObjectRecord, ClientError> {
        let result = self.drive(task_id, group_id, &file).await;
        match &result {
            Ok(record) => {
                self.store
                    .update_status(task_id, UploadStatus::Succeeded, None);
                tracing::info!(task_id = %task_id, record_id = %record.id, "Upload succeeded");
                self.schedule_removal(task_id);
            }
            Err(e) => {
                self.store
                    .update_status(task_id, UploadStatus::Failed, Some(e.user_message()));
                tracing::warn!(task_id = %task_id, file_name = %file.name, error = %e, "Upload failed");
            }
        }
        result
    }

    async fn drive(
        &self,
        task_id: TaskId,
        group_id: &str,
        file: &UploadFile,
    ) -> Result<ObjectRecord, ClientError> {
        self.store
            .update_status(task_id, UploadStatus::Uploading, None);
        self.store.update_progress(task_id, STARTED_PROGRESS);

        let dimensions = if is_measurable(&file.content_type) {
            measure_image(&file.data)
        } else {
            None
        };

        let issued = self
            .api
            .issue_put_url(&IssuePutRequest {
                group_id: group_id.to_string(),
                file_name: file.name.clone(),
                file_type: file.content_type.clone(),
                file_size: file.data.len() as u64,
            })
            .await?;
        self.store.set_object_key(task_id, &issued.object_key);
        self.store.update_progress(task_id, ISSUED_PROGRESS);

        self.transfer(task_id, &issued.upload_url, file).await?;
        self.store.update_progress(task_id, TRANSFER_END_PROGRESS);

        let request = FinalizeRequest {
            group_id: group_id.to_string(),
            name: file.name.clone(),
            object_key: issued.object_key.clone(),
            file_size: file.data.len() as u64,
            mime_type: file.content_type.clone(),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            alt: file.alt.clone(),
        };
        self.api.finalize(&request).await.inspect_err(|e| {
            tracing::warn!(
                task_id = %task_id,
                object_key = %issued.object_key,
                error = %e,
                "Finalize failed; stored object has no record"
            );
        })
    }

    async fn transfer(
        &self,
        task_id: TaskId,
        upload_url: &str,
        file: &UploadFile,
    ) -> Result<(), ClientError> {
        let mut events = self
            .transport
            .put(upload_url, &file.content_type, file.data.clone());

        while let Some(event) = events.next().await {
            match event? {
                progress @ TransferEvent::Progress { .. } => {
                    if let Some(percent) = progress.percent() {
                        self.store
                            .update_progress(task_id, transfer_progress(percent));
                    }
                }
                TransferEvent::Completed { status } if (200..300).contains(&status) => {
                    return Ok(());
                }
                TransferEvent::Completed { status } => {
                    return Err(ClientError::Transport(format!(
                        "Object store rejected the upload with status {}",
                        status
                    )));
                }
            }
        }

        Err(ClientError::Transport(
            "Transfer ended without a response".to_string(),
        ))
    }

    fn schedule_removal(&self, task_id: TaskId) {
        let store = self.store.clone();
        let delay = self.removal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.remove_task(task_id);
        });
    }
}
