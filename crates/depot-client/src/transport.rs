//! Direct transfer of file bytes to a presigned PUT URL.
//!
//! A transfer is observed as a [`TransferStream`]: zero or more
//! [`TransferEvent::Progress`] items followed by exactly one terminal item,
//! either [`TransferEvent::Completed`] with the storage response status or an
//! `Err` for a network failure.

use crate::error::ClientError;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Bytes handed to the connection so far.
    Progress { sent: u64, total: u64 },
    /// Storage answered. Any status, including rejections.
    Completed { status: u16 },
}

impl TransferEvent {
    /// Share of the body sent, 0..=100.
    pub fn percent(&self) -> Option<u8> {
        match *self {
            TransferEvent::Progress { total: 0, .. } => Some(100),
            TransferEvent::Progress { sent, total } => {
                Some(((sent.min(total) * 100) / total) as u8)
            }
            TransferEvent::Completed { .. } => None,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<Result<TransferEvent, ClientError>>;

/// Events of one transfer. Dropping the stream aborts the transfer.
pub struct TransferStream {
    events: mpsc::UnboundedReceiver<Result<TransferEvent, ClientError>>,
    task: Option<JoinHandle<()>>,
}

impl TransferStream {
    /// A stream fed by the returned sender. The stream ends when the sender
    /// is dropped.
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                events: rx,
                task: None,
            },
        )
    }

    /// A stream replaying fixed events.
    pub fn from_events(events: Vec<Result<TransferEvent, ClientError>>) -> Self {
        let (tx, stream) = Self::channel();
        for event in events {
            let _ = tx.send(event);
        }
        stream
    }

    fn attach(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }
}

impl Stream for TransferStream {
    type Item = Result<TransferEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl Drop for TransferStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Moves bytes to object storage. Must be called inside a Tokio runtime.
pub trait ObjectTransport: Send + Sync {
    fn put(&self, url: &str, content_type: &str, data: Bytes) -> TransferStream;
}

/// `reqwest` PUT with a chunked body so progress can be reported.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(DEFAULT_TRANSFER_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn chunks(&self, data: &Bytes) -> Vec<Bytes> {
        (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| data.slice(start..(start + self.chunk_size).min(data.len())))
            .collect()
    }
}

impl ObjectTransport for HttpTransport {
    fn put(&self, url: &str, content_type: &str, data: Bytes) -> TransferStream {
        let (tx, stream) = TransferStream::channel();
        let total = data.len() as u64;
        let chunks = self.chunks(&data);

        let progress_tx = tx.clone();
        let mut sent = 0u64;
        let body = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let _ = progress_tx.send(Ok(TransferEvent::Progress { sent, total }));
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body));

        let task = tokio::spawn(async move {
            let terminal = match request.send().await {
                Ok(response) => Ok(TransferEvent::Completed {
                    status: response.status().as_u16(),
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Direct transfer failed");
                    Err(ClientError::Transport(e.to_string()))
                }
            };
            let _ = tx.send(terminal);
        });

        stream.attach(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_progress_percent() {
        assert_eq!(TransferEvent::Progress { sent: 0, total: 200 }.percent(), Some(0));
        assert_eq!(TransferEvent::Progress { sent: 50, total: 200 }.percent(), Some(25));
        assert_eq!(TransferEvent::Progress { sent: 300, total: 200 }.percent(), Some(100));
        assert_eq!(TransferEvent::Progress { sent: 0, total: 0 }.percent(), Some(100));
        assert_eq!(TransferEvent::Completed { status: 200 }.percent(), None);
    }

    #[test]
    fn test_chunks_cover_the_body() {
        let transport = HttpTransport::with_client(Client::new()).with_chunk_size(4);
        let chunks = transport.chunks(&Bytes::from_static(b"0123456789"));
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(transport.chunks(&Bytes::new()).is_empty());
    }

    #[tokio::test]
    async fn test_from_events_replays_then_ends() {
        let mut stream = TransferStream::from_events(vec![
            Ok(TransferEvent::Progress { sent: 1, total: 2 }),
            Ok(TransferEvent::Completed { status: 200 }),
        ]);
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            TransferEvent::Progress { sent: 1, total: 2 }
        );
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            TransferEvent::Completed { status: 200 }
        );
        assert!(stream.next().await.is_none());
    }
}
