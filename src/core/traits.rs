use std::path::PathBuf;
use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;
use super::errors::Result;
use super::types::Headers;

/// Everything the transport needs to start one file transfer.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub address: Url,
    pub local_path: PathBuf,
    pub method: Method,
    pub headers: Headers,
}

/// Raw progress event emitted by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

/// Sending half of an operation's progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: UnboundedSender<TransportProgress>,
}

impl ProgressSink {
    pub(crate) fn new(tx: UnboundedSender<TransportProgress>) -> Self {
        Self { tx }
    }

    /// Reports progress. Events sent after the client stopped listening are
    /// dropped.
    pub fn report(&self, bytes_transferred: u64, total_bytes: u64) {
        let _ = self.tx.send(TransportProgress {
            bytes_transferred,
            total_bytes,
        });
    }
}

/// File transfer facility driven by [`TransferClient`](super::TransferClient).
///
/// A transfer reports zero or more progress events through the sink and
/// completes exactly once by returning: `Ok(())` is a clean completion and
/// `Err` is a completion carrying the failure. Path and permission problems
/// belong in that `Err`, not in a panic.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn upload_file(&self, request: TransportRequest, progress: ProgressSink) -> Result<()>;

    async fn download_file(&self, request: TransportRequest, progress: ProgressSink) -> Result<()>;
}
