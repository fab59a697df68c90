use reqwest::StatusCode;
use super::errors::TransferError;

/// Snapshot of a transfer, produced on every progress tick and once more as
/// the terminal outcome.
///
/// Only the client builds these. When [`error`](Self::error) is set, the
/// byte counters are whatever the client last saw and should be treated as
/// indeterminate.
#[derive(Debug)]
pub struct TransferResult<C> {
    status_code: StatusCode,
    bytes_completed: u64,
    total_bytes: u64,
    context: C,
    error: Option<TransferError>,
}

impl<C> TransferResult<C> {
    pub(crate) fn progress(bytes_completed: u64, total_bytes: u64, context: C) -> Self {
        Self {
            status_code: StatusCode::OK,
            bytes_completed,
            total_bytes,
            context,
            error: None,
        }
    }

    pub(crate) fn completed(
        status_code: StatusCode,
        bytes: u64,
        context: C,
        error: Option<TransferError>,
    ) -> Self {
        Self {
            status_code,
            bytes_completed: bytes,
            total_bytes: bytes,
            context,
            error,
        }
    }

    /// `200 OK` while in flight and on success, the recovered status on
    /// failure.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn bytes_completed(&self) -> u64 {
        self.bytes_completed
    }

    /// Bytes the transport expects to move, protocol overhead included.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<TransferError> {
        self.error
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
