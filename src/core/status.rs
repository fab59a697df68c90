use reqwest::StatusCode;
use super::errors::TransferError;

/// Recovers an HTTP status from a failed transfer.
///
/// Failures that never got a response (connect, DNS, timeout, local IO) map
/// to `500 Internal Server Error`; the client cannot tell "no status" from
/// "no server".
pub fn recover_status(error: &TransferError) -> StatusCode {
    let status = match error {
        TransferError::ServerError { status_code, .. } => StatusCode::from_u16(*status_code).ok(),
        TransferError::Http(err) => err.status(),
        _ => None,
    };

    status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
