mod client;
mod errors;
mod request;
mod response;
mod status;
mod traits;
mod types;

pub use client::{TransferClient, TransferHandle};
pub use errors::{Result, TransferError};
pub use request::{ProgressCallback, TransferRequest};
pub use response::TransferResult;
pub use status::recover_status;
pub use traits::{ProgressSink, Transport, TransportProgress, TransportRequest};
pub use types::{Direction, Headers, TransferId};
