pub mod config;
pub mod core;
pub mod transport;

pub use config::ClientConfig;
pub use core::{
    Direction,
    Headers,
    ProgressCallback,
    ProgressSink,
    Result,
    TransferClient,
    TransferError,
    TransferHandle,
    TransferId,
    TransferRequest,
    TransferResult,
    Transport,
    TransportProgress,
    TransportRequest,
};
pub use transport::HttpTransport;

#[cfg(test)]
mod tests;
