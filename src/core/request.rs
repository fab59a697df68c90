use std::fmt;
use std::sync::Arc;
use reqwest::header::HeaderName;
use url::Url;
use super::errors::Result;
use super::response::TransferResult;
use super::types::Headers;

/// Progress sink for a single transfer.
///
/// Called synchronously from the operation's dispatch task, on whatever
/// runtime worker thread that task happens to run. A panic inside the
/// callback is not caught by the client.
pub type ProgressCallback<C> = Arc<dyn Fn(TransferResult<C>) + Send + Sync>;

/// Target address, headers and progress sink for one upload or download.
pub struct TransferRequest<C> {
    address: Url,
    headers: Headers,
    on_progress: ProgressCallback<C>,
}

impl<C> TransferRequest<C> {
    /// Parses `address`; a malformed string fails here, before any transfer
    /// is started.
    pub fn new(address: &str) -> Result<Self> {
        let address = Url::parse(address)?;

        Ok(Self {
            address,
            headers: Headers::new(),
            on_progress: Arc::new(|_| {}),
        })
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransferResult<C>) + Send + Sync + 'static,
    {
        self.on_progress = Arc::new(callback);
        self
    }

    /// Appends a header. Existing values for the same name are kept.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    /// Appends a well-known header such as `reqwest::header::AUTHORIZATION`.
    pub fn add_standard_header(&mut self, name: HeaderName, value: impl Into<String>) {
        self.headers.append(name.as_str(), value);
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub(crate) fn notify(&self, result: TransferResult<C>) {
        (self.on_progress)(result)
    }
}

impl<C> fmt::Debug for TransferRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("address", &self.address.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
