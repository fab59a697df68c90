use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use parking_lot::{Mutex, RwLock};
use reqwest::{Method, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::config::ClientConfig;
use crate::transport::HttpTransport;
use super::errors::{Result, TransferError};
use super::request::TransferRequest;
use super::response::TransferResult;
use super::status::recover_status;
use super::traits::{ProgressSink, Transport, TransportProgress, TransportRequest};
use super::types::{Direction, Headers, TransferId};

/// Awaitable terminal outcome of one transfer.
///
/// Resolves to `Ok` for both success and transport failure (check
/// [`TransferResult::error`]), to `Err(TransferError::Superseded)` when a
/// newer call in the same direction replaced it, and to
/// `Err(TransferError::Closed)` when the client was closed first.
#[derive(Debug)]
#[must_use = "a transfer handle does nothing unless awaited"]
pub struct TransferHandle<C> {
    id: TransferId,
    direction: Direction,
    rx: oneshot::Receiver<Result<TransferResult<C>>>,
}

impl<C> TransferHandle<C> {
    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl<C> Future for TransferHandle<C> {
    type Output = Result<TransferResult<C>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TransferError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The outstanding operation of one direction: its completion source plus
/// the token that detaches its listeners.
struct Pending<C> {
    id: TransferId,
    reply: oneshot::Sender<Result<TransferResult<C>>>,
    token: CancellationToken,
}

impl<C> Pending<C> {
    fn resolve(self, outcome: Result<TransferResult<C>>) {
        self.token.cancel();
        // The caller may have dropped the handle.
        let _ = self.reply.send(outcome);
    }
}

struct Slot<C> {
    pending: Option<Pending<C>>,
    /// Last total reported by a progress event. Never reset between
    /// operations; the terminal result reuses it.
    total_bytes: u64,
}

impl<C> Slot<C> {
    fn is_current(&self, id: TransferId) -> bool {
        self.pending.as_ref().is_some_and(|p| p.id == id)
    }

    fn take_if_current(&mut self, id: TransferId) -> Option<Pending<C>> {
        if self.is_current(id) {
            self.pending.take()
        } else {
            None
        }
    }
}

struct Shared<C, T> {
    transport: RwLock<Option<Arc<T>>>,
    headers: Mutex<Headers>,
    slots: [Mutex<Slot<C>>; 2],
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<C, T> Shared<C, T> {
    fn slot(&self, direction: Direction) -> &Mutex<Slot<C>> {
        &self.slots[direction.index()]
    }
}

/// Typed correlation record carried by an operation's dispatch task.
struct Correlation<C> {
    request: Arc<TransferRequest<C>>,
    context: C,
}

/// Turns a transport's progress/completion signals into a single awaitable
/// result, one outstanding transfer per direction.
///
/// Starting a transfer while another one in the same direction is pending
/// supersedes the older one: its handle resolves as
/// [`TransferError::Superseded`] and its background transfer is dropped.
/// Uploads and downloads use independent slots and can overlap.
///
/// Progress callbacks run on the operation's dispatch task. A callback that
/// panics takes that task down with it; the handle then stays pending until
/// the slot is superseded or the client is closed.
///
/// Methods spawn onto the current Tokio runtime and must be called from
/// within one.
pub struct TransferClient<C, T = HttpTransport> {
    shared: Arc<Shared<C, T>>,
    upload_method: Method,
}

impl<C> TransferClient<C, HttpTransport>
where
    C: Clone + Send + Sync + 'static,
{
    /// Client backed by a `reqwest` transport built from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_config(transport, config)
    }
}

impl<C, T> TransferClient<C, T>
where
    C: Clone + Send + Sync + 'static,
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        Self::build(transport, Method::POST)
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Result<Self> {
        let upload_method = config.upload_method()?;
        Ok(Self::build(transport, upload_method))
    }

    fn build(transport: T, upload_method: Method) -> Self {
        let shared = Shared {
            transport: RwLock::new(Some(Arc::new(transport))),
            headers: Mutex::new(Headers::new()),
            slots: [
                Mutex::new(Slot { pending: None, total_bytes: 0 }),
                Mutex::new(Slot { pending: None, total_bytes: 0 }),
            ],
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        };

        Self {
            shared: Arc::new(shared),
            upload_method,
        }
    }

    /// Uploads `local_path` to the request address with the configured
    /// upload method. `context` comes back on every progress tick and on
    /// the terminal result.
    pub fn upload_file(
        &self,
        request: impl Into<Arc<TransferRequest<C>>>,
        local_path: impl Into<PathBuf>,
        context: C,
    ) -> TransferHandle<C> {
        let method = self.upload_method.clone();
        self.start(Direction::Upload, request.into(), local_path.into(), method, context)
    }

    pub fn upload_file_with_method(
        &self,
        request: impl Into<Arc<TransferRequest<C>>>,
        local_path: impl Into<PathBuf>,
        method: Method,
        context: C,
    ) -> TransferHandle<C> {
        self.start(Direction::Upload, request.into(), local_path.into(), method, context)
    }

    /// Downloads the request address into `local_path`.
    pub fn download_file(
        &self,
        request: impl Into<Arc<TransferRequest<C>>>,
        local_path: impl Into<PathBuf>,
        context: C,
    ) -> TransferHandle<C> {
        self.start(Direction::Download, request.into(), local_path.into(), Method::GET, context)
    }

    fn start(
        &self,
        direction: Direction,
        request: Arc<TransferRequest<C>>,
        local_path: PathBuf,
        method: Method,
        context: C,
    ) -> TransferHandle<C> {
        let id = TransferId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();
        let handle = TransferHandle { id, direction, rx: reply_rx };
        let token = CancellationToken::new();

        let transport = {
            let mut slot = self.shared.slot(direction).lock();

            // Checked under the slot lock so `close` cannot miss this entry.
            let transport = match self.shared.transport.read().clone() {
                Some(transport) if !self.is_closed() => transport,
                _ => {
                    let _ = reply_tx.send(Err(TransferError::Closed));
                    return handle;
                }
            };

            let next = Pending { id, reply: reply_tx, token: token.clone() };
            if let Some(previous) = slot.pending.replace(next) {
                debug!(%direction, superseded = %previous.id, by = %id, "Transfer superseded");
                previous.resolve(Err(TransferError::Superseded));
            }

            transport
        };

        let headers = request.headers().clone();
        *self.shared.headers.lock() = headers.clone();

        let transport_request = TransportRequest {
            address: request.address().clone(),
            local_path,
            method,
            headers,
        };

        debug!(
            %direction,
            %id,
            address = %transport_request.address,
            path = %transport_request.local_path.display(),
            "Transfer started"
        );

        let operation = Operation {
            shared: self.shared.clone(),
            direction,
            id,
            token,
            correlation: Correlation { request, context },
        };
        tokio::spawn(operation.run(transport, transport_request));

        handle
    }
}

impl<C, T> TransferClient<C, T> {
    /// Headers sent with the most recent transfer.
    pub fn headers(&self) -> Headers {
        self.shared.headers.lock().clone()
    }

    /// Whether progress/completion listeners are attached for `direction`.
    pub fn is_listening(&self, direction: Direction) -> bool {
        self.shared.slot(direction).lock().pending.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Detaches all listeners, resolves pending handles as
    /// [`TransferError::Closed`] and releases the transport. Safe to call
    /// more than once.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        for direction in [Direction::Upload, Direction::Download] {
            let pending = self.shared.slot(direction).lock().pending.take();
            if let Some(pending) = pending {
                debug!(%direction, id = %pending.id, "Closing pending transfer");
                pending.resolve(Err(TransferError::Closed));
            }
        }

        self.shared.transport.write().take();
        debug!("Transfer client closed");
    }
}

impl<C, T> Drop for TransferClient<C, T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Dispatch task of a single transfer: drives the transport, forwards its
/// progress and resolves the slot on completion.
struct Operation<C, T> {
    shared: Arc<Shared<C, T>>,
    direction: Direction,
    id: TransferId,
    token: CancellationToken,
    correlation: Correlation<C>,
}

impl<C, T> Operation<C, T>
where
    C: Clone + Send + Sync + 'static,
    T: Transport,
{
    async fn run(self, transport: Arc<T>, request: TransportRequest) {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(progress_tx);

        let mut transfer = match self.direction {
            Direction::Upload => transport.upload_file(request, sink),
            Direction::Download => transport.download_file(request, sink),
        };

        let outcome = loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    debug!(direction = %self.direction, id = %self.id, "Transfer dropped");
                    return;
                }
                Some(progress) = progress_rx.recv() => self.on_progress(progress),
                outcome = &mut transfer => break outcome,
            }
        };
        drop(transfer);

        // Progress reported right before completion still goes out first.
        while let Ok(progress) = progress_rx.try_recv() {
            self.on_progress(progress);
        }

        self.on_completed(outcome);
    }

    fn on_progress(&self, progress: TransportProgress) {
        {
            let mut slot = self.shared.slot(self.direction).lock();
            if !slot.is_current(self.id) {
                return;
            }
            slot.total_bytes = progress.total_bytes;
        }

        let result = TransferResult::progress(
            progress.bytes_transferred,
            progress.total_bytes,
            self.correlation.context.clone(),
        );
        self.correlation.request.notify(result);
    }

    fn on_completed(self, outcome: Result<()>) {
        let (pending, bytes) = {
            let mut slot = self.shared.slot(self.direction).lock();
            match slot.take_if_current(self.id) {
                Some(pending) => (pending, slot.total_bytes),
                // Already superseded or closed.
                None => return,
            }
        };

        let (status_code, error) = match outcome {
            Ok(()) => {
                debug!(direction = %self.direction, id = %self.id, bytes, "Transfer completed");
                (StatusCode::OK, None)
            }
            Err(err) => {
                let status_code = recover_status(&err);
                warn!(
                    direction = %self.direction,
                    id = %self.id,
                    status = %status_code,
                    error = %err,
                    "Transfer failed"
                );
                (status_code, Some(err))
            }
        };

        let result = TransferResult::completed(status_code, bytes, self.correlation.context, error);
        pending.resolve(Ok(result));
    }
}
