use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use crate::core::ProgressSink;

pin_project! {
    /// Byte stream that reports the running byte count to a [`ProgressSink`]
    /// for every non-empty chunk it yields.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        sink: ProgressSink,
        transferred: u64,
        total_bytes: Option<u64>,
    }
}

impl<S> ProgressStream<S> {
    /// `total_bytes` of `None` means the length is unknown; the running count
    /// is reported as the total in that case.
    pub fn new(inner: S, sink: ProgressSink, total_bytes: Option<u64>) -> Self {
        Self {
            inner,
            sink,
            transferred: 0,
            total_bytes,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.transferred += chunk.len() as u64;
                    let total = this.total_bytes.unwrap_or(*this.transferred);
                    this.sink.report(*this.transferred, total);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
