use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use crate::core::ProgressCallback;

/// Integer percent of `sent` out of `total`; an empty body counts as complete.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    ((sent.min(total) as u128 * 100) / total as u128) as u8
}

pin_project! {
    /// Wraps a body stream and reports integer percent as chunks are pulled.
    ///
    /// The callback fires only when the percent value changes.
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        total_bytes: u64,
        bytes_sent: u64,
        last_percent: Option<u8>,
        callback: ProgressCallback,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, total_bytes: u64, callback: ProgressCallback) -> Self {
        Self {
            inner,
            total_bytes,
            bytes_sent: 0,
            last_percent: None,
            callback,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.bytes_sent += chunk.len() as u64;
                    let percent = percent_of(*this.bytes_sent, *this.total_bytes);
                    if *this.last_percent != Some(percent) {
                        *this.last_percent = Some(percent);
                        (this.callback)(percent);
                    }
                }

                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
