//! A cancellable, single-consumer stream of text fragments produced
//! by a streaming model response.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::Result;
use futures::Stream;
use futures::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::decoder::OutputDecoder;

pub struct FragmentStream {
    inner: BoxStream<'static, Result<String>>,
    cancel: CancellationToken,
}

impl FragmentStream {
    pub fn new(inner: BoxStream<'static, Result<String>>) -> Self {
        let cancel = CancellationToken::new();
        Self::with_token(inner, cancel)
    }

    fn with_token(inner: BoxStream<'static, Result<String>>, cancel: CancellationToken) -> Self {
        // Ends the stream as soon as the token fires, even while the
        // inner stream is waiting on the network.
        let inner = inner
            .take_until(cancel.clone().cancelled_owned())
            .boxed();
        Self { inner, cancel }
    }

    /// Build a stream from fragments that are already in memory.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Result<String>> = fragments.into_iter().map(|f| Ok(f.into())).collect();
        Self::new(stream::iter(items).boxed())
    }

    /// Stop the stream. Any fragment not yet delivered is discarded and
    /// the next poll returns `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle that can cancel this stream from elsewhere.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Hand cancellation over to `cancel`, so whoever owns that token
    /// can stop the stream.
    pub fn with_cancel(self, cancel: CancellationToken) -> Self {
        Self::with_token(self.inner, cancel)
    }

    /// Run every fragment through `decoder`, keeping the same
    /// cancellation handle.
    pub fn decoded(self, decoder: Arc<dyn OutputDecoder>) -> Self {
        let inner = self
            .inner
            .map(move |fragment| fragment.map(|f| decoder.decode(&f)))
            .boxed();
        Self {
            inner,
            cancel: self.cancel,
        }
    }
}

impl Stream for FragmentStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::decoder::StringDecoder;
    use anyhow::anyhow;
    use std::time::Duration;

    #[tokio::test]
    async fn it_yields_fragments_in_order() {
        let stream = FragmentStream::from_fragments(["a", "b", "c"]);
        let out: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn it_stops_after_cancel() {
        let mut stream = FragmentStream::from_fragments(["a", "b", "c"]);
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn it_wakes_a_pending_consumer_on_cancel() {
        let mut stream = FragmentStream::new(stream::pending::<Result<String>>().boxed());
        let handle = stream.cancel_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let next = tokio::time::timeout(Duration::from_secs(5), stream.next()).await;
        assert!(next.unwrap().is_none());
    }

    #[tokio::test]
    async fn it_passes_errors_through() {
        let items: Vec<Result<String>> = vec![Ok("a".to_string()), Err(anyhow!("boom"))];
        let mut stream = FragmentStream::new(stream::iter(items).boxed());
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn decoding_keeps_the_cancel_handle() {
        let stream = FragmentStream::from_fragments(["x", "y"]);
        let handle = stream.cancel_handle();
        let mut stream = stream.decoded(Arc::new(StringDecoder));
        assert_eq!(stream.next().await.unwrap().unwrap(), "x");
        handle.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn it_follows_an_external_token() {
        let cancel = CancellationToken::new();
        let mut stream = FragmentStream::from_fragments(["a", "b"]).with_cancel(cancel.clone());
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        cancel.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().await.is_none());
    }
}
