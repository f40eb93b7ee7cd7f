use bytes::Buf;
use futures::Stream;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub type BytesTransferred = u64;
pub type Monitor = mpsc::UnboundedReceiver<BytesTransferred>;
type Reporter = mpsc::UnboundedSender<BytesTransferred>;

/// Passes a byte stream through unchanged, reporting the size of every chunk.
/// The monitor side closes once the stream is dropped.
#[pin_project]
pub struct MonitoredStream<S> {
    #[pin]
    stream: S,
    reporter: Reporter,
}

impl<S: Stream> MonitoredStream<S> {
    pub fn new(stream: S) -> (Self, Monitor) {
        let (reporter, monitor) = mpsc::unbounded_channel();

        (Self { stream, reporter }, monitor)
    }
}

impl<S, B, E> Stream for MonitoredStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: Buf,
    E: std::error::Error,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.stream.poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                // Nobody listening is fine, progress is optional.
                let _ = this.reporter.send(bytes.remaining() as BytesTransferred);
                Poll::Ready(Some(Ok(bytes)))
            }
            poll => poll,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::{stream, StreamExt};
    use std::io;

    #[tokio::test]
    async fn reports_every_chunk() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"")),
            Ok(Bytes::from_static(b"defgh")),
        ];
        let (monitored, mut monitor) = MonitoredStream::new(stream::iter(chunks));

        let passed: Vec<_> = monitored.map(Result::unwrap).collect().await;
        assert_eq!(passed.concat(), b"abcdefgh");

        let mut reported = Vec::new();
        while let Some(n) = monitor.recv().await {
            reported.push(n);
        }
        assert_eq!(reported, vec![3, 0, 5]);
    }

    #[tokio::test]
    async fn errors_pass_through_unreported() {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ok")),
            Err(io::Error::new(io::ErrorKind::Other, "boom")),
        ];
        let (monitored, mut monitor) = MonitoredStream::new(stream::iter(chunks));

        let results: Vec<_> = monitored.collect().await;
        assert!(results[0].is_ok());
        assert!(results[1].is_err());

        assert_eq!(monitor.recv().await, Some(2));
        assert_eq!(monitor.recv().await, None);
    }
}
