//! Throttled transfer.
//!
//! Reads one chunk, hands it to the sink, records progress, then waits one
//! interval before the next read. No wait follows the final chunk, so a
//! transfer of N chunks takes roughly `(N - 1) * interval` plus I/O time.
//! The wait races the shutdown signal when one is supplied.

use std::io;
use std::time::Instant;

use axum::body::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::store::Resource;
use crate::transfer::{ProgressObserver, ThrottleSettings, TransferOptions, TransferOutcome, TransferSession};

struct ThrottledTransfer {
    name: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    session: TransferSession,
    shutdown: Option<ShutdownSignal>,
    observer: Option<ProgressObserver>,
    started: Instant,
    outcome: Option<TransferOutcome>,
}

impl ThrottledTransfer {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        if self.outcome.is_some() {
            return None;
        }
        if self.session.is_complete() {
            self.finish(TransferOutcome::Completed);
            return None;
        }
        if self.session.chunks_sent() > 0 && !self.pause().await {
            self.finish(TransferOutcome::Cancelled);
            return None;
        }

        let want = self.session.next_read_len();
        let mut buf = Vec::with_capacity(want);
        match (&mut self.reader).take(want as u64).read_to_end(&mut buf).await {
            Ok(0) => {
                tracing::error!(
                    name = %self.name,
                    bytes_sent = self.session.bytes_sent(),
                    total = self.session.total(),
                    "Resource ended before its declared size"
                );
                self.finish(TransferOutcome::Truncated);
                None
            }
            Ok(n) => {
                self.session.record(n);
                self.observe(n);
                Some(Bytes::from(buf))
            }
            Err(e) => {
                tracing::error!(
                    name = %self.name,
                    bytes_sent = self.session.bytes_sent(),
                    error = %e,
                    "Error reading resource"
                );
                self.finish(TransferOutcome::Truncated);
                None
            }
        }
    }

    /// Wait one interval. Returns false if shutdown was requested first.
    async fn pause(&mut self) -> bool {
        let interval = self.session.interval();
        match self.shutdown.as_mut() {
            Some(signal) => tokio::select! {
                _ = tokio::time::sleep(interval) => true,
                _ = signal.wait() => false,
            },
            None => {
                tokio::time::sleep(interval).await;
                true
            }
        }
    }

    fn observe(&self, chunk_len: usize) {
        let progress = self.session.progress(&self.name);
        tracing::info!(
            name = %progress.name,
            chunk = chunk_len,
            bytes_sent = progress.bytes_sent,
            total = progress.total,
            percent = format_args!("{:.1}", progress.percent),
            "Transfer progress"
        );
        metrics::record_bytes_sent("throttled", chunk_len);
        if let Some(observer) = &self.observer {
            observer(&progress);
        }
    }

    fn finish(&mut self, outcome: TransferOutcome) {
        self.outcome = Some(outcome);
        tracing::info!(
            name = %self.name,
            bytes_sent = self.session.bytes_sent(),
            chunks = self.session.chunks_sent(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            outcome = %outcome,
            "Throttled transfer finished"
        );
        metrics::record_transfer_finished("throttled", outcome);
    }
}

impl Drop for ThrottledTransfer {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.finish(TransferOutcome::Abandoned);
        }
    }
}

/// Stream `resource` in chunks of `settings.chunk_size`, one per interval.
pub fn throttled_body(
    resource: Resource,
    settings: ThrottleSettings,
    options: TransferOptions,
) -> BoxStream<'static, io::Result<Bytes>> {
    metrics::record_transfer_started("throttled");
    let session = TransferSession::new(resource.size, settings);
    tracing::debug!(
        name = %resource.name,
        total = resource.size,
        chunk_size = session.chunk_size(),
        chunks = session.expected_chunks(),
        interval_ms = settings.interval.as_millis() as u64,
        target_bytes_per_sec = settings.target_rate() as u64,
        "Starting throttled transfer"
    );

    let transfer = ThrottledTransfer {
        name: resource.name,
        reader: resource.reader,
        session,
        shutdown: options.shutdown,
        observer: options.observer,
        started: Instant::now(),
        outcome: None,
    };

    stream::unfold(transfer, |mut transfer| async move {
        let chunk = transfer.next_chunk().await?;
        Some((Ok(chunk), transfer))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::transfer::TransferProgress;
    use futures_util::TryStreamExt;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn settings(chunk_size: usize, interval_ms: u64) -> ThrottleSettings {
        ThrottleSettings {
            chunk_size,
            interval: Duration::from_millis(interval_ms),
        }
    }

    fn resource(content: &[u8]) -> Resource {
        Resource::new("a.bin", content.len() as u64, Cursor::new(content.to_vec()))
    }

    async fn chunk_sizes(content: &[u8], chunk_size: usize) -> Vec<usize> {
        let body = throttled_body(resource(content), settings(chunk_size, 10), TransferOptions::default());
        let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
        chunks.iter().map(Bytes::len).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn ten_bytes_in_chunks_of_four() {
        assert_eq!(chunk_sizes(b"0123456789", 4).await, vec![4, 4, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_resource_completes_immediately() {
        let started = tokio::time::Instant::now();
        assert!(chunk_sizes(b"", 4).await.is_empty());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_covering_resource_is_single_write() {
        assert_eq!(chunk_sizes(b"0123456789", 10).await, vec![10]);
        assert_eq!(chunk_sizes(b"0123456789", 4096).await, vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_count_matches_ceiling() {
        let content: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        for chunk_size in [1, 3, 7, 100, 999, 1000] {
            let sizes = chunk_sizes(&content, chunk_size).await;
            let expected = content.len().div_ceil(chunk_size);
            assert_eq!(sizes.len(), expected, "chunk size {chunk_size}");
            assert_eq!(sizes.iter().sum::<usize>(), content.len());
            assert_eq!(
                *sizes.last().unwrap(),
                content.len() - chunk_size * (expected - 1)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_chunks_only() {
        let started = tokio::time::Instant::now();
        let body = throttled_body(resource(b"0123456789"), settings(4, 500), TransferOptions::default());
        let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_reported_per_chunk() {
        let seen: Arc<Mutex<Vec<TransferProgress>>> = Arc::default();
        let sink = seen.clone();
        let options = TransferOptions {
            shutdown: None,
            observer: Some(Arc::new(move |p: &TransferProgress| {
                sink.lock().unwrap().push(p.clone())
            })),
        };

        let body = throttled_body(resource(b"0123456789"), settings(4, 10), options);
        let _: Vec<Bytes> = body.try_collect().await.unwrap();

        let seen = seen.lock().unwrap();
        let sent: Vec<u64> = seen.iter().map(|p| p.bytes_sent).collect();
        assert_eq!(sent, vec![4, 8, 10]);
        assert_eq!(seen[0].percent, 40.0);
        assert_eq!(seen[2].percent, 100.0);
        assert!(seen.iter().all(|p| p.total == 10 && p.name == "a.bin"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_at_next_chunk_boundary() {
        let shutdown = Shutdown::new();
        let options = TransferOptions {
            shutdown: Some(shutdown.subscribe()),
            observer: None,
        };
        let mut body = throttled_body(resource(b"0123456789"), settings(4, 1000), options);

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 4);

        let started = tokio::time::Instant::now();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.trigger();
        });
        assert!(body.next().await.is_none());
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_truncates() {
        let reader = Cursor::new(b"abcd".to_vec()).chain(Failing);
        let body = throttled_body(
            Resource::new("broken", 12, reader),
            settings(4, 10),
            TransferOptions::default(),
        );
        let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"abcd");
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_declared_size() {
        let body = throttled_body(
            Resource::new("grown", 6, Cursor::new(b"0123456789".to_vec())),
            settings(4, 10),
            TransferOptions::default(),
        );
        let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
        assert_eq!(chunks.iter().map(Bytes::len).collect::<Vec<_>>(), vec![4, 2]);
    }

    struct Failing;

    impl AsyncRead for Failing {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::other("disk gone")))
        }
    }
}
