//! Unthrottled transfer.

use std::io;
use std::time::Instant;

use axum::body::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, Take};

use crate::observability::metrics;
use crate::store::Resource;
use crate::transfer::TransferOutcome;

/// Read size for full-speed transfers.
pub const FULL_READ_SIZE: usize = 64 * 1024;

struct FullTransfer {
    name: String,
    size: u64,
    sent: u64,
    reader: Take<Box<dyn AsyncRead + Send + Unpin>>,
    started: Instant,
    outcome: Option<TransferOutcome>,
}

impl FullTransfer {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        if self.outcome.is_some() {
            return None;
        }

        let mut buf = Vec::with_capacity(FULL_READ_SIZE);
        match self.reader.read_buf(&mut buf).await {
            Ok(0) if self.sent == self.size => {
                self.finish(TransferOutcome::Completed);
                None
            }
            Ok(0) => {
                tracing::error!(
                    name = %self.name,
                    bytes_sent = self.sent,
                    total = self.size,
                    "Resource ended before its declared size"
                );
                self.finish(TransferOutcome::Truncated);
                None
            }
            Ok(n) => {
                self.sent += n as u64;
                metrics::record_bytes_sent("full", n);
                Some(Bytes::from(buf))
            }
            Err(e) => {
                tracing::error!(name = %self.name, bytes_sent = self.sent, error = %e, "Error reading resource");
                self.finish(TransferOutcome::Truncated);
                None
            }
        }
    }

    fn finish(&mut self, outcome: TransferOutcome) {
        self.outcome = Some(outcome);
        tracing::info!(
            name = %self.name,
            bytes_sent = self.sent,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            outcome = %outcome,
            "Full transfer finished"
        );
        metrics::record_transfer_finished("full", outcome);
    }
}

impl Drop for FullTransfer {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.finish(TransferOutcome::Abandoned);
        }
    }
}

/// Stream the whole resource as fast as the sink accepts it.
pub fn full_body(resource: Resource) -> BoxStream<'static, io::Result<Bytes>> {
    metrics::record_transfer_started("full");
    let Resource { name, size, reader } = resource;
    let transfer = FullTransfer {
        name,
        size,
        sent: 0,
        reader: reader.take(size),
        started: Instant::now(),
        outcome: None,
    };

    stream::unfold(transfer, |mut transfer| async move {
        let chunk = transfer.next_chunk().await?;
        Some((Ok(chunk), transfer))
    })
    .boxed()
}
