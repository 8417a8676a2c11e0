//! Throttled transfer accounting.

use std::time::Duration;

use crate::transfer::ThrottleSettings;

/// Progress observation emitted after each chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub name: String,
    pub bytes_sent: u64,
    pub total: u64,
    pub percent: f64,
}

/// Byte accounting for one throttled transfer.
///
/// `bytes_sent` never decreases and never exceeds `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    bytes_sent: u64,
    total: u64,
    chunk_size: usize,
    interval: Duration,
    chunks_sent: u64,
}

impl TransferSession {
    pub fn new(total: u64, settings: ThrottleSettings) -> Self {
        Self {
            bytes_sent: 0,
            total,
            chunk_size: settings.chunk_size.max(1),
            interval: settings.interval,
            chunks_sent: 0,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    pub fn remaining(&self) -> u64 {
        self.total - self.bytes_sent
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_sent == self.total
    }

    /// Bytes to request for the next chunk.
    pub fn next_read_len(&self) -> usize {
        self.remaining().min(self.chunk_size as u64) as usize
    }

    /// Number of chunks a complete transfer takes.
    pub fn expected_chunks(&self) -> u64 {
        self.total.div_ceil(self.chunk_size as u64)
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.bytes_sent as f64 / self.total as f64 * 100.0
        }
    }

    /// Account for a chunk of `len` bytes. Lengths past the total are clamped.
    pub fn record(&mut self, len: usize) {
        self.bytes_sent = (self.bytes_sent + len as u64).min(self.total);
        self.chunks_sent += 1;
    }

    pub fn progress(&self, name: &str) -> TransferProgress {
        TransferProgress {
            name: name.to_string(),
            bytes_sent: self.bytes_sent,
            total: self.total,
            percent: self.percent(),
        }
    }
}
