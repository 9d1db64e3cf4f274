//! Install progress events and the channel that carries them
//!
//! The worker performing an install is the producer; the presentation layer
//! (CLI progress bars) is the consumer. Events cross on a bounded tokio mpsc
//! channel owned per install — there is no process-wide signal bus.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use log::warn;
use tokio::sync::mpsc;

/// Capacity of the per-install event channel. Sized above the worst-case
/// deduplicated event volume of one install (a whole-percent step per phase
/// plus the terminal markers), so a stalled consumer does not overflow it.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Progress notifications for a single install, in guaranteed order:
/// download progress, download finished, extract progress, extract finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    DownloadProgress { bytes: u64, total: u64 },
    DownloadFinished,
    ExtractProgress { files: usize, total: usize },
    ExtractFinished,
}

/// Producer half of the progress channel.
///
/// Intermediate progress is deduplicated on the computed integer percentage
/// to bound event volume, and downgraded to best-effort once the consumer is
/// gone: a closed channel must never fail an install that is otherwise
/// succeeding.
pub struct ProgressSender {
    tx: mpsc::Sender<InstallEvent>,
    last_download_percent: AtomicI64,
    last_extract_percent: AtomicI64,
    disabled: AtomicBool,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<InstallEvent>) -> Self {
        Self {
            tx,
            last_download_percent: AtomicI64::new(-1),
            last_extract_percent: AtomicI64::new(-1),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn download_progress(&self, bytes: u64, total: u64) {
        self.progress_step(
            &self.last_download_percent,
            bytes,
            total,
            InstallEvent::DownloadProgress { bytes, total },
        );
    }

    /// Terminal marker of the download phase; waits for channel capacity
    /// rather than dropping.
    pub async fn download_finished(&self) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        if self.tx.send(InstallEvent::DownloadFinished).await.is_err() {
            warn!("progress channel closed, continuing without updates");
            self.disabled.store(true, Ordering::Relaxed);
        }
    }

    pub fn extract_progress(&self, files: usize, total: usize) {
        self.progress_step(
            &self.last_extract_percent,
            files as u64,
            total as u64,
            InstallEvent::ExtractProgress { files, total },
        );
    }

    /// Terminal marker of the extraction phase; waits for channel capacity
    /// rather than dropping. Runs on the extraction worker thread and must
    /// not be called from an async context.
    pub fn extract_finished(&self) {
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        if self.tx.blocking_send(InstallEvent::ExtractFinished).is_err() {
            warn!("progress channel closed, continuing without updates");
            self.disabled.store(true, Ordering::Relaxed);
        }
    }

    /// Forward `event` when the integer percentage advanced since the last
    /// delivered event. An unknown total (0) always forwards. The percentage
    /// is recorded only on delivery, so a step dropped by a full channel is
    /// retried on the next chunk instead of being lost.
    fn progress_step(&self, last: &AtomicI64, current: u64, total: u64, event: InstallEvent) {
        if total == 0 {
            self.send(event);
            return;
        }
        let percent = (current * 100 / total) as i64;
        if last.load(Ordering::Relaxed) == percent {
            return;
        }
        if self.send(event) {
            last.store(percent, Ordering::Relaxed);
        }
    }

    /// Best-effort delivery for intermediate progress. Returns whether the
    /// event reached the channel; a closed channel disables further sends.
    fn send(&self, event: InstallEvent) -> bool {
        if self.disabled.load(Ordering::Relaxed) {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => false,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("progress channel closed, continuing without updates");
                self.disabled.store(true, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Human-readable byte count: `0 -> "0B"`, `1024 -> "1.0 KB"`.
///
/// Rounds to two decimals, trims trailing zeros, and keeps at least one
/// decimal place for unit-scaled values.
pub fn format_bytes(size: u64) -> String {
    const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    if size == 0 {
        return "0B".to_string();
    }
    let exponent = ((size as f64).log(1024.0).floor() as usize).min(UNITS.len() - 1);
    let scaled = size as f64 / 1024f64.powi(exponent as i32);

    let mut number = format!("{scaled:.2}");
    while number.ends_with('0') {
        number.pop();
    }
    if number.ends_with('.') {
        number.push('0');
    }
    format!("{} {}", number, UNITS[exponent])
}
