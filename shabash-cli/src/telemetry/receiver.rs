//! Telemetry socket thread.
//!
//! Connects to the ground station, parses newline-delimited JSON and keeps
//! two views of the stream:
//! - the latest snapshot, behind a mutex, for status display
//! - a bounded queue for the recorder; when full the oldest entry is dropped

use std::io::{BufRead, BufReader, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::messages::TelemetrySnapshot;
use crate::error::{Error, Result};

/// Read timeout so the thread notices shutdown
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared state between the socket thread and its consumers
#[derive(Clone)]
pub struct TelemetryChannel {
    latest: Arc<Mutex<Option<TelemetrySnapshot>>>,
    queue: Arc<ArrayQueue<TelemetrySnapshot>>,
}

impl TelemetryChannel {
    /// Create a channel whose queue holds `capacity` snapshots
    pub fn new(capacity: usize) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            queue: Arc::new(ArrayQueue::new(capacity)),
        }
    }

    /// Publish a snapshot, evicting the oldest queued one if full
    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        *self.latest.lock() = Some(snapshot.clone());
        if self.queue.force_push(snapshot).is_some() {
            debug!("Telemetry queue full, dropped oldest snapshot");
        }
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.latest.lock().clone()
    }

    /// Next queued snapshot
    pub fn pop(&self) -> Option<TelemetrySnapshot> {
        self.queue.pop()
    }

    /// Queued snapshots
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Counters reported when the socket thread exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Telemetry snapshots published
    pub snapshots: u64,
    /// Lines of another message type
    pub ignored: u64,
    /// Lines that failed to parse
    pub malformed: u64,
}

/// Feed newline-delimited JSON from `reader` into `channel` until EOF or shutdown.
///
/// Read timeouts are retried; bytes of a partial line survive them.
pub fn receive_lines<R: BufRead>(
    mut reader: R,
    channel: &TelemetryChannel,
    running: &AtomicBool,
) -> std::io::Result<ReceiveStats> {
    let mut stats = ReceiveStats::default();
    let mut line = String::new();

    while running.load(Ordering::Relaxed) {
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("Telemetry stream ended");
                break;
            }
            Ok(_) => {
                let text = line.trim();
                if !text.is_empty() {
                    match TelemetrySnapshot::parse_line(text) {
                        Ok(Some(snapshot)) => {
                            channel.publish(snapshot);
                            stats.snapshots += 1;
                        }
                        Ok(None) => stats.ignored += 1,
                        Err(e) => {
                            warn!("Malformed telemetry line: {}", e);
                            stats.malformed += 1;
                        }
                    }
                }
                line.clear();
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

/// Background thread reading telemetry from the ground station
pub struct TelemetryReceiver {
    channel: TelemetryChannel,
    thread: Option<JoinHandle<()>>,
}

impl TelemetryReceiver {
    /// Connect to `address` and start the socket thread.
    ///
    /// The thread clears `running` when the stream ends so the recorder
    /// stops with it.
    pub fn spawn(address: &str, capacity: usize, running: Arc<AtomicBool>) -> Result<Self> {
        let stream = TcpStream::connect(address).map_err(|e| {
            Error::Connection(format!("{} ({}); is telemetry streaming on?", address, e))
        })?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        info!("Connected to telemetry at {}", address);

        let channel = TelemetryChannel::new(capacity);
        let thread_channel = channel.clone();
        let thread = thread::Builder::new()
            .name("telemetry-rx".to_string())
            .spawn(move || {
                match receive_lines(BufReader::new(stream), &thread_channel, &running) {
                    Ok(stats) => info!(
                        "Telemetry thread exiting ({} snapshots, {} ignored, {} malformed)",
                        stats.snapshots, stats.ignored, stats.malformed
                    ),
                    Err(e) => log::error!("Telemetry thread error: {}", e),
                }
                running.store(false, Ordering::Relaxed);
            })?;

        Ok(Self {
            channel,
            thread: Some(thread),
        })
    }

    /// Shared channel
    pub fn channel(&self) -> &TelemetryChannel {
        &self.channel
    }

    /// Wait for the socket thread to finish
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("Telemetry thread panicked");
        }
    }
}
