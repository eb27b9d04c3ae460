//! Live telemetry recording.
//!
//! ```text
//! ground station ──TCP──► telemetry-rx thread ──► latest (Mutex)
//!                                    │
//!                                    └──► ArrayQueue(2) ──► recorder ──► csvs/<name>.csv
//! ```
//!
//! Both sides stop when the shared running flag clears, either from Ctrl-C
//! or because the stream ended.

mod messages;
mod receiver;
mod recorder;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;

use receiver::{TelemetryChannel, TelemetryReceiver};
use recorder::CsvRecorder;

/// Recorder settings
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Telemetry port on localhost
    pub port: u16,
    /// Directory for recorded files
    pub output_dir: PathBuf,
    /// File name stem
    pub base_name: String,
    /// Snapshots buffered between the threads
    pub queue_capacity: usize,
    /// Interval between status log lines
    pub status_interval: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            port: 44000,
            output_dir: PathBuf::from("csvs"),
            base_name: "rssi".to_string(),
            queue_capacity: 2,
            status_interval: Duration::from_secs(5),
        }
    }
}

/// Drain `channel` into `recorder` until `running` clears and the queue is empty.
pub fn drain_into<W: Write>(
    channel: &TelemetryChannel,
    recorder: &mut CsvRecorder<W>,
    running: &AtomicBool,
    status_interval: Duration,
) -> Result<()> {
    let mut last_status = Instant::now();
    loop {
        match channel.pop() {
            Some(snapshot) => {
                recorder.record(&snapshot)?;
            }
            None if !running.load(Ordering::Relaxed) && channel.is_empty() => break,
            None => thread::sleep(Duration::from_millis(10)),
        }

        if last_status.elapsed() >= status_interval {
            if let Some(latest) = channel.latest() {
                log::info!(
                    "Recorded {} rows ({} queued); at lat {:?} lon {:?} asl {:?}, downlink {:?}%",
                    recorder.rows(),
                    channel.len(),
                    latest.lat,
                    latest.lon,
                    latest.above_sea_level,
                    latest.down_link_percent
                );
            }
            last_status = Instant::now();
        }
    }
    Ok(())
}

/// Record telemetry from `127.0.0.1:<port>` until `running` clears.
///
/// Returns the path of the written file.
pub fn record(config: &RecorderConfig, running: Arc<AtomicBool>) -> Result<PathBuf> {
    let address = format!("127.0.0.1:{}", config.port);
    let receiver = TelemetryReceiver::spawn(&address, config.queue_capacity, running.clone())?;

    let (mut recorder, path) = CsvRecorder::create(&config.output_dir, &config.base_name)?;
    log::info!("Recording telemetry to {}", path.display());

    let result = drain_into(
        receiver.channel(),
        &mut recorder,
        &running,
        config.status_interval,
    );

    // Stop the socket thread even if the recorder failed
    running.store(false, Ordering::Relaxed);
    receiver.join();

    result?;
    let rows = recorder.rows();
    recorder.into_inner()?;
    log::info!("Recorded {} rows to {}", rows, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::messages::{TELEMETRY_MESSAGE_TYPE, TelemetrySnapshot};

    #[test]
    fn test_drain_until_stopped() {
        let channel = TelemetryChannel::new(2);
        for time in [1, 1, 2] {
            channel.publish(TelemetrySnapshot {
                message_type: TELEMETRY_MESSAGE_TYPE.to_string(),
                video_nano_time: Some(time),
                ..Default::default()
            });
        }
        let mut recorder = CsvRecorder::new(Vec::new()).unwrap();
        let running = AtomicBool::new(false);

        drain_into(&channel, &mut recorder, &running, Duration::from_secs(60)).unwrap();

        // Queue held the last two (1, 2); both distinct from the start
        assert_eq!(recorder.rows(), 2);
        assert!(channel.is_empty());
    }
}
