//! CSV recorder for live telemetry.
//!
//! Rows use the same columns the CSV loader reads back:
//! `videoNanoTime, lat, lon, aboveSeaLevel, upLinkPercent, downLinkPercent, signalInterference`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::messages::TelemetrySnapshot;
use crate::error::{Error, Result};

/// Column order of recorded files
pub const CSV_COLUMNS: [&str; 7] = [
    "videoNanoTime",
    "lat",
    "lon",
    "aboveSeaLevel",
    "upLinkPercent",
    "downLinkPercent",
    "signalInterference",
];

/// First free path among `base.csv`, `base_v2.csv`, `base_v3.csv`, ...
pub fn unique_csv_path(dir: &Path, base: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.csv", base));
    let mut index = 1;
    while path.exists() {
        index += 1;
        path = dir.join(format!("{}_v{}.csv", base, index));
    }
    path
}

fn field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Appends telemetry snapshots as CSV rows
pub struct CsvRecorder<W: Write> {
    writer: csv::Writer<W>,
    last_video_nano_time: Option<u64>,
    rows: usize,
}

impl CsvRecorder<File> {
    /// Create `dir` if needed and open a fresh file named after `base`
    pub fn create(dir: &Path, base: &str) -> Result<(Self, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let path = unique_csv_path(dir, base);
        let recorder = Self::new(File::create(&path)?)?;
        Ok((recorder, path))
    }
}

impl<W: Write> CsvRecorder<W> {
    /// Wrap a writer and emit the header row
    pub fn new(writer: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(CSV_COLUMNS)?;
        writer.flush()?;
        Ok(Self {
            writer,
            last_video_nano_time: None,
            rows: 0,
        })
    }

    /// Append a snapshot. Returns false when skipped.
    ///
    /// A snapshot is skipped when its `videoNanoTime` equals the previous
    /// one, so snapshots without a timestamp are never written.
    pub fn record(&mut self, snapshot: &TelemetrySnapshot) -> Result<bool> {
        if snapshot.video_nano_time == self.last_video_nano_time {
            return Ok(false);
        }
        self.last_video_nano_time = snapshot.video_nano_time;

        let interference = match &snapshot.signal_interference {
            Some(value) => serde_json::to_string(value)?,
            None => String::new(),
        };
        self.writer.write_record([
            field(snapshot.video_nano_time),
            field(snapshot.lat),
            field(snapshot.lon),
            field(snapshot.above_sea_level),
            field(snapshot.up_link_percent),
            field(snapshot.down_link_percent),
            interference,
        ])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(true)
    }

    /// Rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CsvLoader;
    use serde_json::json;
    use shabash_core::config::{MetricSource, ProfileConfig};

    fn snapshot(time: Option<u64>, downlink: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            message_type: "telemetry".to_string(),
            video_nano_time: time,
            lat: Some(31.5),
            lon: Some(34.5),
            above_sea_level: Some(110.0),
            up_link_percent: Some(60.0),
            down_link_percent: Some(downlink),
            signal_interference: Some(json!([{"frequencyFrom": 2400, "rssi": -72}])),
        }
    }

    #[test]
    fn test_unique_path() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_csv_path(dir.path(), "rssi");
        assert_eq!(first, dir.path().join("rssi.csv"));

        File::create(&first).unwrap();
        let second = unique_csv_path(dir.path(), "rssi");
        assert_eq!(second, dir.path().join("rssi_v2.csv"));

        File::create(&second).unwrap();
        assert_eq!(
            unique_csv_path(dir.path(), "rssi"),
            dir.path().join("rssi_v3.csv")
        );
    }

    #[test]
    fn test_duplicate_times_skipped() {
        let mut recorder = CsvRecorder::new(Vec::new()).unwrap();
        assert!(!recorder.record(&snapshot(None, 90.0)).unwrap());
        assert!(recorder.record(&snapshot(Some(1), 90.0)).unwrap());
        assert!(!recorder.record(&snapshot(Some(1), 10.0)).unwrap());
        assert!(recorder.record(&snapshot(Some(2), 10.0)).unwrap());
        assert_eq!(recorder.rows(), 2);

        let text = String::from_utf8(recorder.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        assert!(lines.next().unwrap().starts_with("1,31.5,34.5,110,60,90,"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_recorded_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let (mut recorder, path) = CsvRecorder::create(&dir.path().join("csvs"), "pass").unwrap();
        recorder.record(&snapshot(Some(1), 90.0)).unwrap();
        recorder.record(&snapshot(Some(2), 15.0)).unwrap();
        drop(recorder);

        let profile = ProfileConfig {
            data: MetricSource::Rssi,
            ..Default::default()
        };
        let samples = CsvLoader::new(&profile)
            .read_samples(File::open(&path).unwrap(), "pass.csv", None, None)
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].metric, -72.0);
        assert_eq!(samples[0].position.z, 110.0);
    }
}
