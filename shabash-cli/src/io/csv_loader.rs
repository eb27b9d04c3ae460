//! Telemetry CSV ingestion.
//!
//! Each row holds one receiver fix. Position is `(lon, lat, aboveSeaLevel)`;
//! the metric column is picked by the profile's `data` setting.

use std::fs::File;
use std::io::Read;

use serde::Deserialize;
use shabash_core::config::{CsvFileSection, GraphSection, MetricSource, ProfileConfig};
use shabash_core::{Dataset, Point3, Sample};

use crate::error::{Error, Result};

/// One CSV row; extra columns are ignored
#[derive(Debug, Deserialize)]
struct TelemetryRow {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(rename = "aboveSeaLevel", default)]
    above_sea_level: Option<f64>,
    #[serde(rename = "upLinkPercent", default)]
    up_link_percent: Option<f64>,
    #[serde(rename = "downLinkPercent", default)]
    down_link_percent: Option<f64>,
    #[serde(rename = "signalInterference", default)]
    signal_interference: Option<String>,
}

/// One entry of the `signalInterference` list (`frequencyFrom` is ignored)
#[derive(Debug, Deserialize)]
struct InterferenceRecord {
    rssi: f64,
}

/// Strongest RSSI in a `signalInterference` field.
///
/// The field is written as a Python-style literal (single quotes, `None`),
/// so it is normalised to JSON before decoding. Returns `None` when the
/// list is empty.
pub fn strongest_rssi(field: &str) -> serde_json::Result<Option<f64>> {
    let normalised = field
        .replace('\'', "\"")
        .replace("None", "null")
        .replace("True", "true")
        .replace("False", "false");
    let records: Vec<InterferenceRecord> = serde_json::from_str(&normalised)?;
    Ok(records.iter().map(|r| r.rssi).reduce(f64::max))
}

/// Loads graphs from telemetry CSV files
pub struct CsvLoader<'a> {
    profile: &'a ProfileConfig,
}

impl<'a> CsvLoader<'a> {
    /// Create a loader for a profile
    pub fn new(profile: &'a ProfileConfig) -> Self {
        Self { profile }
    }

    /// Concatenate every file of a graph into one dataset
    pub fn load_graph(&self, graph: &GraphSection) -> Result<Dataset> {
        let mut samples = Vec::new();
        for section in &graph.files {
            let loaded = self.load_file(section)?;
            log::debug!(
                "Loaded {} samples from {}",
                loaded.len(),
                section.csv_file_path.display()
            );
            samples.extend(loaded);
        }
        log::info!("Graph '{}': {} samples", graph.title, samples.len());
        Ok(Dataset::new(graph.title.clone(), samples))
    }

    /// Samples from one file section
    pub fn load_file(&self, section: &CsvFileSection) -> Result<Vec<Sample>> {
        let file = File::open(&section.csv_file_path)?;
        let name = section.csv_file_path.display().to_string();
        self.read_samples(file, &name, section.start_row, section.end_row)
    }

    /// Samples from data rows `[start_row, end_row)` of a CSV stream
    pub fn read_samples<R: Read>(
        &self,
        reader: R,
        name: &str,
        start_row: Option<usize>,
        end_row: Option<usize>,
    ) -> Result<Vec<Sample>> {
        let start = start_row.unwrap_or(0);
        let end = end_row.unwrap_or(usize::MAX);

        let mut reader = csv::Reader::from_reader(reader);
        let mut samples = Vec::new();
        let (mut incomplete, mut filtered) = (0usize, 0usize);

        for (row, record) in reader.deserialize::<TelemetryRow>().enumerate() {
            if row < start {
                continue;
            }
            if row >= end {
                break;
            }
            let record = record?;

            let (Some(lat), Some(lon), Some(asl)) = (record.lat, record.lon, record.above_sea_level)
            else {
                incomplete += 1;
                continue;
            };

            let Some(metric) = self.metric(&record, name, row)? else {
                incomplete += 1;
                continue;
            };

            if !self.profile.keeps_metric(metric) {
                filtered += 1;
                continue;
            }

            samples.push(Sample::new(Point3::new(lon, lat, asl), metric));
        }

        if incomplete > 0 || filtered > 0 {
            log::debug!(
                "{}: skipped {} incomplete rows, filtered {} mid-range rows",
                name,
                incomplete,
                filtered
            );
        }
        Ok(samples)
    }

    /// Metric for a row, `None` if the row carries no RSSI records
    fn metric(&self, record: &TelemetryRow, name: &str, row: usize) -> Result<Option<f64>> {
        let bad_row = |reason: &str| Error::BadRow {
            file: name.to_string(),
            row,
            reason: reason.to_string(),
        };
        match self.profile.data {
            MetricSource::Downlink => record
                .down_link_percent
                .map(Some)
                .ok_or_else(|| bad_row("missing downLinkPercent")),
            MetricSource::Uplink => record
                .up_link_percent
                .map(Some)
                .ok_or_else(|| bad_row("missing upLinkPercent")),
            MetricSource::Rssi => match record.signal_interference.as_deref() {
                None | Some("") => Ok(None),
                Some(field) => strongest_rssi(field).map_err(|e| bad_row(&e.to_string())),
            },
        }
    }
}
