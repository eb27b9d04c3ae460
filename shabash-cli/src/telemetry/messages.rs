//! Telemetry message types.
//!
//! The ground station streams newline-delimited JSON objects; only those
//! with `"messageType": "telemetry"` carry receiver fixes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message type carrying receiver fixes
pub const TELEMETRY_MESSAGE_TYPE: &str = "telemetry";

/// One receiver fix as sent by the ground station
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Message discriminator
    #[serde(default)]
    pub message_type: String,
    /// Timestamp of the matching video frame
    #[serde(default)]
    pub video_nano_time: Option<u64>,
    /// Latitude (degrees)
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude (degrees)
    #[serde(default)]
    pub lon: Option<f64>,
    /// Altitude above sea level (metres)
    #[serde(default)]
    pub above_sea_level: Option<f64>,
    /// Uplink quality (percent)
    #[serde(default)]
    pub up_link_percent: Option<f64>,
    /// Downlink quality (percent)
    #[serde(default)]
    pub down_link_percent: Option<f64>,
    /// List of `{frequencyFrom, rssi}` records, kept verbatim
    #[serde(default)]
    pub signal_interference: Option<Value>,
}

impl TelemetrySnapshot {
    /// Parse one line; `Ok(None)` for messages of another type
    pub fn parse_line(line: &str) -> serde_json::Result<Option<Self>> {
        let snapshot: Self = serde_json::from_str(line)?;
        if snapshot.message_type == TELEMETRY_MESSAGE_TYPE {
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }
}
