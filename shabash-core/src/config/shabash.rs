//! Top-level profile selector.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigLoadError;
use super::profile::ProfileConfig;

/// Name of the profile used when no file is present
pub const DEFAULT_PROFILE: &str = "default";

/// Full configuration: a set of named profiles plus the active selector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShabashConfig {
    /// Name of the active profile
    pub config: String,

    /// Every profile defined in the file, keyed by name
    #[serde(flatten)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for ShabashConfig {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), ProfileConfig::default());
        Self {
            config: DEFAULT_PROFILE.to_string(),
            profiles,
        }
    }
}

impl ShabashConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Load from default config path (configs/csv_lines_config.yaml)
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new("configs/csv_lines_config.yaml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse from YAML string
    ///
    /// Fails if `config` does not name a defined profile.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        config.active_profile()?;
        Ok(config)
    }

    /// Switch the active profile
    pub fn with_profile(mut self, name: impl Into<String>) -> Result<Self, ConfigLoadError> {
        self.config = name.into();
        self.active_profile()?;
        Ok(self)
    }

    /// The profile selected by `config`
    pub fn active_profile(&self) -> Result<&ProfileConfig, ConfigLoadError> {
        self.profile(&self.config)
    }

    /// A profile by name
    pub fn profile(&self, name: &str) -> Result<&ProfileConfig, ConfigLoadError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigLoadError::UnknownProfile(name.to_string()))
    }

    /// Names of all defined profiles
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::MetricSource;
    use crate::fitting::ConsensusSelection;
    use crate::locate::ThresholdMode;

    const YAML: &str = r#"
config: field
field:
  data: rssi
  graphs:
    - title: with source
      files:
        - csv_file_path: recordings/on.csv
          start_row: 10
          end_row: 500
    - title: baseline
      files:
        - csv_file_path: recordings/off.csv
  histogram_bins_difference_graph: [15, 15, 8]
  filter_middle_info: true
  low_info_ceil: 25
  high_info_floor: 75
  find_shabash_bounds: [[34.0, 31.0, 0, 0], [35.0, 32.0, 500, 1000000]]
  line_fit:
    residual_threshold: 3.5
    selection: most_inliers
  locator:
    threshold_mode: percentile
  show_shabash: true
  shabash_loc: [34.5, 31.5, 90]
bench:
  data: uplink
"#;

    #[test]
    fn test_default_config() {
        let config = ShabashConfig::default();
        let profile = config.active_profile().unwrap();
        assert_eq!(profile.histogram_bins, [10, 10, 10]);
        assert_eq!(profile.histogram_bins_difference_graph, [20, 20, 20]);
        assert_eq!(profile.ground_asl, 77.0);
        assert_eq!(profile.data, MetricSource::Downlink);
    }

    #[test]
    fn test_parse_profiles() {
        let config = ShabashConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.profile_names().collect::<Vec<_>>(), vec!["bench", "field"]);

        let field = config.active_profile().unwrap();
        assert_eq!(field.data, MetricSource::Rssi);
        assert_eq!(field.graphs.len(), 2);
        assert_eq!(field.graphs[0].files[0].start_row, Some(10));
        assert_eq!(field.graphs[0].files[0].end_row, Some(500));
        assert_eq!(field.graphs[1].files[0].start_row, None);
        assert_eq!(field.histogram_bins_difference_graph, [15, 15, 8]);
        assert_eq!(field.find_shabash_bounds.lower(), [34.0, 31.0, 0.0, 0.0]);
        assert_eq!(field.line_fit.residual_threshold, 3.5);
        assert_eq!(field.line_fit.max_trials, 100);
        assert_eq!(field.line_fit.selection, ConsensusSelection::MostInliers);
        assert_eq!(field.locator.threshold_mode, ThresholdMode::Percentile);
        assert_eq!(field.locator.selection_threshold, 70.0);
        assert!(field.shown_source().is_some());

        let bench = config.profile("bench").unwrap();
        assert_eq!(bench.data, MetricSource::Uplink);
        assert!(bench.graphs.is_empty());
        assert_eq!(bench.histogram_bins, [10, 10, 10]);
    }

    #[test]
    fn test_mid_range_filter() {
        let config = ShabashConfig::from_yaml(YAML).unwrap();
        let field = config.active_profile().unwrap();
        assert!(field.keeps_metric(25.0));
        assert!(field.keeps_metric(75.0));
        assert!(!field.keeps_metric(50.0));

        let bench = config.profile("bench").unwrap();
        assert!(bench.keeps_metric(50.0));
    }

    #[test]
    fn test_unknown_profile() {
        let yaml = "config: missing\nfield:\n  data: rssi\n";
        match ShabashConfig::from_yaml(yaml) {
            Err(ConfigLoadError::UnknownProfile(name)) => assert_eq!(name, "missing"),
            other => panic!("expected unknown profile, got {:?}", other),
        }

        let config = ShabashConfig::from_yaml(YAML).unwrap();
        assert!(config.clone().with_profile("bench").is_ok());
        assert!(config.with_profile("nope").is_err());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let yaml = "config: p\np:\n  find_shabash_bounds: [[5, 0, 0, 0], [1, 1, 1, 1]]\n";
        assert!(matches!(
            ShabashConfig::from_yaml(yaml),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = ShabashConfig::load(file.path()).unwrap();
        assert_eq!(config.config, "field");

        let missing = ShabashConfig::load(Path::new("/nonexistent/shabash.yaml"));
        assert!(matches!(missing, Err(ConfigLoadError::Io(_))));
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/csv_lines_config.yaml");
        let config = ShabashConfig::load(&path).unwrap();
        assert_eq!(config.config, "downlink_field");
        assert_eq!(config.active_profile().unwrap().graphs.len(), 2);
        assert_eq!(config.profile("rssi_field").unwrap().data, MetricSource::Rssi);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ShabashConfig::from_yaml(YAML).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ShabashConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
