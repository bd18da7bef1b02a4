//! Playback configuration
//!
//! Every field has a default, so an empty YAML/JSON document (or `{}` from
//! JavaScript) yields [`PlaybackConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::error::PlaybackError;
use crate::models::Tempo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Offset added to every note start
    pub lead_in_seconds: f64,
    /// Wait after the last note ends before finalizing
    pub trailing_margin_seconds: f64,
    /// Tempo for scores that do not declare one
    pub default_tempo_bpm: f64,
    /// Cap on measures walked by note extraction
    pub max_measures: usize,
    /// Note length for fixed-duration extraction
    pub fixed_note_duration_beats: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            lead_in_seconds: DEFAULT_LEAD_IN_SECONDS,
            trailing_margin_seconds: DEFAULT_TRAILING_MARGIN_SECONDS,
            default_tempo_bpm: DEFAULT_TEMPO_BPM,
            max_measures: DEFAULT_MAX_MEASURES,
            fixed_note_duration_beats: DEFAULT_FIXED_NOTE_DURATION_BEATS,
        }
    }
}

impl PlaybackConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PlaybackError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, PlaybackError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, picking the format by extension (`.json`, else YAML)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlaybackError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !self.lead_in_seconds.is_finite() || self.lead_in_seconds < 0.0 {
            return Err(PlaybackError::InvalidConfig(format!(
                "leadInSeconds must be >= 0, got {}",
                self.lead_in_seconds
            )));
        }
        if !self.trailing_margin_seconds.is_finite() || self.trailing_margin_seconds < 0.0 {
            return Err(PlaybackError::InvalidConfig(format!(
                "trailingMarginSeconds must be >= 0, got {}",
                self.trailing_margin_seconds
            )));
        }
        Tempo::new(self.default_tempo_bpm)
            .validate()
            .map_err(|e| PlaybackError::InvalidConfig(format!("defaultTempoBpm: {}", e)))?;
        if self.max_measures == 0 {
            return Err(PlaybackError::InvalidConfig(
                "maxMeasures must be at least 1".to_string(),
            ));
        }
        if !self.fixed_note_duration_beats.is_finite() || self.fixed_note_duration_beats <= 0.0 {
            return Err(PlaybackError::InvalidConfig(format!(
                "fixedNoteDurationBeats must be > 0, got {}",
                self.fixed_note_duration_beats
            )));
        }
        Ok(())
    }

    pub fn default_tempo(&self) -> Tempo {
        Tempo::new(self.default_tempo_bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = PlaybackConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PlaybackConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PlaybackConfig::from_json_str(r#"{"leadInSeconds": 0.1}"#).unwrap();
        assert_eq!(config.lead_in_seconds, 0.1);
        assert_eq!(config.trailing_margin_seconds, DEFAULT_TRAILING_MARGIN_SECONDS);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(PlaybackConfig::from_yaml_str("leadInSeconds: -1").is_err());
        assert!(PlaybackConfig::from_yaml_str("defaultTempoBpm: 0").is_err());
        assert!(PlaybackConfig::from_yaml_str("maxMeasures: 0").is_err());
        assert!(PlaybackConfig::from_yaml_str("fixedNoteDurationBeats: 0").is_err());
        assert!(PlaybackConfig::from_yaml_str("leadInSeconds: [").is_err());
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "trailingMarginSeconds: 1.5").unwrap();
        let config = PlaybackConfig::from_file(yaml.path()).unwrap();
        assert_eq!(config.trailing_margin_seconds, 1.5);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"maxMeasures": 16}}"#).unwrap();
        let config = PlaybackConfig::from_file(json.path()).unwrap();
        assert_eq!(config.max_measures, 16);

        assert!(PlaybackConfig::from_file("/nonexistent/playback.yaml").is_err());
    }
}
