//! TOML configuration.
//!
//! ```toml
//! [directory]
//! poll_interval_ms = 100
//!
//! [session]
//! start_delay_ms = 1000
//!
//! [session.priming]
//! frequency_hz = 440.0
//! gain = 0.001
//! duration_ms = 500
//!
//! [defaults]
//! rate = 1.0
//! pitch = 1.0
//! text = "Hello, World!"
//! ```

use crate::error::{SpeechError, SpeechResult};
use crate::form_controller::FormDefaults;
use crate::primer::PrimingTone;
use crate::speech_session::{SessionConfig, SpeechParams};
use crate::voice_directory::{DirectoryConfig, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Voice directory section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySection {
    /// Interval between host queries while the voice list is empty
    pub poll_interval_ms: u64,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Priming tone section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimingSection {
    /// Oscillator frequency in Hz
    pub frequency_hz: f32,
    /// Linear gain
    pub gain: f32,
    /// Tone length in milliseconds
    pub duration_ms: u64,
    /// Sample rate of the rendered tone
    pub sample_rate: u32,
}

impl Default for PrimingSection {
    fn default() -> Self {
        let tone = PrimingTone::default();
        Self {
            frequency_hz: tone.frequency_hz,
            gain: tone.gain,
            duration_ms: tone.duration.as_millis() as u64,
            sample_rate: tone.sample_rate,
        }
    }
}

impl From<&PrimingSection> for PrimingTone {
    fn from(section: &PrimingSection) -> Self {
        Self {
            frequency_hz: section.frequency_hz,
            gain: section.gain,
            duration: Duration::from_millis(section.duration_ms),
            sample_rate: section.sample_rate,
        }
    }
}

/// Speech session section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Wait between priming and speech in milliseconds
    pub start_delay_ms: u64,
    /// Priming tone; absent disables priming
    pub priming: Option<PrimingSection>,
}

/// Complete speech form configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechFormConfig {
    /// Voice directory settings
    pub directory: DirectorySection,
    /// Speech session settings
    pub session: SessionSection,
    /// Form reset defaults
    pub defaults: FormDefaults,
}

impl SpeechFormConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation
    pub fn from_toml_str(content: &str) -> SpeechResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed or fails validation
    pub fn load(path: impl AsRef<Path>) -> SpeechResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            SpeechError::configuration(format!("Cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded speech form config from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> SpeechResult<()> {
        if self.directory.poll_interval_ms == 0 {
            return Err(SpeechError::configuration(
                "poll_interval_ms must be greater than 0",
            ));
        }

        if let Some(priming) = &self.session.priming {
            PrimingTone::from(priming)
                .validate()
                .map_err(|err| SpeechError::configuration(format!("priming: {err}")))?;
        }

        SpeechParams::validate_rate(self.defaults.rate)
            .and_then(|()| SpeechParams::validate_pitch(self.defaults.pitch))
            .map_err(|err| SpeechError::configuration(format!("defaults: {err}")))
    }

    /// Voice directory configuration
    #[must_use]
    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            poll_interval: Duration::from_millis(self.directory.poll_interval_ms),
        }
    }

    /// Speech session configuration
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            priming: self.session.priming.as_ref().map(PrimingTone::from),
            start_delay: Duration::from_millis(self.session.start_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SpeechFormConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.directory_config().poll_interval, Duration::from_millis(100));

        let session = config.session_config();
        assert!(session.priming.is_none());
        assert_eq!(session.start_delay, Duration::ZERO);
        assert_eq!(config.defaults.text, "Hello, World!");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SpeechFormConfig::from_toml_str("").expect("Should parse");
        assert_eq!(config, SpeechFormConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = SpeechFormConfig::from_toml_str(
            r#"
            [directory]
            poll_interval_ms = 250

            [session]
            start_delay_ms = 1000

            [session.priming]
            gain = 0.01
            duration_ms = 300

            [defaults]
            rate = 1.2
            text = "こんにちは"
            "#,
        )
        .expect("Should parse");

        assert_eq!(config.directory_config().poll_interval, Duration::from_millis(250));
        let session = config.session_config();
        assert_eq!(session.start_delay, Duration::from_secs(1));
        let tone = session.priming.expect("Priming enabled");
        assert_eq!(tone.gain, 0.01);
        assert_eq!(tone.duration, Duration::from_millis(300));
        assert_eq!(tone.frequency_hz, 440.0);
        assert_eq!(config.defaults.rate, 1.2);
        assert_eq!(config.defaults.pitch, 1.0);
        assert_eq!(config.defaults.text, "こんにちは");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_poll = SpeechFormConfig::from_toml_str("[directory]\npoll_interval_ms = 0");
        assert!(matches!(zero_poll, Err(SpeechError::ConfigurationError { .. })));

        let loud = SpeechFormConfig::from_toml_str("[session.priming]\ngain = 2.0");
        assert!(loud.is_err());

        let slow = SpeechFormConfig::from_toml_str("[defaults]\nrate = 0.0");
        assert!(slow.is_err());

        let malformed = SpeechFormConfig::from_toml_str("[directory\n");
        assert!(matches!(malformed, Err(SpeechError::ConfigurationError { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let file = NamedTempFile::with_suffix(".toml").expect("Should create temp file");
        std::fs::write(file.path(), "[session]\nstart_delay_ms = 500\n").unwrap();

        let config = SpeechFormConfig::load(file.path()).expect("Should load");
        assert_eq!(config.session_config().start_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SpeechFormConfig::load("/nonexistent/speechform.toml");
        assert!(matches!(result, Err(SpeechError::ConfigurationError { .. })));
    }
}
