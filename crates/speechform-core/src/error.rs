//! Error types for the speech form layer.

/// Result type alias for speech form operations
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Main error type for speech form operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// The host speech engine rejected or failed an utterance
    #[error("Speech engine error: {message}")]
    EngineError {
        /// Error message describing the failure
        message: String,
    },

    /// Audio output error while priming
    #[error("Audio device error: {message}")]
    AudioDeviceError {
        /// Error message describing the device issue
        message: String,
    },

    /// Preference storage error
    #[error("Storage error: {message}")]
    StorageError {
        /// Error message describing the storage failure
        message: String,
    },

    /// Value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Error message describing the encoding issue
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl SpeechError {
    /// Create a new engine error
    #[must_use]
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::EngineError {
            message: message.into(),
        }
    }

    /// Create a new audio device error
    #[must_use]
    pub fn audio_device<S: Into<String>>(message: S) -> Self {
        Self::AudioDeviceError {
            message: message.into(),
        }
    }

    /// Create a new storage error
    #[must_use]
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    #[must_use]
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::ConfigurationError { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::EngineError { .. } => "engine",
            Self::AudioDeviceError { .. } => "audio_device",
            Self::StorageError { .. } => "storage",
            Self::SerializationError { .. } => "serialization",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
        }
    }
}

impl From<std::io::Error> for SpeechError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<serde_json::Error> for SpeechError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for SpeechError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpeechError::invalid_input("Rate must be between 0.1 and 10.0, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid input: Rate must be between 0.1 and 10.0, got 0"
        );
        let err = SpeechError::engine("synthesis-unavailable");
        assert_eq!(err.to_string(), "Speech engine error: synthesis-unavailable");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SpeechError::engine("test").category(), "engine");
        assert_eq!(SpeechError::audio_device("test").category(), "audio_device");
        assert_eq!(SpeechError::storage("test").category(), "storage");
        assert_eq!(SpeechError::serialization("test").category(), "serialization");
        assert_eq!(SpeechError::invalid_input("test").category(), "input");
        assert_eq!(SpeechError::configuration("test").category(), "configuration");
    }

    #[test]
    fn test_user_errors() {
        assert!(SpeechError::invalid_input("test").is_user_error());
        assert!(SpeechError::configuration("test").is_user_error());
        assert!(!SpeechError::engine("test").is_user_error());
        assert!(!SpeechError::storage("test").is_user_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = SpeechError::from(io_err);
        assert!(matches!(err, SpeechError::StorageError { .. }));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err = SpeechError::from(toml_err);
        assert_eq!(err.category(), "configuration");
    }
}
