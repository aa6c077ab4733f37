//! Priming tone played ahead of speech.
//!
//! Some hosts drop the first few hundred milliseconds of output, or refuse
//! to start audio at all, until the output path has been used once. A short
//! quiet sine tone wakes it up.

use crate::error::{SpeechError, SpeechResult};
use crate::host::{AudioData, AudioPrimer, AudioSink};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Priming tone parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PrimingTone {
    /// Oscillator frequency in Hz
    pub frequency_hz: f32,
    /// Linear gain, `0.0..=1.0`
    pub gain: f32,
    /// Tone length
    pub duration: Duration,
    /// Sample rate of the rendered buffer
    pub sample_rate: u32,
}

impl Default for PrimingTone {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            gain: 0.001,
            duration: Duration::from_millis(500),
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
        }
    }
}

impl PrimingTone {
    /// Validate tone parameters
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of range
    pub fn validate(&self) -> SpeechResult<()> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(SpeechError::invalid_input(format!(
                "Priming frequency must be positive, got {}",
                self.frequency_hz
            )));
        }

        if !(0.0..=1.0).contains(&self.gain) {
            return Err(SpeechError::invalid_input(format!(
                "Priming gain must be between 0.0 and 1.0, got {}",
                self.gain
            )));
        }

        if self.duration.is_zero() {
            return Err(SpeechError::invalid_input("Priming duration cannot be zero"));
        }

        if self.sample_rate < 8000 || self.sample_rate > 48000 {
            return Err(SpeechError::invalid_input(format!(
                "Sample rate must be between 8000 and 48000 Hz, got {}",
                self.sample_rate
            )));
        }

        Ok(())
    }

    /// Number of samples in the rendered tone
    #[must_use]
    pub fn sample_count(&self) -> usize {
        (self.duration.as_secs_f64() * f64::from(self.sample_rate)).round() as usize
    }

    /// Render the tone as mono samples
    #[must_use]
    pub fn render(&self) -> AudioData {
        let step = TAU * self.frequency_hz / self.sample_rate as f32;
        (0..self.sample_count())
            .map(|i| (step * i as f32).sin() * self.gain)
            .collect()
    }
}

/// [`AudioPrimer`] that renders the tone and plays it on an [`AudioSink`]
pub struct TonePrimer {
    sink: Arc<dyn AudioSink>,
}

impl TonePrimer {
    /// Create a primer playing on `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink }
    }
}

impl AudioPrimer for TonePrimer {
    fn prime(&self, tone: &PrimingTone) -> SpeechResult<()> {
        tone.validate()?;
        let samples = tone.render();
        debug!(
            "Priming output with {} samples at {} Hz",
            samples.len(),
            tone.sample_rate
        );
        self.sink.play(&samples, tone.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_host::MockAudioSink;

    #[test]
    fn test_default_tone() {
        let tone = PrimingTone::default();
        assert!(tone.validate().is_ok());
        assert_eq!(tone.duration, Duration::from_millis(500));
        assert_eq!(tone.sample_count(), 12_000);
    }

    #[test]
    fn test_render_respects_gain() {
        let tone = PrimingTone {
            gain: 0.25,
            ..PrimingTone::default()
        };
        let samples = tone.render();
        assert_eq!(samples.len(), tone.sample_count());
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= 0.25 + f32::EPSILON));
        assert!(samples.iter().any(|s| s.abs() > 0.2));
    }

    #[test]
    fn test_validation() {
        let bad_gain = PrimingTone {
            gain: 1.5,
            ..PrimingTone::default()
        };
        assert!(bad_gain.validate().is_err());

        let bad_frequency = PrimingTone {
            frequency_hz: 0.0,
            ..PrimingTone::default()
        };
        assert!(bad_frequency.validate().is_err());

        let bad_duration = PrimingTone {
            duration: Duration::ZERO,
            ..PrimingTone::default()
        };
        assert!(bad_duration.validate().is_err());

        let bad_rate = PrimingTone {
            sample_rate: 1000,
            ..PrimingTone::default()
        };
        assert!(bad_rate.validate().is_err());
    }

    #[test]
    fn test_tone_primer_plays_on_sink() {
        let sink = Arc::new(MockAudioSink::new());
        let primer = TonePrimer::new(sink.clone());

        primer.prime(&PrimingTone::default()).expect("Should prime");

        assert_eq!(sink.played(), vec![(12_000, crate::DEFAULT_SAMPLE_RATE)]);
        assert!(sink.peak() <= 0.001 + f32::EPSILON);
    }

    #[test]
    fn test_tone_primer_rejects_invalid_tone() {
        let sink = Arc::new(MockAudioSink::new());
        let primer = TonePrimer::new(sink.clone());
        let tone = PrimingTone {
            gain: -1.0,
            ..PrimingTone::default()
        };
        assert!(primer.prime(&tone).is_err());
        assert!(sink.played().is_empty());
    }
}
