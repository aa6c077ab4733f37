//! # Speechform Core
//!
//! State layer for text-to-speech front ends: voice discovery, a speech
//! session with per-status history, and a persisted form that ties them
//! together.
//!
//! ## Features
//!
//! - Voice directory that waits out hosts reporting an empty list at startup
//! - Speak/stop control with elapsed-time tracking
//! - Newest-first utterance history shared across forms
//! - Write-through preference persistence (memory or JSON file)
//! - Optional output priming tone and start delay
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use speechform_core::{
//!     DirectoryConfig, FormController, MemoryPreferenceStore, MockSpeechEngine,
//!     MockVoiceSource, SpeechStore, Voice, VoiceDirectory,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(MockVoiceSource::with_voices(vec![
//!         Voice::new("v1", "Samantha", "en-US"),
//!         Voice::new("v2", "Kyoko", "ja-JP"),
//!     ]));
//!     let store = SpeechStore::new(VoiceDirectory::new(source, DirectoryConfig::default()));
//!     let form = FormController::new(
//!         &store,
//!         Arc::new(MemoryPreferenceStore::new()),
//!         Arc::new(MockSpeechEngine::auto_start()),
//!     );
//!
//!     form.select_lang(Some("ja-JP".to_string()));
//!     form.speak();
//!     println!("{} history entries", store.history().len());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod form_controller;
pub mod history;
pub mod host;
pub mod mock_host;
pub mod preferences;
pub mod primer;
pub mod speech_session;
pub mod store;
pub mod voice_directory;

// Re-export main types for convenience
pub use config::SpeechFormConfig;
pub use error::{SpeechError, SpeechResult};
pub use form_controller::{FormController, FormDefaults, FormPreferences};
pub use history::{HistoryEntry, HistoryLog};
pub use host::{
    AudioPrimer, AudioSink, PreferenceStore, SpeechEngine, SpeechStatus, StatusListener, Utterance,
    VoiceSource,
};
pub use mock_host::{MockAudioSink, MockSpeechEngine, MockVoiceSource};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, Persisted};
pub use primer::{PrimingTone, TonePrimer};
pub use speech_session::{
    SessionConfig, SharedUtterance, SpeechParams, SpeechSession, UtteranceSource,
};
pub use store::SpeechStore;
pub use voice_directory::{sorted_langs, DirectoryConfig, LoadState, Voice, VoiceDirectory};

/// Version information for the speechform-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text restored by a form reset
pub const DEFAULT_TEXT: &str = "Hello, World!";

/// Sample rate of the rendered priming tone (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
