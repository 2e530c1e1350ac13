//! Optional speech input and output through external programs.
//!
//! Both halves are best-effort: when the platform has no usable backend, or
//! voice is turned off in the config, they log once and do nothing.

mod recognize;
mod speak;

pub use recognize::{CommandRecognizer, interpret_output};
pub use speak::{Speaker, Voice, pick_voice};

use async_trait::async_trait;

/// Outcome of one listening session. Raw recognizer output never travels
/// further than this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Transcript(String),
    /// Short error code such as `no-speech` or `not-supported`
    Error(String),
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for a single utterance and return its final transcript
    async fn listen_once(&self) -> Recognition;

    /// False when listening can only ever return `not-supported`
    fn is_available(&self) -> bool {
        true
    }
}
