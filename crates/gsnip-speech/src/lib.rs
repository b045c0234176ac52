//! # gsnip-speech
//!
//! Endless streaming transcription. A recognition stream is limited to
//! roughly five minutes, so the recognizer closes each stream just before
//! the limit and opens a new one, replaying any audio that has not yet
//! been covered by a final result.
//!
//! ```text
//!  AudioSource ──▶ producer task ──mpsc──▶ StreamingRecognizer ──▶ SpeechTransport
//!                                              │   ▲                 (RecognizeStream)
//!                                              │   └── ReplayBuffer
//!                                              ▼
//!                                        TranscriptSink
//! ```
//!
//! [`GoogleSpeechTransport`] is the production transport (Speech-to-Text v1
//! over gRPC); tests script their own.

pub mod buffer;
pub mod config;
pub mod error;
pub mod google;
pub mod runner;
pub mod session;
pub mod source;
pub mod transport;

pub use config::{RecognitionConfig, StreamConfig};
pub use error::{SpeechError, SpeechResult};
pub use google::{GoogleSpeechTransport, SPEECH_ENDPOINT};
pub use runner::{StreamingRecognizer, TranscriptSink};
pub use session::{StopReason, StreamSession, StreamState, Transcript};
pub use source::{AudioSource, ChunkSource, ReaderSource};
pub use transport::{
    AudioSink, RecognitionResult, RecognizeStream, ResponseStream, SpeechTransport,
    StreamingResponse,
};
