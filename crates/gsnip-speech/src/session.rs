//! Restart-and-resume bookkeeping for one endless transcription.
//!
//! ```text
//!   Idle ──start──▶ Streaming ──begin_drain──▶ Draining ──finish_segment──▶ Idle
//!                       │                          │                          │
//!                       └────────── stop ──────────┴──────────▶ Stopped ◀─────┘ (input exhausted)
//! ```

use crate::buffer::ReplayBuffer;
use crate::config::{StreamConfig, CHUNK_DURATION_MS};
use crate::error::{SpeechError, SpeechResult};
use crate::transport::RecognitionResult;
use bytes::Bytes;
use log::debug;

const EXIT_PHRASES: [&str; 2] = ["exit exit exit", "quit quit quit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    InputExhausted,
    ExitPhrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    /// Audio flows to the open stream.
    Streaming,
    /// Send side closed, waiting for the remaining results.
    Draining,
    Stopped(StopReason),
}

impl StreamState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Stopped(_) => "stopped",
        }
    }
}

/// A final transcript as delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// End of the result measured from the very first stream.
    pub result_end_ms: i64,
    /// 1-based stream number the result came from.
    pub stream: u32,
}

pub fn is_exit_phrase(transcript: &str) -> bool {
    let lower = transcript.to_lowercase();
    EXIT_PHRASES.iter().any(|p| lower.contains(p))
}

/// Map a stream-relative end offset onto the timeline of the whole session.
pub fn result_end_ms(offset_ms: i64, restart_count: u32, stream_limit_ms: i64) -> i64 {
    offset_ms + stream_limit_ms * (i64::from(restart_count) - 1)
}

pub struct StreamSession {
    state: StreamState,
    restart_count: u32,
    stream_limit_ms: i64,
    buffer: ReplayBuffer,
}

impl StreamSession {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            state: StreamState::Idle,
            restart_count: 0,
            stream_limit_ms: config.stream_limit.as_millis() as i64,
            buffer: ReplayBuffer::new(CHUNK_DURATION_MS),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Streams opened so far, including the current one.
    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    fn invalid(&self, event: &'static str) -> SpeechError {
        SpeechError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }

    pub fn start(&mut self) -> SpeechResult<()> {
        if self.state != StreamState::Idle {
            return Err(self.invalid("start"));
        }
        self.restart_count += 1;
        self.state = StreamState::Streaming;
        Ok(())
    }

    /// Remember a chunk that is being sent live.
    pub fn record(&mut self, chunk: Bytes) {
        self.buffer.push(chunk);
    }

    pub fn begin_drain(&mut self) -> SpeechResult<()> {
        if self.state != StreamState::Streaming {
            return Err(self.invalid("drain"));
        }
        self.state = StreamState::Draining;
        Ok(())
    }

    /// The stream has closed. Back to `Idle` for a restart, or `Stopped`
    /// when there is no more input.
    pub fn finish_segment(&mut self, input_exhausted: bool) -> SpeechResult<StreamState> {
        if self.state != StreamState::Draining {
            return Err(self.invalid("finish"));
        }
        self.state = if input_exhausted {
            StreamState::Stopped(StopReason::InputExhausted)
        } else {
            StreamState::Idle
        };
        Ok(self.state)
    }

    pub fn stop(&mut self, reason: StopReason) {
        self.state = StreamState::Stopped(reason);
    }

    /// Account for a final result: everything up to its end no longer needs
    /// replaying. Returns the transcript plus whether it asked us to stop.
    pub fn on_final_result(
        &mut self,
        result: &RecognitionResult,
    ) -> (Transcript, Option<StopReason>) {
        let transcript = Transcript {
            text: result.transcript.clone(),
            result_end_ms: result_end_ms(
                result.result_end_offset.as_millis() as i64,
                self.restart_count,
                self.stream_limit_ms,
            ),
            stream: self.restart_count,
        };
        if is_exit_phrase(&transcript.text) {
            return (transcript, Some(StopReason::ExitPhrase));
        }
        self.buffer.trim_to(transcript.result_end_ms);
        debug!(
            "final result ends at {} ms, {} chunks left to replay",
            transcript.result_end_ms,
            self.buffer.len()
        );
        (transcript, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> StreamSession {
        StreamSession::new(&StreamConfig::default())
    }

    #[test]
    fn walks_through_a_restart() {
        let mut s = session();
        s.start().unwrap();
        assert_eq!(s.restart_count(), 1);
        s.begin_drain().unwrap();
        assert_eq!(s.finish_segment(false).unwrap(), StreamState::Idle);
        s.start().unwrap();
        assert_eq!(s.restart_count(), 2);
        s.begin_drain().unwrap();
        assert_eq!(
            s.finish_segment(true).unwrap(),
            StreamState::Stopped(StopReason::InputExhausted)
        );
        assert!(s.start().is_err());
    }

    #[test]
    fn rejects_out_of_order_events() {
        let mut s = session();
        let err = s.begin_drain().unwrap_err();
        assert_eq!(err.to_string(), "cannot drain while idle");
        s.start().unwrap();
        assert_eq!(s.start().unwrap_err().to_string(), "cannot start while streaming");
        assert!(s.finish_segment(false).is_err());
    }

    #[test]
    fn result_end_accounts_for_earlier_streams() {
        assert_eq!(result_end_ms(1500, 1, 290_000), 1500);
        assert_eq!(result_end_ms(1500, 3, 290_000), 581_500);
    }

    #[test]
    fn final_results_trim_the_replay_buffer() {
        let mut s = session();
        s.start().unwrap();
        for i in 0..3u8 {
            s.record(Bytes::from(vec![i]));
        }
        let hello = RecognitionResult::final_result("hello", Duration::from_millis(2000));
        let (t, stop) = s.on_final_result(&hello);
        assert_eq!(stop, None);
        assert_eq!(t.result_end_ms, 2000);
        assert_eq!(t.stream, 1);
        assert_eq!(s.buffer().len(), 1);
    }

    #[test]
    fn exit_phrases_ignore_case() {
        assert!(is_exit_phrase("ok EXIT Exit exit"));
        assert!(is_exit_phrase("quit quit quit"));
        assert!(!is_exit_phrase("exit exit"));

        let mut s = session();
        s.start().unwrap();
        s.record(Bytes::from_static(&[0]));
        let quit = RecognitionResult::final_result("Quit Quit Quit", Duration::from_secs(5));
        let (_, stop) = s.on_final_result(&quit);
        assert_eq!(stop, Some(StopReason::ExitPhrase));
        assert_eq!(s.buffer().len(), 1);
    }
}
