//! Backend seam for bidirectional streaming recognition.
//!
//! A stream is split into an audio half and a response half so the driver
//! can keep sending while it waits for results.

use crate::config::RecognitionConfig;
use crate::error::SpeechResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

// ── Responses ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    /// Top alternative only.
    pub transcript: String,
    pub is_final: bool,
    /// End of this result relative to the start of its stream.
    pub result_end_offset: Duration,
}

impl RecognitionResult {
    pub fn final_result(transcript: impl Into<String>, result_end_offset: Duration) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
            result_end_offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingResponse {
    pub results: Vec<RecognitionResult>,
    /// Status message reported in-band by the service.
    pub error: Option<String>,
}

// ── Stream halves ───────────────────────────────────────────────────────

#[async_trait]
pub trait AudioSink: Send {
    async fn send_audio(&mut self, chunk: Bytes) -> SpeechResult<()>;

    /// Half-close: no more audio, the service flushes its remaining results.
    async fn close_send(&mut self) -> SpeechResult<()>;
}

#[async_trait]
pub trait ResponseStream: Send {
    /// Next response, `None` once the service has closed the stream.
    ///
    /// Must be cancel safe: the driver polls it inside `select!`.
    async fn recv(&mut self) -> SpeechResult<Option<StreamingResponse>>;
}

pub struct RecognizeStream {
    pub audio: Box<dyn AudioSink>,
    pub responses: Box<dyn ResponseStream>,
}

#[async_trait]
pub trait SpeechTransport: Send + Sync {
    /// Open a new stream and send `config` as its first message.
    async fn open(&self, config: &RecognitionConfig) -> SpeechResult<RecognizeStream>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted in-process transport.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Responses for one stream, each released once the stream has
    /// received at least the given number of audio chunks (or on close).
    #[derive(Default)]
    pub struct Script(pub Vec<(usize, StreamingResponse)>);

    pub struct FakeTransport {
        scripts: Mutex<VecDeque<Script>>,
        pub received: Arc<Mutex<Vec<Vec<Bytes>>>>,
        pub configs: Mutex<Vec<RecognitionConfig>>,
    }

    impl FakeTransport {
        pub fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                received: Arc::new(Mutex::new(Vec::new())),
                configs: Mutex::new(Vec::new()),
            }
        }

        /// First byte of every chunk, per stream.
        pub fn received_tags(&self) -> Vec<Vec<u8>> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.iter().map(|c| c[0]).collect())
                .collect()
        }
    }

    #[async_trait]
    impl SpeechTransport for FakeTransport {
        async fn open(&self, config: &RecognitionConfig) -> SpeechResult<RecognizeStream> {
            self.configs.lock().unwrap().push(config.clone());
            let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            let index = {
                let mut received = self.received.lock().unwrap();
                received.push(Vec::new());
                received.len() - 1
            };
            let (tx, rx) = mpsc::unbounded_channel();
            Ok(RecognizeStream {
                audio: Box::new(FakeAudio { tx: Some(tx) }),
                responses: Box::new(FakeResponses {
                    rx,
                    pending: script.0.into(),
                    count: 0,
                    received: self.received.clone(),
                    index,
                }),
            })
        }
    }

    struct FakeAudio {
        tx: Option<mpsc::UnboundedSender<Bytes>>,
    }

    #[async_trait]
    impl AudioSink for FakeAudio {
        async fn send_audio(&mut self, chunk: Bytes) -> SpeechResult<()> {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| crate::SpeechError::Transport("send after close".into()))?;
            tx.send(chunk)
                .map_err(|_| crate::SpeechError::Transport("stream gone".into()))
        }

        async fn close_send(&mut self) -> SpeechResult<()> {
            self.tx = None;
            Ok(())
        }
    }

    struct FakeResponses {
        rx: mpsc::UnboundedReceiver<Bytes>,
        pending: VecDeque<(usize, StreamingResponse)>,
        count: usize,
        received: Arc<Mutex<Vec<Vec<Bytes>>>>,
        index: usize,
    }

    #[async_trait]
    impl ResponseStream for FakeResponses {
        async fn recv(&mut self) -> SpeechResult<Option<StreamingResponse>> {
            loop {
                if matches!(self.pending.front(), Some((n, _)) if *n <= self.count) {
                    return Ok(self.pending.pop_front().map(|(_, r)| r));
                }
                match self.rx.recv().await {
                    Some(chunk) => {
                        self.received.lock().unwrap()[self.index].push(chunk);
                        self.count += 1;
                    }
                    None => return Ok(self.pending.pop_front().map(|(_, r)| r)),
                }
            }
        }
    }
}
