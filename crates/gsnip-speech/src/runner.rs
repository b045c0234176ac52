//! Coordinating loop for endless transcription.
//!
//! One producer task reads the audio source at a steady pace and hands
//! chunks over an mpsc channel. The coordinator owns the session, opens a
//! stream per segment, replays unfinalised audio first, then forwards live
//! chunks until the stream limit is reached or the input runs dry, while
//! collecting responses from the same stream.

use crate::config::StreamConfig;
use crate::error::{SpeechError, SpeechResult};
use crate::session::{StopReason, StreamSession, StreamState, Transcript};
use crate::source::AudioSource;
use crate::transport::{RecognizeStream, SpeechTransport, StreamingResponse};
use bytes::Bytes;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Chunks buffered between producer and coordinator.
const CHANNEL_CAPACITY: usize = 32;

/// Receives every final transcript in order.
pub trait TranscriptSink: Send {
    fn deliver(&mut self, transcript: Transcript);
}

impl TranscriptSink for Vec<Transcript> {
    fn deliver(&mut self, transcript: Transcript) {
        self.push(transcript);
    }
}

impl TranscriptSink for mpsc::UnboundedSender<Transcript> {
    fn deliver(&mut self, transcript: Transcript) {
        if self.send(transcript).is_err() {
            debug!("transcript receiver dropped");
        }
    }
}

pub struct StreamingRecognizer<T> {
    transport: T,
    config: StreamConfig,
}

impl<T: SpeechTransport> StreamingRecognizer<T> {
    pub fn new(transport: T, config: StreamConfig) -> Self {
        Self { transport, config }
    }

    /// Transcribe `source` until it is exhausted or someone says an exit
    /// phrase.
    pub async fn run<A, K>(&self, source: A, sink: &mut K) -> SpeechResult<StopReason>
    where
        A: AudioSource + 'static,
        K: TranscriptSink + ?Sized,
    {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let producer = tokio::spawn(produce(source, tx, self.config.chunk_interval));
        let result = self.coordinate(&mut rx, sink).await;
        producer.abort();
        result
    }

    async fn coordinate<K>(
        &self,
        rx: &mut mpsc::Receiver<Bytes>,
        sink: &mut K,
    ) -> SpeechResult<StopReason>
    where
        K: TranscriptSink + ?Sized,
    {
        let mut session = StreamSession::new(&self.config);
        let mut input_exhausted = false;

        loop {
            session.start()?;
            let deadline = Instant::now() + self.config.stream_limit;
            info!("opening stream {}", session.restart_count());
            let RecognizeStream {
                mut audio,
                mut responses,
            } = self.transport.open(&self.config.recognition).await?;

            if !session.buffer().is_empty() {
                debug!("replaying {} chunks", session.buffer().len());
            }
            for chunk in session.buffer().chunks() {
                audio.send_audio(chunk.clone()).await?;
            }

            let mut stop = None;
            loop {
                let sending = session.state() == StreamState::Streaming;
                tokio::select! {
                    chunk = rx.recv(), if sending => match chunk {
                        Some(chunk) => {
                            session.record(chunk.clone());
                            audio.send_audio(chunk).await?;
                        }
                        None => {
                            info!("audio input exhausted");
                            input_exhausted = true;
                            audio.close_send().await?;
                            session.begin_drain()?;
                        }
                    },
                    _ = sleep_until(deadline), if sending => {
                        info!("stream {} reached its time limit", session.restart_count());
                        audio.close_send().await?;
                        session.begin_drain()?;
                    }
                    response = responses.recv() => match response? {
                        Some(response) => {
                            stop = handle_response(&mut session, response, sink)?;
                            if stop.is_some() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            if let Some(reason) = stop {
                if session.state() == StreamState::Streaming {
                    audio.close_send().await?;
                }
                session.stop(reason);
                info!("stopping: exit phrase heard");
                return Ok(reason);
            }
            if session.state() == StreamState::Streaming {
                warn!("stream {} closed by the service early", session.restart_count());
                session.begin_drain()?;
            }
            if let StreamState::Stopped(reason) = session.finish_segment(input_exhausted)? {
                return Ok(reason);
            }
        }
    }
}

fn handle_response<K>(
    session: &mut StreamSession,
    response: StreamingResponse,
    sink: &mut K,
) -> SpeechResult<Option<StopReason>>
where
    K: TranscriptSink + ?Sized,
{
    if let Some(message) = response.error {
        return Err(SpeechError::Recognition(message));
    }
    for result in response.results.iter().filter(|r| r.is_final) {
        let (transcript, stop) = session.on_final_result(result);
        sink.deliver(transcript);
        if stop.is_some() {
            return Ok(stop);
        }
    }
    Ok(None)
}

async fn produce<A: AudioSource>(mut source: A, tx: mpsc::Sender<Bytes>, pace: Duration) {
    let mut ticker = (!pace.is_zero()).then(|| tokio::time::interval(pace));
    loop {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }
        match source.read_chunk().await {
            Ok(Some(chunk)) => {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("could not read audio, treating input as finished: {}", e);
                break;
            }
        }
    }
}
