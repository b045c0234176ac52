//! Cloud Speech-to-Text v1 over gRPC.
//!
//! Each [`SpeechTransport::open`] starts one `StreamingRecognize` call on a
//! shared TLS channel. Requests flow through an unbounded channel whose
//! first message is always the streaming config; dropping the sender
//! half-closes the call.

use crate::config::RecognitionConfig;
use crate::error::{SpeechError, SpeechResult};
use crate::transport::{
    AudioSink, RecognitionResult, RecognizeStream, ResponseStream, SpeechTransport,
    StreamingResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use google_api_proto::google::cloud::speech::v1 as speech;
use gsnip_gcp::GcpClient;
use log::{debug, error, info};
use speech::recognition_config::AudioEncoding;
use speech::speech_client::SpeechClient;
use speech::streaming_recognize_request::StreamingRequest;
use speech::{StreamingRecognizeRequest, StreamingRecognizeResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, ClientTlsConfig};

pub const SPEECH_ENDPOINT: &str = "https://speech.googleapis.com";

pub struct GoogleSpeechTransport {
    client: Arc<GcpClient>,
    channel: Channel,
}

impl GoogleSpeechTransport {
    /// Dial `endpoint`; bearer tokens come from `client` on every stream.
    pub async fn connect(client: Arc<GcpClient>, endpoint: &str) -> SpeechResult<Self> {
        let channel = Channel::from_shared(endpoint.to_string())
            .map_err(|e| {
                error!("invalid speech endpoint {}: {}", endpoint, e);
                SpeechError::Transport(format!("invalid endpoint '{}': {}", endpoint, e))
            })?
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| SpeechError::Transport(format!("TLS setup failed: {}", e)))?
            .connect()
            .await
            .map_err(|e| {
                error!("cannot reach {}: {}", endpoint, e);
                SpeechError::Transport(format!("cannot connect to '{}': {}", endpoint, e))
            })?;
        info!("connected to {}", endpoint);
        Ok(Self { client, channel })
    }
}

#[async_trait]
impl SpeechTransport for GoogleSpeechTransport {
    async fn open(&self, config: &RecognitionConfig) -> SpeechResult<RecognizeStream> {
        let token = self.client.token().await?;
        let auth: MetadataValue<_> = format!("Bearer {}", token)
            .parse()
            .map_err(|_| SpeechError::Transport("access token is not a valid header".into()))?;
        let with_auth = move |mut req: tonic::Request<()>| -> Result<_, tonic::Status> {
            req.metadata_mut().insert("authorization", auth.clone());
            Ok(req)
        };
        let mut speech_client = SpeechClient::with_interceptor(self.channel.clone(), with_auth);

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(config_request(config))
            .map_err(|_| SpeechError::Transport("request channel closed".into()))?;

        debug!(
            "opening StreamingRecognize ({}, {} Hz)",
            config.encoding, config.sample_rate_hertz
        );
        let responses = speech_client
            .streaming_recognize(UnboundedReceiverStream::new(rx))
            .await
            .map_err(status_error)?
            .into_inner();

        Ok(RecognizeStream {
            audio: Box::new(GrpcAudio { tx: Some(tx) }),
            responses: Box::new(GrpcResponses { inner: responses }),
        })
    }
}

// ── Stream halves ───────────────────────────────────────────────────────

struct GrpcAudio {
    tx: Option<mpsc::UnboundedSender<StreamingRecognizeRequest>>,
}

#[async_trait]
impl AudioSink for GrpcAudio {
    async fn send_audio(&mut self, chunk: Bytes) -> SpeechResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| SpeechError::Transport("audio sent after half-close".into()))?;
        tx.send(audio_request(chunk))
            .map_err(|_| SpeechError::Transport("StreamingRecognize call has ended".into()))
    }

    async fn close_send(&mut self) -> SpeechResult<()> {
        self.tx = None;
        Ok(())
    }
}

struct GrpcResponses {
    inner: tonic::Streaming<StreamingRecognizeResponse>,
}

#[async_trait]
impl ResponseStream for GrpcResponses {
    async fn recv(&mut self) -> SpeechResult<Option<StreamingResponse>> {
        match self.inner.message().await {
            Ok(Some(msg)) => Ok(Some(to_response(msg))),
            Ok(None) => Ok(None),
            Err(status) => Err(status_error(status)),
        }
    }
}

// ── Message mapping ─────────────────────────────────────────────────────

fn config_request(config: &RecognitionConfig) -> StreamingRecognizeRequest {
    let encoding =
        AudioEncoding::from_str_name(&config.encoding).unwrap_or(AudioEncoding::Linear16);
    let recognition = speech::RecognitionConfig {
        encoding: encoding as i32,
        sample_rate_hertz: config.sample_rate_hertz as i32,
        language_code: config.language_code.clone(),
        ..Default::default()
    };
    StreamingRecognizeRequest {
        streaming_request: Some(StreamingRequest::StreamingConfig(
            speech::StreamingRecognitionConfig {
                config: Some(recognition),
                interim_results: true,
                ..Default::default()
            },
        )),
    }
}

fn audio_request(chunk: Bytes) -> StreamingRecognizeRequest {
    StreamingRecognizeRequest {
        streaming_request: Some(StreamingRequest::AudioContent(chunk)),
    }
}

fn to_response(msg: StreamingRecognizeResponse) -> StreamingResponse {
    let error = msg
        .error
        .filter(|status| status.code != 0)
        .map(|status| status.message);
    let results = msg
        .results
        .into_iter()
        .map(|r| RecognitionResult {
            transcript: r
                .alternatives
                .into_iter()
                .next()
                .map(|a| a.transcript)
                .unwrap_or_default(),
            is_final: r.is_final,
            result_end_offset: r
                .result_end_time
                .map(|d| Duration::new(d.seconds.max(0) as u64, d.nanos.max(0) as u32))
                .unwrap_or_default(),
        })
        .collect();
    StreamingResponse { results, error }
}

fn status_error(status: tonic::Status) -> SpeechError {
    SpeechError::Transport(format!("{:?}: {}", status.code(), status.message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsnip_gcp::{ClientConfig, CredentialsSource};
    use speech::{SpeechRecognitionAlternative, StreamingRecognitionResult};

    #[test]
    fn first_request_carries_the_recognition_config() {
        let request = config_request(&RecognitionConfig::default());
        let Some(StreamingRequest::StreamingConfig(streaming)) = request.streaming_request else {
            panic!("expected a streaming config");
        };
        let config = streaming.config.unwrap();
        assert_eq!(config.encoding, AudioEncoding::Linear16 as i32);
        assert_eq!(config.sample_rate_hertz, 44_100);
        assert_eq!(config.language_code, "en-US");
        assert!(streaming.interim_results);
    }

    #[test]
    fn audio_requests_wrap_raw_bytes() {
        let request = audio_request(Bytes::from_static(b"\x01\x02"));
        assert_eq!(
            request.streaming_request,
            Some(StreamingRequest::AudioContent(Bytes::from_static(b"\x01\x02")))
        );
    }

    #[test]
    fn responses_keep_the_top_alternative_and_end_offset() {
        let msg = StreamingRecognizeResponse {
            results: vec![StreamingRecognitionResult {
                alternatives: vec![
                    SpeechRecognitionAlternative {
                        transcript: "hello world".into(),
                        ..Default::default()
                    },
                    SpeechRecognitionAlternative {
                        transcript: "hollow world".into(),
                        ..Default::default()
                    },
                ],
                is_final: true,
                result_end_time: Some(prost_duration(12, 340_000_000)),
                ..Default::default()
            }],
            ..Default::default()
        };
        let response = to_response(msg);
        assert_eq!(response.error, None);
        assert_eq!(
            response.results,
            vec![RecognitionResult::final_result("hello world", Duration::from_millis(12_340))]
        );
    }

    #[test]
    fn in_band_status_becomes_an_error() {
        let msg = StreamingRecognizeResponse {
            error: Some(google_api_proto::google::rpc::Status {
                code: 11,
                message: "Exceeded maximum allowed stream duration".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let response = to_response(msg);
        assert!(response.results.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Exceeded maximum allowed stream duration")
        );

        let ok = StreamingRecognizeResponse {
            error: Some(google_api_proto::google::rpc::Status::default()),
            ..Default::default()
        };
        assert_eq!(to_response(ok).error, None);
    }

    #[test]
    fn grpc_status_is_reported_as_transport_error() {
        let err = status_error(tonic::Status::permission_denied("speech API disabled"));
        assert!(matches!(err, SpeechError::Transport(ref m) if m.contains("speech API disabled")));
    }

    #[tokio::test]
    async fn malformed_endpoint_is_rejected() {
        let config =
            ClientConfig::default().with_credentials(CredentialsSource::StaticToken("t".into()));
        let client = Arc::new(GcpClient::new(config).unwrap());
        let result = GoogleSpeechTransport::connect(client, "not a uri").await;
        assert!(matches!(result, Err(SpeechError::Transport(_))));
    }

    fn prost_duration(seconds: i64, nanos: i32) -> prost_types::Duration {
        prost_types::Duration { seconds, nanos }
    }
}
