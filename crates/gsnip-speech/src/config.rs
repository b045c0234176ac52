//! Audio format and stream limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SAMPLE_RATE_HERTZ: u32 = 44_100;
pub const CHANNELS: u32 = 1;
pub const BYTES_PER_SAMPLE: u32 = 2;
pub const BYTES_PER_SECOND: usize = (SAMPLE_RATE_HERTZ * CHANNELS * BYTES_PER_SAMPLE) as usize;

/// Every chunk read from the source covers this much audio.
pub const CHUNK_DURATION_MS: i64 = 1_000;

/// Streams are closed just under the service's ~5 minute limit.
pub const STREAM_TIME_LIMIT: Duration = Duration::from_secs(290);

/// Sent once at the start of every stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            encoding: "LINEAR16".to_string(),
            sample_rate_hertz: SAMPLE_RATE_HERTZ,
            language_code: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub recognition: RecognitionConfig,
    /// A stream is half-closed once it has been open this long.
    pub stream_limit: Duration,
    /// Pace at which the producer reads chunks; zero reads as fast as the
    /// source allows.
    pub chunk_interval: Duration,
    pub chunk_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig::default(),
            stream_limit: STREAM_TIME_LIMIT,
            chunk_interval: Duration::from_millis(CHUNK_DURATION_MS as u64),
            chunk_bytes: BYTES_PER_SECOND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_of_mono_linear16() {
        assert_eq!(BYTES_PER_SECOND, 88_200);
        let json = serde_json::to_value(RecognitionConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "encoding": "LINEAR16",
                "sampleRateHertz": 44100,
                "languageCode": "en-US"
            })
        );
    }
}
