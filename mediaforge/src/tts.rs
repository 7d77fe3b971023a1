//! Text-to-speech stand-in.
//!
//! No real synthesis happens: after a configurable delay a silent WAV whose
//! length follows the word count is written to the output path.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::{Error, Result};

pub const SAMPLE_RATE: u32 = 16_000;
const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;
const SECONDS_PER_WORD: f64 = 0.4;
const MIN_SECONDS: f64 = 1.0;

/// Produces a spoken rendition of text as an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<()>;
}

/// Spoken length of `text`.
pub fn speech_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count() as f64;
    Duration::from_secs_f64((words * SECONDS_PER_WORD).max(MIN_SECONDS))
}

/// A PCM WAV file of `duration` silence.
pub fn silent_wav(duration: Duration) -> BytesMut {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let samples = (duration.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as u32;
    let data_len = samples * u32::from(block_align);

    let mut wav = BytesMut::with_capacity(44 + data_len as usize);
    wav.put_slice(b"RIFF");
    wav.put_u32_le(36 + data_len);
    wav.put_slice(b"WAVE");
    wav.put_slice(b"fmt ");
    wav.put_u32_le(16);
    wav.put_u16_le(1);
    wav.put_u16_le(CHANNELS);
    wav.put_u32_le(SAMPLE_RATE);
    wav.put_u32_le(SAMPLE_RATE * u32::from(block_align));
    wav.put_u16_le(block_align);
    wav.put_u16_le(BITS_PER_SAMPLE);
    wav.put_slice(b"data");
    wav.put_u32_le(data_len);
    wav.put_bytes(0, data_len as usize);
    wav
}

#[derive(Debug, Clone)]
pub struct SimulatedSynthesizer {
    delay: Duration,
}

impl SimulatedSynthesizer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SpeechSynthesizer for SimulatedSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, output: &Path) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        let duration = speech_duration(text);
        debug!(voice, seconds = duration.as_secs_f64(), "Writing simulated speech");
        tokio::fs::write(output, silent_wav(duration))
            .await
            .map_err(|e| Error::io_path("writing", output, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_duration_follows_word_count() {
        assert_eq!(speech_duration("one two three four five"), Duration::from_secs(2));
        assert_eq!(speech_duration("hi"), Duration::from_secs(1));
        assert_eq!(speech_duration(""), Duration::from_secs(1));
    }

    #[test]
    fn test_wav_header() {
        let wav = silent_wav(Duration::from_secs(2));
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        let data_len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_len, 64_000);
        assert_eq!(wav.len(), 44 + 64_000);
        let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(rate, SAMPLE_RATE);
    }

    #[tokio::test]
    async fn test_simulated_synthesizer_writes_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("speech.wav");
        SimulatedSynthesizer::new(Duration::ZERO)
            .synthesize("hello there", "default", &output)
            .await
            .unwrap();
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.len(), 44 + 32_000);
    }
}
