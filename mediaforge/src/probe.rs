//! Container and stream metadata via ffprobe.

use std::ffi::OsStr;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Summary of a media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Seconds.
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec_name: Option<String>,
    /// Bits per second.
    pub bit_rate: Option<u64>,
    /// Frames per second.
    pub frame_rate: Option<f64>,
}

/// Describes media files.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    bit_rate: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

/// Evaluate an ffprobe rate such as `30000/1001` or `25`.
/// `0/0` and other non-positive rates yield `None`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_positive(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Build a [`MediaInfo`] from `ffprobe -print_format json` output.
///
/// Stream fields come from the first video stream, or the first stream of
/// any kind when there is no video. Format-level values win for duration
/// and bit rate.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaInfo> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Probe(format!("unreadable ffprobe output: {e}")))?;

    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .or_else(|| output.streams.first());
    if stream.is_none() && output.format.is_none() {
        return Err(Error::Probe("ffprobe reported no streams".to_string()));
    }

    let format = output.format.as_ref();
    let duration = parse_positive(format.and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_positive(stream.and_then(|s| s.duration.as_deref())));
    let bit_rate = parse_positive(format.and_then(|f| f.bit_rate.as_deref()))
        .or_else(|| parse_positive(stream.and_then(|s| s.bit_rate.as_deref())))
        .map(|v| v as u64);
    let frame_rate = stream.and_then(|s| {
        s.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    Ok(MediaInfo {
        duration,
        width: stream.and_then(|s| s.width),
        height: stream.and_then(|s| s.height),
        codec_name: stream.and_then(|s| s.codec_name.clone()),
        bit_rate,
        frame_rate,
    })
}

/// Runs the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let mut args: Vec<&OsStr> = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .into_iter()
        .map(OsStr::new)
        .collect();
        args.push(path.as_os_str());

        let mut cmd = process_utils::media_command(&self.ffprobe_path, args, None);

        let output = process_utils::run_drained(&mut cmd)
            .await
            .map_err(|e| Error::Probe(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Probe(format!(
                "ffprobe exited with {:?}: {}",
                output.code(),
                output.stderr_lossy().trim()
            )));
        }

        let info = parse_ffprobe_json(&output.stdout_lossy())?;
        debug!(path = %path.display(), ?info, "Probed media");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "audio", "codec_name": "aac", "bit_rate": "128000", "duration": "9.98"},
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001", "duration": "10.01"}
        ],
        "format": {"duration": "10.010000", "bit_rate": "4500000"}
    }"#;

    #[rstest]
    #[case("25", Some(25.0))]
    #[case("25/1", Some(25.0))]
    #[case("0/0", None)]
    #[case("abc", None)]
    fn test_parse_frame_rate(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_frame_rate(raw), expected);
    }

    #[test]
    fn test_ntsc_frame_rate() {
        let rate = parse_frame_rate("30000/1001").unwrap();
        assert!((rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_prefers_video_stream() {
        let info = parse_ffprobe_json(SAMPLE).unwrap();
        assert_eq!(info.codec_name.as_deref(), Some("h264"));
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.height, Some(1080));
        assert_eq!(info.duration, Some(10.01));
        assert_eq!(info.bit_rate, Some(4_500_000));
        assert!(info.frame_rate.is_some());
    }

    #[test]
    fn test_audio_only_file() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "mp3", "duration": "3.5"}]}"#;
        let info = parse_ffprobe_json(json).unwrap();
        assert_eq!(info.codec_name.as_deref(), Some("mp3"));
        assert_eq!(info.duration, Some(3.5));
        assert_eq!(info.width, None);
    }

    #[test]
    fn test_garbage_is_probe_error() {
        assert!(matches!(parse_ffprobe_json("nope"), Err(Error::Probe(_))));
        assert!(matches!(
            parse_ffprobe_json(r#"{"streams": []}"#),
            Err(Error::Probe(_))
        ));
    }
}
