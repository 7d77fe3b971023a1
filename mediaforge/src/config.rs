//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default estimate of a clip's length when its duration cannot be probed.
pub const DEFAULT_CLIP_DURATION_ESTIMATE_SECS: f64 = 5.0;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding uploaded assets and job outputs.
    pub storage_dir: PathBuf,
    /// Directory for transient compilation artifacts (concat lists, captions).
    pub temp_dir: PathBuf,
    /// Directory for rotated log files.
    pub log_dir: PathBuf,
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Path to the ffprobe binary.
    pub ffprobe_path: String,
    /// Server bind address.
    pub bind_address: String,
    /// Server port.
    pub port: u16,
    /// Request body size limit in bytes (uploads included).
    pub body_limit: usize,
    /// Timeout for a single callback delivery.
    pub webhook_timeout: Duration,
    /// Simulated speech synthesis latency.
    pub tts_delay: Duration,
    /// Per-clip duration assumed for crossfade offsets when probing fails.
    pub clip_duration_estimate_secs: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./storage"),
            temp_dir: PathBuf::from("./tmp"),
            log_dir: PathBuf::from("./logs"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            body_limit: 512 * 1024 * 1024, // 512MB
            webhook_timeout: Duration::from_secs(10),
            tts_delay: Duration::from_millis(1500),
            clip_duration_estimate_secs: DEFAULT_CLIP_DURATION_ESTIMATE_SECS,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `MEDIAFORGE_STORAGE_DIR`, `MEDIAFORGE_TEMP_DIR`, `MEDIAFORGE_LOG_DIR`
    /// - `FFMPEG_PATH`, `FFPROBE_PATH`
    /// - `API_BIND_ADDRESS`, `API_PORT`, `API_BODY_LIMIT_BYTES`
    /// - `WEBHOOK_TIMEOUT_SECS`, `TTS_DELAY_MS`
    /// - `MEDIAFORGE_CLIP_DURATION_ESTIMATE_SECS`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = text("MEDIAFORGE_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(dir) = text("MEDIAFORGE_TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(dir) = text("MEDIAFORGE_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(path) = text("FFMPEG_PATH") {
            config.ffmpeg_path = path;
        }
        if let Some(path) = text("FFPROBE_PATH") {
            config.ffprobe_path = path;
        }
        if let Some(addr) = text("API_BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Some(port) = parsed(&text, "API_PORT") {
            config.port = port;
        }
        if let Some(limit) = parsed(&text, "API_BODY_LIMIT_BYTES") {
            config.body_limit = limit;
        }
        if let Some(secs) = parsed(&text, "WEBHOOK_TIMEOUT_SECS") {
            config.webhook_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parsed(&text, "TTS_DELAY_MS") {
            config.tts_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parsed::<f64, _>(&text, "MEDIAFORGE_CLIP_DURATION_ESTIMATE_SECS") {
            if secs > 0.0 && secs.is_finite() {
                config.clip_duration_estimate_secs = secs;
            } else {
                warn!(value = secs, "Ignoring non-positive clip duration estimate");
            }
        }

        config
    }
}

fn parsed<T, F>(text: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = text(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.clip_duration_estimate_secs, 5.0);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_PORT", "9000"),
            ("FFMPEG_PATH", "/opt/ffmpeg"),
            ("MEDIAFORGE_STORAGE_DIR", "/data"),
            ("TTS_DELAY_MS", "10"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(config.storage_dir, PathBuf::from("/data"));
        assert_eq!(config.tts_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_PORT", "not-a-port"),
            ("MEDIAFORGE_CLIP_DURATION_ESTIMATE_SECS", "-3"),
            ("API_BIND_ADDRESS", "   "),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.clip_duration_estimate_secs, 5.0);
        assert_eq!(config.bind_address, "0.0.0.0");
    }
}
