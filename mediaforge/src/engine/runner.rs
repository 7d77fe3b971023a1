//! External engine process.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::progress::ProgressReporter;
use crate::{Error, Result};

/// Exit code reported when the process was killed by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// One engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInvocation {
    /// Arguments, without the program name.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// Runs the media engine to completion.
#[async_trait]
pub trait EngineRunner: Send + Sync {
    /// Run `invocation` and return its exit code. Errors mean the process
    /// could not be started or its output could not be drained.
    async fn run(&self, invocation: &EngineInvocation, progress: &ProgressReporter) -> Result<i32>;
}

/// Spawns the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    ffmpeg_path: String,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

fn log_engine_line(job_id: &str, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if line.to_ascii_lowercase().contains("error") {
        warn!(job_id, "ffmpeg: {}", line);
    } else {
        debug!(job_id, "ffmpeg: {}", line);
    }
}

#[async_trait]
impl EngineRunner for FfmpegRunner {
    async fn run(&self, invocation: &EngineInvocation, progress: &ProgressReporter) -> Result<i32> {
        let job_id = progress.job_id();
        debug!(job_id, args = ?invocation.args, "Launching ffmpeg");

        let mut cmd = process_utils::media_command(
            &self.ffmpeg_path,
            &invocation.args,
            invocation.working_dir.as_deref(),
        );
        let child = cmd
            .spawn()
            .map_err(|e| Error::Other(format!("failed to launch {}: {}", self.ffmpeg_path, e)))?;

        let status = process_utils::wait_streaming(
            child,
            |line| progress.report_line(line),
            |line| log_engine_line(job_id, line),
        )
        .await?;

        Ok(status.code().unwrap_or(SIGNAL_EXIT_CODE))
    }
}
