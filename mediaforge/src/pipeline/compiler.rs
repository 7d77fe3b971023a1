//! Operation → engine invocation.
//!
//! Compilation is a pure function of the operation, the resolved inputs and
//! the [`CompileContext`]. It never touches the filesystem; files the engine
//! needs (concat lists, caption documents) are returned as
//! [`TransientArtifact`](super::TransientArtifact)s for the caller to write.

use std::path::{Path, PathBuf};

use super::compiled::CompiledPipeline;
use super::operation::Operation;
use super::templates;
use crate::{Error, Result};

/// A referenced asset after lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub path: PathBuf,
    /// Probed duration in seconds, when known.
    pub duration: Option<f64>,
}

impl ResolvedInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds).filter(|s| s.is_finite() && *s > 0.0);
        self
    }
}

/// Per-job settings for one compilation.
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub job_id: String,
    /// Where the engine writes the result.
    pub output: PathBuf,
    /// Directory for transient artifacts.
    pub temp_dir: PathBuf,
    /// Clip length assumed when a duration could not be probed.
    pub clip_duration_estimate: f64,
}

impl CompileContext {
    /// Path of a transient artifact owned by this job.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.temp_dir.join(format!("{}_{}", self.job_id, suffix))
    }
}

/// Compile `operation` over `inputs` (in [`Operation::references`] order).
pub fn compile(
    operation: &Operation,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let expected = operation.references().len();
    if inputs.len() != expected {
        return Err(Error::Other(format!(
            "{} expects {} resolved inputs, got {}",
            operation.kind(),
            expected,
            inputs.len()
        )));
    }

    match operation {
        Operation::Concat(p) => templates::concat::compile(p, inputs, ctx),
        Operation::MergeAudio(p) => templates::video::merge_audio(p, inputs, ctx),
        Operation::KenBurns(p) => templates::image::ken_burns(p, inputs, ctx),
        Operation::BlurBackground(p) => templates::image::blur_background(p, inputs, ctx),
        Operation::AddOverlay(p) => templates::video::add_overlay(p, inputs, ctx),
        Operation::ApplyFilter(p) => templates::video::apply_filter(p, inputs, ctx),
        Operation::AddFade(p) => templates::video::add_fade(p, inputs, ctx),
        Operation::Compose(p) => templates::captioned::compose(p, inputs, ctx),
        Operation::ColorGrade(p) => templates::video::color_grade(p, inputs, ctx),
        Operation::ChromaKey(p) => templates::video::chroma_key(p, inputs, ctx),
        Operation::Caption(p) => templates::captioned::caption(p, inputs, ctx),
        Operation::Transcode(p) => templates::delivery::transcode(p, inputs, ctx),
        Operation::Thumbnail(p) => templates::delivery::thumbnail(p, inputs, ctx),
        Operation::ExtractAudio(p) => templates::delivery::extract_audio(p, inputs, ctx),
    }
}

/// Parse `RRGGBB` (optionally prefixed by `#` or `0x`) into its channels.
pub(crate) fn parse_hex_color(parameter: &str, raw: &str) -> Result<(u8, u8, u8)> {
    let hex = raw.trim();
    let hex = hex
        .strip_prefix('#')
        .or_else(|| hex.strip_prefix("0x"))
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::compilation(
            parameter,
            format!("'{raw}' is not an RRGGBB color"),
        ));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => Ok((r, g, b)),
        _ => Err(Error::compilation(
            parameter,
            format!("'{raw}' is not an RRGGBB color"),
        )),
    }
}

/// Engine color literal, `0xRRGGBB`.
pub(crate) fn engine_color(parameter: &str, raw: &str) -> Result<String> {
    let (r, g, b) = parse_hex_color(parameter, raw)?;
    Ok(format!("0x{r:02X}{g:02X}{b:02X}"))
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
