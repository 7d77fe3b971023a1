//! Final encodes and stills.

use filter_graph::{Filter, FilterChain, format_number};

use super::primary_duration;
use crate::pipeline::compiled::{CompiledPipeline, FilterSpec, InputBinding};
use crate::pipeline::compiler::{CompileContext, ResolvedInput};
use crate::pipeline::operation::{AudioFormat, ExtractAudioParams, ThumbnailParams, TranscodeParams};
use crate::{Error, Result};

pub(crate) fn transcode(
    params: &TranscodeParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let (w, h) = params.platform.frame_size();
    let chain = FilterChain::new()
        .then(
            Filter::new("scale")
                .positional(w)
                .positional(h)
                .arg("force_original_aspect_ratio", "decrease"),
        )
        .then(
            Filter::new("pad")
                .positional(w)
                .positional(h)
                .positional("(ow-iw)/2")
                .positional("(oh-ih)/2"),
        )
        .then(Filter::new("setsar").positional(1u32));

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .filters(FilterSpec::Video(chain))
        .options([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-crf".to_string(),
            params.quality.crf().to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ])
        .expected_duration(primary_duration(inputs)))
}

pub(crate) fn thumbnail(
    params: &ThumbnailParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    if !(params.timestamp_secs.is_finite() && params.timestamp_secs >= 0.0) {
        return Err(Error::compilation("timestamp_secs", "must not be negative"));
    }
    if params.width == 0 {
        return Err(Error::compilation("width", "must be positive"));
    }
    if !(1..=31).contains(&params.quality) {
        return Err(Error::compilation("quality", "must be between 1 and 31"));
    }
    if let Some(duration) = primary_duration(inputs)
        && params.timestamp_secs >= duration
    {
        return Err(Error::compilation(
            "timestamp_secs",
            format!("is past the end of the video ({}s)", format_number(duration)),
        ));
    }

    let chain = FilterChain::new().then(
        Filter::new("scale")
            .positional(params.width)
            .positional(-1i64),
    );

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(
            InputBinding::file(&inputs[0].path)
                .with_pre_args(["-ss".to_string(), format_number(params.timestamp_secs)]),
        )
        .filters(FilterSpec::Video(chain))
        .options([
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            params.quality.to_string(),
        ]))
}

pub(crate) fn extract_audio(
    params: &ExtractAudioParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let mut options = vec!["-vn", "-c:a", params.format.codec()];
    match params.format {
        AudioFormat::Mp3 => options.extend(["-q:a", "2"]),
        AudioFormat::Aac => options.extend(["-b:a", "192k"]),
        AudioFormat::Wav | AudioFormat::Flac => {}
    }

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .map("0:a:0")
        .options(options)
        .expected_duration(primary_duration(inputs)))
}
