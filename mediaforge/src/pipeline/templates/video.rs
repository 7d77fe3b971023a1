//! Operations that transform an existing video.

use std::ops::RangeInclusive;

use filter_graph::{Filter, FilterChain, GraphBuilder, Pad, StreamRef, format_number};
use tracing::warn;

use super::{primary_duration, tidy};
use crate::pipeline::compiled::{CompiledPipeline, FilterSpec, InputBinding};
use crate::pipeline::compiler::{CompileContext, ResolvedInput, engine_color, parse_hex_color};
use crate::pipeline::operation::{
    AddFadeParams, AddOverlayParams, ApplyFilterParams, ChromaKeyParams, ColorEffect,
    ColorGradeParams, FadeType, FilterType, MergeAudioParams, OverlayPosition,
};
use crate::{Error, Result};

/// Option ranges of the engine's `colorkey` filter.
const COLORKEY_SIMILARITY: RangeInclusive<f64> = 0.00001..=1.0;
const COLORKEY_BLEND: RangeInclusive<f64> = 0.0..=1.0;

/// A single video re-encoded through a `-vf` chain, audio copied.
fn filtered(chain: FilterChain, inputs: &[ResolvedInput], ctx: &CompileContext) -> CompiledPipeline {
    CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .filters(FilterSpec::Video(chain))
        .options(["-c:a", "copy"])
        .expected_duration(primary_duration(inputs))
}

pub(crate) fn merge_audio(
    params: &MergeAudioParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let pipeline = CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .input(InputBinding::file(&inputs[1].path))
        .map("0:v:0");

    let pipeline = if params.replace_audio {
        pipeline.map("1:a:0")
    } else {
        let mut graph = GraphBuilder::new();
        let added = graph.node(
            Filter::new("volume").positional(params.audio_volume),
            [Pad::from(StreamRef::audio(1))],
            "a1",
        )?;
        graph.node(
            Filter::new("amix").arg("inputs", 2u32),
            [Pad::from(StreamRef::audio(0)), Pad::from(added)],
            "aout",
        )?;
        let graph = graph.build()?;
        let mixed = graph.output().bracketed();
        pipeline.filters(FilterSpec::Complex(graph)).map(mixed)
    };

    Ok(pipeline
        .options(["-c:v", "copy", "-shortest"])
        .expected_duration(primary_duration(inputs)))
}

fn overlay_coordinates(position: OverlayPosition, margin: f64) -> (String, String) {
    let m = format_number(margin);
    match position {
        OverlayPosition::TopLeft => (m.clone(), m),
        OverlayPosition::TopRight => (format!("W-w-{m}"), m),
        OverlayPosition::BottomLeft => (m.clone(), format!("H-h-{m}")),
        OverlayPosition::BottomRight => (format!("W-w-{m}"), format!("H-h-{m}")),
        OverlayPosition::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
    }
}

pub(crate) fn add_overlay(
    params: &AddOverlayParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let mut graph = GraphBuilder::new();
    let overlay = if (params.scale - 1.0).abs() > f64::EPSILON {
        if !(params.scale.is_finite() && params.scale > 0.0) {
            return Err(Error::compilation(
                "scale",
                format!("{} would scale the overlay to an empty frame", format_number(params.scale)),
            ));
        }
        let s = format_number(params.scale);
        let scaled = graph.node(
            Filter::new("scale")
                .positional(format!("iw*{s}"))
                .positional(format!("ih*{s}")),
            [Pad::from(StreamRef::video(1))],
            "ovr",
        )?;
        Pad::from(scaled)
    } else {
        Pad::from(StreamRef::video(1))
    };

    let (x, y) = overlay_coordinates(params.position, params.margin);
    graph.node(
        Filter::new("overlay").positional(x).positional(y),
        [Pad::from(StreamRef::video(0)), overlay],
        "vout",
    )?;
    let graph = graph.build()?;
    let output = graph.output().bracketed();

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .input(InputBinding::file(&inputs[1].path))
        .filters(FilterSpec::Complex(graph))
        .map(output)
        .map("0:a?")
        .options(["-c:a", "copy"])
        .expected_duration(primary_duration(inputs)))
}

pub(crate) fn apply_filter(
    params: &ApplyFilterParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let i = params.intensity;
    if !i.is_finite() {
        return Err(Error::compilation("intensity", "must be a finite number"));
    }
    let filter = match params.filter_type {
        FilterType::Brightness => Filter::new("eq").arg("brightness", tidy((i - 1.0) * 0.5)),
        FilterType::Contrast => Filter::new("eq").arg("contrast", i),
        FilterType::Saturation => Filter::new("eq").arg("saturation", i),
        FilterType::Blur => Filter::new("boxblur").positional(tidy(i * 5.0)),
        FilterType::Sharpen => Filter::new("unsharp")
            .positional(5u32)
            .positional(5u32)
            .positional(i)
            .positional(5u32)
            .positional(5u32)
            .positional(0u32),
    };
    Ok(filtered(FilterChain::new().then(filter), inputs, ctx))
}

pub(crate) fn add_fade(
    params: &AddFadeParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let fade_in = matches!(params.fade_type, FadeType::In | FadeType::Both);
    let fade_out = matches!(params.fade_type, FadeType::Out | FadeType::Both);
    for (enabled, parameter, value) in [
        (fade_in, "fade_in_duration", params.fade_in_duration),
        (fade_out, "fade_out_duration", params.fade_out_duration),
    ] {
        if enabled && (value.is_nan() || value < 0.0) {
            return Err(Error::compilation(
                parameter,
                format!("{} is outside the fade duration range [0, inf)", format_number(value)),
            ));
        }
    }

    let mut chain = FilterChain::new();
    if fade_in {
        chain = chain.then(
            Filter::new("fade")
                .arg("t", "in")
                .arg("st", 0u32)
                .arg("d", params.fade_in_duration),
        );
    }
    if fade_out {
        let duration = primary_duration(inputs).unwrap_or_else(|| {
            warn!(
                job_id = %ctx.job_id,
                estimate = ctx.clip_duration_estimate,
                "Video duration unknown, placing fade-out against the estimate"
            );
            ctx.clip_duration_estimate
        });
        let start = tidy((duration - params.fade_out_duration).max(0.0));
        chain = chain.then(
            Filter::new("fade")
                .arg("t", "out")
                .arg("st", start)
                .arg("d", params.fade_out_duration),
        );
    }
    Ok(filtered(chain, inputs, ctx))
}

fn color_grade_chain(effect: ColorEffect) -> FilterChain {
    match effect {
        ColorEffect::Cinematic => FilterChain::new()
            .then(
                Filter::new("eq")
                    .arg("contrast", 1.15)
                    .arg("saturation", 0.9)
                    .arg("brightness", -0.03),
            )
            .then(
                Filter::new("colorbalance")
                    .arg("rs", -0.05)
                    .arg("bs", 0.08)
                    .arg("rh", 0.08)
                    .arg("bh", -0.05),
            ),
        ColorEffect::Vintage => FilterChain::new()
            .then(Filter::new("curves").arg("preset", "vintage"))
            .then(Filter::new("eq").arg("saturation", 0.8)),
        ColorEffect::Warm => FilterChain::new().then(
            Filter::new("colorbalance")
                .arg("rs", 0.1)
                .arg("gs", 0.03)
                .arg("bs", -0.1)
                .arg("rm", 0.08)
                .arg("bm", -0.08),
        ),
        ColorEffect::Cool => FilterChain::new().then(
            Filter::new("colorbalance")
                .arg("rs", -0.1)
                .arg("gs", -0.03)
                .arg("bs", 0.1)
                .arg("rm", -0.08)
                .arg("bm", 0.08),
        ),
        ColorEffect::BlackWhite => FilterChain::new().then(Filter::new("hue").arg("s", 0u32)),
        ColorEffect::Vibrant => FilterChain::new().then(
            Filter::new("eq")
                .arg("saturation", 1.5)
                .arg("contrast", 1.05),
        ),
    }
}

pub(crate) fn color_grade(
    params: &ColorGradeParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    Ok(filtered(color_grade_chain(params.effect), inputs, ctx))
}

/// `colorkey` accepts `0xRRGGBB` or a named color.
fn key_color(raw: &str) -> Result<String> {
    let name = raw.trim();
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic()) {
        return match parse_hex_color("color", name) {
            Ok(_) => engine_color("color", name),
            Err(_) => Ok(name.to_ascii_lowercase()),
        };
    }
    engine_color("color", name)
}

pub(crate) fn chroma_key(
    params: &ChromaKeyParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let color = key_color(&params.color)?;
    for (parameter, value, range) in [
        ("similarity", params.similarity, COLORKEY_SIMILARITY),
        ("blend", params.blend, COLORKEY_BLEND),
    ] {
        if !range.contains(&value) {
            return Err(Error::compilation(
                parameter,
                format!(
                    "{} is outside the colorkey range [{}, {}]",
                    format_number(value),
                    format_number(*range.start()),
                    format_number(*range.end())
                ),
            ));
        }
    }

    let mut graph = GraphBuilder::new();
    let scaled = graph.node_multi(
        Filter::new("scale2ref"),
        [Pad::from(StreamRef::video(1)), Pad::from(StreamRef::video(0))],
        &["bg", "fg"],
    )?;
    let keyed = graph.node(
        Filter::new("colorkey")
            .positional(color)
            .positional(params.similarity)
            .positional(params.blend),
        [Pad::from(&scaled[1])],
        "keyed",
    )?;
    graph.node(
        Filter::new("overlay").arg("shortest", 1u32),
        [Pad::from(&scaled[0]), Pad::from(keyed)],
        "vout",
    )?;
    let graph = graph.build()?;
    let output = graph.output().bracketed();

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .input(InputBinding::file(&inputs[1].path))
        .filters(FilterSpec::Complex(graph))
        .map(output)
        .map("0:a?")
        .options(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "copy"])
        .expected_duration(primary_duration(inputs)))
}
