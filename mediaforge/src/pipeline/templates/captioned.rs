//! Operations that burn generated captions into the picture.

use filter_graph::{Filter, FilterChain, Value, format_number};

use crate::captions::{self, CaptionConfig};
use crate::pipeline::compiled::{CompiledPipeline, FilterSpec, InputBinding, TransientArtifact};
use crate::pipeline::compiler::{
    CompileContext, ResolvedInput, engine_color, parse_hex_color, path_string,
};
use crate::pipeline::operation::{CaptionParams, CaptionStyle, ComposeParams};
use crate::{Error, Result};

const PORTRAIT_WIDTH: u32 = 1080;
const PORTRAIT_HEIGHT: u32 = 1920;

/// Caption document for `text`, rejected when it holds no words.
fn caption_document(text: &str, parameter: &str, ctx: &CompileContext) -> Result<TransientArtifact> {
    let cues = captions::generate(text, &CaptionConfig::default())?;
    if cues.is_empty() {
        return Err(Error::compilation(parameter, "must contain at least one word"));
    }
    Ok(TransientArtifact {
        path: ctx.artifact_path("captions.srt"),
        contents: captions::to_srt(&cues),
    })
}

/// ASS `force_style`. Colors are written `&HAABBGGRR`.
fn force_style(style: &CaptionStyle) -> Result<String> {
    let (r, g, b) = parse_hex_color("caption_style.font_color", &style.font_color)?;
    Ok(format!(
        "FontSize={},PrimaryColour=&H00{b:02X}{g:02X}{r:02X},Outline={},Alignment={}",
        style.font_size,
        format_number(style.outline),
        style.position.alignment()
    ))
}

fn subtitles(document: &TransientArtifact, style: &CaptionStyle) -> Result<Filter> {
    Ok(Filter::new("subtitles")
        .arg("filename", Value::path(path_string(&document.path)))
        .arg("force_style", Value::expr(force_style(style)?)))
}

pub(crate) fn compose(
    params: &ComposeParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let document = caption_document(&params.subtitle_text, "subtitle_text", ctx)?;
    let background = engine_color("background_color", &params.background_color)?;

    let chain = FilterChain::new()
        .then(
            Filter::new("scale")
                .positional(PORTRAIT_WIDTH)
                .positional(PORTRAIT_HEIGHT)
                .arg("force_original_aspect_ratio", "decrease"),
        )
        .then(
            Filter::new("pad")
                .positional(PORTRAIT_WIDTH)
                .positional(PORTRAIT_HEIGHT)
                .positional("(ow-iw)/2")
                .positional("(oh-ih)/2")
                .arg("color", background),
        )
        .then(subtitles(&document, &params.caption_style)?);

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::looped(&inputs[0].path))
        .input(InputBinding::file(&inputs[1].path))
        .filters(FilterSpec::Video(chain))
        .options([
            "-c:v", "libx264", "-c:a", "aac", "-shortest", "-pix_fmt", "yuv420p",
        ])
        .expected_duration(inputs[1].duration)
        .artifact(document))
}

pub(crate) fn caption(
    params: &CaptionParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    let document = caption_document(&params.text, "text", ctx)?;
    let chain = FilterChain::new().then(subtitles(&document, &params.caption_style)?);

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .filters(FilterSpec::Video(chain))
        .options(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "copy"])
        .expected_duration(inputs[0].duration)
        .artifact(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::operation::CaptionPosition;
    use crate::pipeline::templates::testing::{ctx, inputs, value_after};

    fn compose_params(text: &str) -> ComposeParams {
        ComposeParams {
            image_id: "i".into(),
            audio_id: "a".into(),
            subtitle_text: text.into(),
            background_color: "102030".into(),
            caption_style: CaptionStyle {
                font_color: "FF8000".into(),
                position: CaptionPosition::Top,
                ..CaptionStyle::default()
            },
        }
    }

    #[test]
    fn test_compose_portrait_with_captions() {
        let media = vec![
            ResolvedInput::new("/storage/i.png"),
            ResolvedInput::new("/storage/a.mp3").with_duration(7.5),
        ];
        let pipeline = compose(
            &compose_params("one two three four five six seven eight nine ten"),
            &media,
            &ctx(),
        )
        .unwrap();

        assert_eq!(
            pipeline.filter_string().unwrap(),
            "scale=1080:1920:force_original_aspect_ratio=decrease,\
             pad=1080:1920:(ow-iw)/2:(oh-ih)/2:color=0x102030,\
             subtitles=filename='/tmp/mf/job_captions.srt':\
             force_style='FontSize=24,PrimaryColour=&H000080FF,Outline=2,Alignment=8'"
        );
        assert_eq!(pipeline.artifacts.len(), 1);
        assert_eq!(
            pipeline.artifacts[0].contents,
            "1\n00:00:00,000 --> 00:00:02,000\none two three four five\n\n\
             2\n00:00:02,000 --> 00:00:04,000\nsix seven eight nine ten\n\n"
        );
        assert_eq!(value_after(&pipeline.to_args(), "-loop"), "1");
        assert_eq!(pipeline.expected_duration, Some(7.5));
    }

    #[test]
    fn test_compose_rejects_blank_text() {
        let err = compose(&compose_params("   "), &inputs(&["i.png", "a.mp3"]), &ctx()).unwrap_err();
        assert!(matches!(err, Error::Compilation { ref parameter, .. } if parameter == "subtitle_text"));
    }

    #[test]
    fn test_compose_rejects_bad_background() {
        let mut params = compose_params("hello");
        params.background_color = "purple".into();
        let err = compose(&params, &inputs(&["i.png", "a.mp3"]), &ctx()).unwrap_err();
        assert!(matches!(err, Error::Compilation { ref parameter, .. } if parameter == "background_color"));
    }

    #[test]
    fn test_caption_over_video() {
        let params = CaptionParams {
            video_id: "v".into(),
            text: "hello world".into(),
            caption_style: CaptionStyle::default(),
        };
        let pipeline = caption(&params, &inputs(&["v.mp4"]), &ctx()).unwrap();
        assert!(pipeline.filter_string().unwrap().starts_with("subtitles=filename="));
        assert!(pipeline.filter_string().unwrap().contains("Alignment=2"));
        assert_eq!(value_after(&pipeline.to_args(), "-c:a"), "copy");
    }

    #[test]
    fn test_caption_rejects_bad_font_color() {
        let params = CaptionParams {
            video_id: "v".into(),
            text: "hello".into(),
            caption_style: CaptionStyle {
                font_color: "white".into(),
                ..CaptionStyle::default()
            },
        };
        let err = caption(&params, &inputs(&["v.mp4"]), &ctx()).unwrap_err();
        assert!(
            matches!(err, Error::Compilation { ref parameter, .. } if parameter == "caption_style.font_color")
        );
    }

    #[test]
    fn test_caption_outline_is_passed_verbatim() {
        let params = CaptionParams {
            video_id: "v".into(),
            text: "hello".into(),
            caption_style: CaptionStyle {
                outline: -1.0,
                ..CaptionStyle::default()
            },
        };
        let pipeline = caption(&params, &inputs(&["v.mp4"]), &ctx()).unwrap();
        assert!(pipeline.filter_string().unwrap().contains("Outline=-1,"));
    }
}
