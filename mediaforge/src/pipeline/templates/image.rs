//! Operations that start from a still image.

use filter_graph::{Filter, FilterChain, GraphBuilder, Pad, StreamRef, Value, format_number};

use super::tidy;
use crate::pipeline::compiled::{CompiledPipeline, FilterSpec, InputBinding};
use crate::pipeline::compiler::{CompileContext, ResolvedInput};
use crate::pipeline::operation::{BlurBackgroundParams, KenBurnsParams, PanDirection};
use crate::{Error, Result};

const KEN_BURNS_FPS: u32 = 25;
const KEN_BURNS_SIZE: &str = "1920x1080";
/// Zoom added per output frame.
const ZOOM_STEP: f64 = 0.0015;

fn pan_expressions(direction: PanDirection) -> (&'static str, &'static str) {
    match direction {
        PanDirection::Center => ("(iw-iw/zoom)/2", "(ih-ih/zoom)/2"),
        PanDirection::Left => ("0", "(ih-ih/zoom)/2"),
        PanDirection::Right => ("iw-iw/zoom", "(ih-ih/zoom)/2"),
        PanDirection::Top => ("(iw-iw/zoom)/2", "0"),
        PanDirection::Bottom => ("(iw-iw/zoom)/2", "ih-ih/zoom"),
    }
}

pub(crate) fn ken_burns(
    params: &KenBurnsParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    if !(params.duration.is_finite() && params.duration > 0.0) {
        return Err(Error::compilation("duration", "must be a positive number of seconds"));
    }
    if !(params.zoom_start.is_finite() && params.zoom_start > 0.0) {
        return Err(Error::compilation("zoom_start", "must be a positive factor"));
    }
    if !(params.zoom_end > params.zoom_start) {
        return Err(Error::compilation(
            "zoom_end",
            format!(
                "must be greater than zoom_start ({})",
                format_number(params.zoom_start)
            ),
        ));
    }

    let (x, y) = pan_expressions(params.direction);
    let zoom = format!(
        "min(max(zoom,{})+{},{})",
        format_number(params.zoom_start),
        ZOOM_STEP,
        format_number(params.zoom_end)
    );
    let zoompan = Filter::new("zoompan")
        .arg("z", Value::expr(zoom))
        .arg("x", Value::expr(x))
        .arg("y", Value::expr(y))
        .arg("d", tidy(params.duration * f64::from(KEN_BURNS_FPS)).ceil())
        .arg("s", KEN_BURNS_SIZE)
        .arg("fps", KEN_BURNS_FPS);

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::looped(&inputs[0].path))
        .filters(FilterSpec::Video(FilterChain::new().then(zoompan)))
        .options([
            "-t".to_string(),
            format_number(params.duration),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ])
        .expected_duration(Some(params.duration)))
}

pub(crate) fn blur_background(
    params: &BlurBackgroundParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    if params.output_width == 0 || params.output_height == 0 {
        return Err(Error::compilation("output_width", "frame dimensions must be positive"));
    }
    if !(params.scale.is_finite() && params.scale > 0.0) {
        return Err(Error::compilation(
            "scale",
            format!("{} would scale the foreground to an empty frame", format_number(params.scale)),
        ));
    }
    if params.blur_strength.is_nan() || params.blur_strength < 0.0 {
        return Err(Error::compilation(
            "blur_strength",
            format!("{} is below the boxblur radius minimum of 0", format_number(params.blur_strength)),
        ));
    }
    let (w, h) = (params.output_width, params.output_height);
    let s = format_number(params.scale);

    let mut graph = GraphBuilder::new();
    let copies = graph.node_multi(
        Filter::new("split").positional(2u32),
        [Pad::from(StreamRef::video(0))],
        &["base", "front"],
    )?;
    let background = graph.chain(
        Pad::from(&copies[0]),
        [
            Filter::new("scale")
                .positional(w)
                .positional(h)
                .arg("force_original_aspect_ratio", "increase"),
            Filter::new("crop").positional(w).positional(h),
            Filter::new("boxblur").positional(params.blur_strength),
        ],
        "bg",
    )?;
    let foreground = graph.node(
        Filter::new("scale")
            .positional(format!("iw*{s}"))
            .positional(format!("ih*{s}"))
            .arg("force_original_aspect_ratio", "decrease"),
        [Pad::from(&copies[1])],
        "fg",
    )?;
    graph.node(
        Filter::new("overlay").positional("(W-w)/2").positional("(H-h)/2"),
        [Pad::from(background), Pad::from(foreground)],
        "vout",
    )?;
    let graph = graph.build()?;
    let output = graph.output().bracketed();

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&inputs[0].path))
        .filters(FilterSpec::Complex(graph))
        .map(output)
        .options(["-frames:v", "1", "-q:v", "2"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::templates::testing::{ctx, inputs, value_after};

    fn ken(zoom_start: f64, zoom_end: f64, direction: PanDirection) -> KenBurnsParams {
        KenBurnsParams {
            image_id: "i".into(),
            duration: 5.0,
            zoom_start,
            zoom_end,
            direction,
        }
    }

    #[test]
    fn test_ken_burns_filter() {
        let pipeline =
            ken_burns(&ken(1.0, 1.2, PanDirection::Center), &inputs(&["i.png"]), &ctx()).unwrap();
        assert_eq!(
            pipeline.filter_string().unwrap(),
            "zoompan=z='min(max(zoom,1)+0.0015,1.2)':x=(iw-iw/zoom)/2:y=(ih-ih/zoom)/2:\
             d=125:s=1920x1080:fps=25"
        );
        let args = pipeline.to_args();
        assert_eq!(value_after(&args, "-loop"), "1");
        assert_eq!(value_after(&args, "-t"), "5");
        assert_eq!(pipeline.expected_duration, Some(5.0));
    }

    #[test]
    fn test_ken_burns_pan_right() {
        let pipeline =
            ken_burns(&ken(1.0, 1.5, PanDirection::Right), &inputs(&["i.png"]), &ctx()).unwrap();
        assert!(pipeline.filter_string().unwrap().contains(":x=iw-iw/zoom:"));
    }

    #[test]
    fn test_ken_burns_rejects_non_increasing_zoom() {
        for (start, end) in [(1.2, 1.2), (1.5, 1.0), (1.0, f64::NAN)] {
            let err = ken_burns(&ken(start, end, PanDirection::Center), &inputs(&["i.png"]), &ctx())
                .unwrap_err();
            assert!(
                matches!(err, Error::Compilation { ref parameter, .. } if parameter == "zoom_end"),
                "{start} -> {end}"
            );
        }
    }

    #[test]
    fn test_blur_background_graph() {
        let params = BlurBackgroundParams {
            image_id: "i".into(),
            blur_strength: 20.0,
            scale: 0.8,
            output_width: 1080,
            output_height: 1920,
        };
        let pipeline = blur_background(&params, &inputs(&["i.png"]), &ctx()).unwrap();
        assert_eq!(
            pipeline.filter_string().unwrap(),
            "[0:v]split=2[base][front];\
             [base]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,boxblur=20[bg];\
             [front]scale=iw*0.8:ih*0.8:force_original_aspect_ratio=decrease[fg];\
             [bg][fg]overlay=(W-w)/2:(H-h)/2[vout]"
        );
        assert_eq!(value_after(&pipeline.to_args(), "-frames:v"), "1");
    }

    #[test]
    fn test_blur_background_rejects_negative_radius() {
        let params = BlurBackgroundParams {
            image_id: "i".into(),
            blur_strength: -1.0,
            scale: 0.8,
            output_width: 1080,
            output_height: 1920,
        };
        let err = blur_background(&params, &inputs(&["i.png"]), &ctx()).unwrap_err();
        assert!(matches!(err, Error::Compilation { ref parameter, .. } if parameter == "blur_strength"));
        assert!(err.to_string().contains("boxblur"), "{err}");
    }
}
