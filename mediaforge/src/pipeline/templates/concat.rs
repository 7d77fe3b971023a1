//! Clip concatenation, by stream copy or by crossfading.

use filter_graph::{Filter, GraphBuilder, Pad, StreamRef, format_number};

use super::tidy;
use crate::pipeline::compiled::{CompiledPipeline, FilterSpec, InputBinding, TransientArtifact};
use crate::pipeline::compiler::{CompileContext, ResolvedInput, path_string};
use crate::pipeline::operation::{ConcatParams, Transition, XfadeKind};
use crate::{Error, Result};

pub(crate) fn compile(
    params: &ConcatParams,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    if inputs.len() < 2 {
        return Err(Error::compilation(
            "video_ids",
            "at least two clips are required",
        ));
    }
    match params.transition {
        Transition::None => demuxer(inputs, ctx),
        Transition::Xfade(kind) => crossfade(kind, params.transition_duration, inputs, ctx),
    }
}

/// Concat demuxer list, one `file '<path>'` line per clip.
fn concat_list(inputs: &[ResolvedInput]) -> String {
    inputs
        .iter()
        .map(|input| {
            format!(
                "file '{}'\n",
                path_string(&input.path).replace('\'', "'\\''")
            )
        })
        .collect()
}

fn demuxer(inputs: &[ResolvedInput], ctx: &CompileContext) -> Result<CompiledPipeline> {
    let list = TransientArtifact {
        path: ctx.artifact_path("concat.txt"),
        contents: concat_list(inputs),
    };
    let total: Option<f64> = inputs.iter().map(|input| input.duration).sum();

    Ok(CompiledPipeline::new(ctx.output.clone())
        .input(InputBinding::file(&list.path).with_pre_args(["-f", "concat", "-safe", "0"]))
        .options(["-c", "copy"])
        .expected_duration(total)
        .artifact(list))
}

/// Start time of each transition: clip `i + 1` fades in once clips `0..=i`
/// have played, minus the overlap of every transition so far.
pub(crate) fn crossfade_offsets(durations: &[f64], transition: f64) -> Vec<f64> {
    let mut elapsed = 0.0;
    durations
        .iter()
        .take(durations.len().saturating_sub(1))
        .enumerate()
        .map(|(i, duration)| {
            elapsed += duration;
            tidy(elapsed - (i + 1) as f64 * transition)
        })
        .collect()
}

fn crossfade(
    kind: XfadeKind,
    transition: f64,
    inputs: &[ResolvedInput],
    ctx: &CompileContext,
) -> Result<CompiledPipeline> {
    if !(transition.is_finite() && transition > 0.0) {
        return Err(Error::compilation(
            "transition_duration",
            "must be a positive number of seconds",
        ));
    }
    let durations: Vec<f64> = inputs
        .iter()
        .map(|input| input.duration.unwrap_or(ctx.clip_duration_estimate))
        .collect();
    if let Some(shortest) = durations.iter().copied().reduce(f64::min)
        && transition >= shortest
    {
        return Err(Error::compilation(
            "transition_duration",
            format!(
                "must be shorter than every clip, the shortest runs {}s",
                format_number(shortest)
            ),
        ));
    }

    let mut graph = GraphBuilder::new();
    let mut previous = Pad::from(StreamRef::video(0));
    for (i, offset) in crossfade_offsets(&durations, transition)
        .into_iter()
        .enumerate()
    {
        let label = graph.node(
            Filter::new("xfade")
                .arg("transition", kind.to_string())
                .arg("duration", transition)
                .arg("offset", offset),
            [previous, Pad::from(StreamRef::video(i + 1))],
            &format!("v{i}"),
        )?;
        previous = Pad::from(label);
    }
    let graph = graph.build()?;
    let output = graph.output().bracketed();
    let total = durations.iter().sum::<f64>() - (inputs.len() - 1) as f64 * transition;

    let mut pipeline = CompiledPipeline::new(ctx.output.clone());
    for input in inputs {
        pipeline = pipeline.input(InputBinding::file(&input.path));
    }
    Ok(pipeline
        .filters(FilterSpec::Complex(graph))
        .map(output)
        .options(["-c:v", "libx264", "-preset", "medium", "-pix_fmt", "yuv420p"])
        .expected_duration(Some(tidy(total))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::templates::testing::{ctx, inputs, value_after};

    fn params(n: usize, transition: Transition, duration: f64) -> ConcatParams {
        ConcatParams {
            video_ids: (0..n).map(|i| format!("clip{i}")).collect(),
            transition,
            transition_duration: duration,
        }
    }

    #[test]
    fn test_plain_concat_lists_clips_in_order() {
        let clips = inputs(&["a.mp4", "b.mp4"]);
        let pipeline = compile(&params(2, Transition::None, 1.0), &clips, &ctx()).unwrap();

        assert_eq!(pipeline.artifacts.len(), 1);
        let list = &pipeline.artifacts[0];
        assert_eq!(list.contents, "file '/storage/a.mp4'\nfile '/storage/b.mp4'\n");
        assert_eq!(list.path, ctx().artifact_path("concat.txt"));

        let args = pipeline.to_args();
        assert_eq!(value_after(&args, "-i"), path_string(&list.path));
        assert_eq!(value_after(&args, "-f"), "concat");
        assert_eq!(value_after(&args, "-c"), "copy");
        assert!(pipeline.expected_duration.is_none());
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let clips = inputs(&["it's.mp4", "b.mp4"]);
        assert_eq!(
            concat_list(&clips),
            "file '/storage/it'\\''s.mp4'\nfile '/storage/b.mp4'\n"
        );
    }

    #[test]
    fn test_three_clip_crossfade_chains_two_transitions() {
        let clips = inputs(&["a.mp4", "b.mp4", "c.mp4"]);
        let pipeline = compile(
            &params(3, Transition::Xfade(XfadeKind::Fade), 1.0),
            &clips,
            &ctx(),
        )
        .unwrap();

        let FilterSpec::Complex(graph) = &pipeline.filters else {
            panic!("expected a filter graph");
        };
        let nodes: Vec<_> = graph.nodes_named("xfade").collect();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].output().as_str(), "v0");
        assert_eq!(nodes[1].inputs()[0].as_label().unwrap().as_str(), "v0");
        assert_eq!(nodes[1].output().as_str(), "v1");

        let offsets: Vec<String> = nodes
            .iter()
            .map(|node| format!("{:?}", node.filter().get("offset").unwrap()))
            .collect();
        assert_eq!(offsets, vec!["Plain(\"4\")", "Plain(\"8\")"]);

        assert_eq!(
            pipeline.filter_string().unwrap(),
            "[0:v][1:v]xfade=transition=fade:duration=1:offset=4[v0];\
             [v0][2:v]xfade=transition=fade:duration=1:offset=8[v1]"
        );
        let args = pipeline.to_args();
        assert_eq!(value_after(&args, "-map"), "[v1]");
        assert_eq!(value_after(&args, "-c:v"), "libx264");
        assert_eq!(pipeline.expected_duration, Some(13.0));
    }

    #[test]
    fn test_offsets_use_probed_durations() {
        let offsets = crossfade_offsets(&[10.0, 3.5, 8.0, 2.0], 0.5);
        assert_eq!(offsets, vec![9.5, 12.5, 20.0]);
        for pair in offsets.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_transition_longer_than_clip_is_rejected() {
        let mut clips = inputs(&["a.mp4", "b.mp4"]);
        clips[1] = clips[1].clone().with_duration(0.8);
        let err = compile(
            &params(2, Transition::Xfade(XfadeKind::WipeLeft), 1.0),
            &clips,
            &ctx(),
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::Compilation { ref parameter, .. } if parameter == "transition_duration")
        );
    }

    #[test]
    fn test_non_positive_transition_is_rejected() {
        let clips = inputs(&["a.mp4", "b.mp4"]);
        let err = compile(
            &params(2, Transition::Xfade(XfadeKind::Fade), 0.0),
            &clips,
            &ctx(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Compilation { .. }));
    }

    #[test]
    fn test_single_clip_is_rejected() {
        let clips = inputs(&["a.mp4"]);
        let err = compile(&params(1, Transition::None, 1.0), &clips, &ctx()).unwrap_err();
        assert!(matches!(err, Error::Compilation { ref parameter, .. } if parameter == "video_ids"));
    }
}
