//! Filter nodes, the graph builder and rendering.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::filter::Filter;
use crate::pad::{Label, Pad};

/// One node of the graph: `[inputs...]filter[outputs...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    id: usize,
    filter: Filter,
    inputs: Vec<Pad>,
    outputs: Vec<Label>,
}

impl FilterNode {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn inputs(&self) -> &[Pad] {
        &self.inputs
    }

    /// First (for most filters, only) output label.
    pub fn output(&self) -> &Label {
        &self.outputs[0]
    }

    pub fn outputs(&self) -> &[Label] {
        &self.outputs
    }
}

/// Incrementally builds a [`FilterGraph`], validating label wiring as it goes.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<FilterNode>,
    written: HashSet<Label>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node reading `inputs` and writing the label `output`.
    ///
    /// Returns the written label so it can be threaded into later nodes.
    pub fn node(
        &mut self,
        filter: Filter,
        inputs: impl IntoIterator<Item = Pad>,
        output: &str,
    ) -> Result<Label, GraphError> {
        let mut written = self.node_multi(filter, inputs, &[output])?;
        written.pop().ok_or(GraphError::Empty)
    }

    /// Add a node with several outputs, such as `split` or `scale2ref`.
    pub fn node_multi(
        &mut self,
        filter: Filter,
        inputs: impl IntoIterator<Item = Pad>,
        outputs: &[&str],
    ) -> Result<Vec<Label>, GraphError> {
        let inputs: Vec<Pad> = inputs.into_iter().collect();
        if inputs.is_empty() {
            return Err(GraphError::NoInputs {
                filter: filter.name().to_string(),
            });
        }
        if outputs.is_empty() {
            return Err(GraphError::NoOutputs {
                filter: filter.name().to_string(),
            });
        }
        for pad in &inputs {
            if let Some(label) = pad.as_label()
                && !self.written.contains(label)
            {
                return Err(GraphError::UndefinedLabel(label.to_string()));
            }
        }

        let outputs: Vec<Label> = outputs.iter().map(Label::new).collect();
        let mut fresh = HashSet::new();
        for label in &outputs {
            if self.written.contains(label) || !fresh.insert(label) {
                return Err(GraphError::DuplicateLabel(label.to_string()));
            }
        }
        self.written.extend(outputs.iter().cloned());

        self.nodes.push(FilterNode {
            id: self.nodes.len(),
            filter,
            inputs,
            outputs: outputs.clone(),
        });
        Ok(outputs)
    }

    /// Add a linear run of filters starting at `input`; the last one writes
    /// `output`, intermediate pads are named `{output}_{n}`.
    pub fn chain(
        &mut self,
        input: Pad,
        filters: impl IntoIterator<Item = Filter>,
        output: &str,
    ) -> Result<Label, GraphError> {
        let filters: Vec<Filter> = filters.into_iter().collect();
        let last = filters.len().saturating_sub(1);
        let mut current = input;
        let mut written = None;
        for (i, filter) in filters.into_iter().enumerate() {
            let name = if i == last {
                output.to_string()
            } else {
                format!("{output}_{i}")
            };
            let label = self.node(filter, [current], &name)?;
            current = Pad::from(&label);
            written = Some(label);
        }
        written.ok_or(GraphError::Empty)
    }

    /// Finish the graph. The last node's labels are the graph outputs; every
    /// other label must be consumed by some node.
    pub fn build(self) -> Result<FilterGraph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }
        let consumed: HashSet<&Label> = self
            .nodes
            .iter()
            .flat_map(|node| node.inputs.iter().filter_map(Pad::as_label))
            .collect();
        for node in &self.nodes[..self.nodes.len() - 1] {
            for label in &node.outputs {
                if !consumed.contains(label) {
                    return Err(GraphError::DanglingLabel(label.to_string()));
                }
            }
        }
        Ok(FilterGraph { nodes: self.nodes })
    }
}

/// A validated multi-input filter graph, rendered for `-filter_complex`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    /// Nodes running the named filter, in declaration order.
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FilterNode> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.filter.name() == name)
    }

    /// Label of the graph output.
    pub fn output(&self) -> &Label {
        // `build` refuses empty graphs.
        self.nodes[self.nodes.len() - 1].output()
    }

    /// Render to the engine's textual syntax.
    ///
    /// A node whose only input is the single output of the previous node,
    /// where that output is read nowhere else, is joined with `,`; every
    /// other node starts a new `;`-separated chain.
    pub fn render(&self) -> String {
        let mut uses: HashMap<&Label, usize> = HashMap::new();
        for node in &self.nodes {
            for label in node.inputs.iter().filter_map(Pad::as_label) {
                *uses.entry(label).or_default() += 1;
            }
        }
        let fused = |i: usize| -> bool {
            if i == 0 || i >= self.nodes.len() {
                return false;
            }
            let [prev] = self.nodes[i - 1].outputs.as_slice() else {
                return false;
            };
            match self.nodes[i].inputs.as_slice() {
                [Pad::Label(label)] => label == prev && uses.get(prev) == Some(&1),
                _ => false,
            }
        };

        let mut out = String::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let joined = fused(i);
            if i > 0 {
                out.push(if joined { ',' } else { ';' });
            }
            if !joined {
                for pad in &node.inputs {
                    pad.render(&mut out);
                }
            }
            node.filter.render(&mut out);
            if !fused(i + 1) {
                for label in &node.outputs {
                    out.push_str(&label.bracketed());
                }
            }
        }
        out
    }
}

/// A plain single-input chain for `-vf` / `-af`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            filter.render(&mut out);
        }
        out
    }
}

impl FromIterator<Filter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pad::StreamRef;

    fn xfade(offset: f64) -> Filter {
        Filter::new("xfade")
            .arg("transition", "fade")
            .arg("duration", 1.0)
            .arg("offset", offset)
    }

    #[test]
    fn test_node_ids_follow_declaration_order() {
        let mut builder = GraphBuilder::new();
        let v0 = builder
            .node(
                xfade(4.0),
                [StreamRef::video(0).into(), StreamRef::video(1).into()],
                "v0",
            )
            .unwrap();
        builder
            .node(xfade(8.0), [Pad::from(v0), StreamRef::video(2).into()], "v1")
            .unwrap();
        let graph = builder.build().unwrap();

        let ids: Vec<usize> = graph.nodes().iter().map(FilterNode::id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(graph.output().as_str(), "v1");
        assert_eq!(
            graph.render(),
            "[0:v][1:v]xfade=transition=fade:duration=1:offset=4[v0];\
             [v0][2:v]xfade=transition=fade:duration=1:offset=8[v1]"
        );
    }

    #[test]
    fn test_linear_chain_is_fused() {
        let mut builder = GraphBuilder::new();
        let bg = builder
            .chain(
                StreamRef::video(0).into(),
                [
                    Filter::new("scale").positional(1080u32).positional(1920u32),
                    Filter::new("boxblur").positional(20u32),
                ],
                "bg",
            )
            .unwrap();
        let fg = builder
            .node(
                Filter::new("scale").positional("iw*0.8").positional("ih*0.8"),
                [StreamRef::video(0).into()],
                "fg",
            )
            .unwrap();
        builder
            .node(
                Filter::new("overlay").positional("(W-w)/2").positional("(H-h)/2"),
                [Pad::from(bg), Pad::from(fg)],
                "vout",
            )
            .unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(
            graph.render(),
            "[0:v]scale=1080:1920,boxblur=20[bg];[0:v]scale=iw*0.8:ih*0.8[fg];\
             [bg][fg]overlay=(W-w)/2:(H-h)/2[vout]"
        );
    }

    #[test]
    fn test_label_read_twice_is_not_fused() {
        let mut builder = GraphBuilder::new();
        let split = builder
            .node(Filter::new("null"), [StreamRef::video(0).into()], "base")
            .unwrap();
        builder
            .node(
                Filter::new("overlay"),
                [Pad::from(&split), Pad::from(&split)],
                "out",
            )
            .unwrap();
        let graph = builder.build().unwrap();
        assert_eq!(graph.render(), "[0:v]null[base];[base][base]overlay[out]");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let build = || {
            let mut builder = GraphBuilder::new();
            builder
                .chain(
                    StreamRef::video(0).into(),
                    [Filter::new("hflip"), Filter::new("vflip")],
                    "out",
                )
                .unwrap();
            builder.build().unwrap().render()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_undefined_label_is_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .node(Filter::new("null"), [Pad::from(Label::new("ghost"))], "out")
            .unwrap_err();
        assert_eq!(err, GraphError::UndefinedLabel("ghost".to_string()));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder
            .node(Filter::new("null"), [StreamRef::video(0).into()], "out")
            .unwrap();
        let err = builder
            .node(Filter::new("null"), [StreamRef::video(1).into()], "out")
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateLabel("out".to_string()));
    }

    #[test]
    fn test_dangling_label_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder
            .node(Filter::new("null"), [StreamRef::video(0).into()], "unused")
            .unwrap();
        builder
            .node(Filter::new("null"), [StreamRef::video(1).into()], "out")
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            GraphError::DanglingLabel("unused".to_string())
        );
    }

    #[test]
    fn test_multi_output_node() {
        let mut builder = GraphBuilder::new();
        let pads = builder
            .node_multi(
                Filter::new("scale2ref"),
                [StreamRef::video(1).into(), StreamRef::video(0).into()],
                &["bg", "fg"],
            )
            .unwrap();
        let keyed = builder
            .node(
                Filter::new("colorkey").positional("0x00FF00"),
                [Pad::from(&pads[1])],
                "keyed",
            )
            .unwrap();
        builder
            .node(
                Filter::new("overlay"),
                [Pad::from(&pads[0]), Pad::from(keyed)],
                "vout",
            )
            .unwrap();
        let graph = builder.build().unwrap();

        assert_eq!(graph.nodes()[0].outputs().len(), 2);
        assert_eq!(
            graph.render(),
            "[1:v][0:v]scale2ref[bg][fg];[fg]colorkey=0x00FF00[keyed];[bg][keyed]overlay[vout]"
        );
    }

    #[test]
    fn test_repeated_output_in_one_node_is_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .node_multi(Filter::new("split"), [StreamRef::video(0).into()], &["a", "a"])
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateLabel("a".to_string()));
    }

    #[test]
    fn test_empty_graph_is_rejected() {
        assert_eq!(GraphBuilder::new().build().unwrap_err(), GraphError::Empty);
    }

    #[test]
    fn test_filter_chain_render() {
        let chain: FilterChain = [
            Filter::new("fade").arg("t", "in").arg("st", 0.0).arg("d", 1.0),
            Filter::new("fade").arg("t", "out").arg("st", 9.0).arg("d", 1.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(chain.render(), "fade=t=in:st=0:d=1,fade=t=out:st=9:d=1");
    }
}
