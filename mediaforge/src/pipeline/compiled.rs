//! Output of the pipeline compiler.

use std::path::{Path, PathBuf};

use filter_graph::{FilterChain, FilterGraph};

/// Flags placed before every invocation. Progress goes to stdout as
/// `key=value` lines, stderr only carries errors.
const GLOBAL_ARGS: &[&str] = &[
    "-y",
    "-hide_banner",
    "-nostats",
    "-loglevel",
    "error",
    "-progress",
    "pipe:1",
];

/// One `-i` input and the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub pre_args: Vec<String>,
    pub path: PathBuf,
}

impl InputBinding {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            pre_args: Vec::new(),
            path: path.into(),
        }
    }

    /// A still image repeated as a video stream.
    pub fn looped(path: impl Into<PathBuf>) -> Self {
        Self::file(path).with_pre_args(["-loop", "1"])
    }

    pub fn with_pre_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Filtering stage of an invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FilterSpec {
    #[default]
    None,
    /// Single-input video chain (`-vf`).
    Video(FilterChain),
    /// Labeled multi-input graph (`-filter_complex`).
    Complex(FilterGraph),
}

/// A file the engine needs for the duration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientArtifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Fully resolved engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub inputs: Vec<InputBinding>,
    pub filters: FilterSpec,
    /// `-map` specifiers, in order.
    pub maps: Vec<String>,
    /// Codec and container options.
    pub options: Vec<String>,
    pub output: PathBuf,
    pub artifacts: Vec<TransientArtifact>,
    /// Expected output length in seconds, drives the progress gauge.
    pub expected_duration: Option<f64>,
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl CompiledPipeline {
    pub fn new(output: PathBuf) -> Self {
        Self {
            inputs: Vec::new(),
            filters: FilterSpec::None,
            maps: Vec::new(),
            options: Vec::new(),
            output,
            artifacts: Vec::new(),
            expected_duration: None,
        }
    }

    pub fn input(mut self, input: InputBinding) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    /// Map the graph output, or any stream specifier.
    pub fn map(mut self, spec: impl Into<String>) -> Self {
        self.maps.push(spec.into());
        self
    }

    pub fn options<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn artifact(mut self, artifact: TransientArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn expected_duration(mut self, seconds: Option<f64>) -> Self {
        self.expected_duration = seconds.filter(|s| s.is_finite() && *s > 0.0);
        self
    }

    /// The `-filter_complex` or `-vf` string, if any.
    pub fn filter_string(&self) -> Option<String> {
        match &self.filters {
            FilterSpec::None => None,
            FilterSpec::Video(chain) => Some(chain.render()),
            FilterSpec::Complex(graph) => Some(graph.render()),
        }
    }

    /// The complete argument vector, without the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = GLOBAL_ARGS.iter().map(|a| a.to_string()).collect();

        for input in &self.inputs {
            args.extend(input.pre_args.iter().cloned());
            args.push("-i".to_string());
            args.push(path_arg(&input.path));
        }

        match &self.filters {
            FilterSpec::None => {}
            FilterSpec::Video(chain) => {
                args.push("-vf".to_string());
                args.push(chain.render());
            }
            FilterSpec::Complex(graph) => {
                args.push("-filter_complex".to_string());
                args.push(graph.render());
            }
        }

        for spec in &self.maps {
            args.push("-map".to_string());
            args.push(spec.clone());
        }

        args.extend(self.options.iter().cloned());
        args.push(path_arg(&self.output));
        args
    }
}
