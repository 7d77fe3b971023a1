use thiserror::Error;

/// Errors raised while assembling a filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("filter graph has no nodes")]
    Empty,

    #[error("filter '{filter}' has no input pads")]
    NoInputs { filter: String },

    #[error("filter '{filter}' has no output pads")]
    NoOutputs { filter: String },

    #[error("label [{0}] is written by more than one node")]
    DuplicateLabel(String),

    #[error("label [{0}] is read before any node writes it")]
    UndefinedLabel(String),

    #[error("label [{0}] is written but never consumed")]
    DanglingLabel(String),
}
