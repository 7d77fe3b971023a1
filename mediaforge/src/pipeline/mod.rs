//! Operation descriptors and their compilation into engine invocations.

pub mod compiled;
pub mod compiler;
pub mod operation;
mod templates;

pub use compiled::{CompiledPipeline, FilterSpec, InputBinding, TransientArtifact};
pub use compiler::{CompileContext, ResolvedInput, compile};
pub use operation::{Operation, OperationRequest};
