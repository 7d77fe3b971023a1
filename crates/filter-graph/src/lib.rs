//! Typed filter-graph representation for ffmpeg-style media engines.
//!
//! Graphs are built node by node with [`GraphBuilder`]. Every node carries
//! exactly one [`Filter`], the pads it reads and the label it writes. Node ids
//! are assigned in declaration order, so building the same graph twice always
//! renders the same string.
//!
//! ```
//! use filter_graph::{Filter, GraphBuilder, Pad, StreamRef};
//!
//! let mut graph = GraphBuilder::new();
//! let logo = graph
//!     .node(
//!         Filter::new("scale").arg("w", "iw*0.5").arg("h", "ih*0.5"),
//!         [Pad::from(StreamRef::video(1))],
//!         "ovr",
//!     )
//!     .unwrap();
//! graph
//!     .node(
//!         Filter::new("overlay").positional("W-w-20").positional("20"),
//!         [Pad::from(StreamRef::video(0)), Pad::from(logo)],
//!         "vout",
//!     )
//!     .unwrap();
//!
//! let graph = graph.build().unwrap();
//! assert_eq!(
//!     graph.render(),
//!     "[1:v]scale=w=iw*0.5:h=ih*0.5[ovr];[0:v][ovr]overlay=W-w-20:20[vout]"
//! );
//! ```

mod error;
mod filter;
mod graph;
mod pad;

pub use error::GraphError;
pub use filter::{Filter, FilterArg, Value, format_number};
pub use graph::{FilterChain, FilterGraph, FilterNode, GraphBuilder};
pub use pad::{Label, Pad, StreamKind, StreamRef};
