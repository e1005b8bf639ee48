//! Core data model and algorithms for threshold-driven DFM rendering.
//!
//! A directly-follows multigraph ([`DfmDocument`]) partitions its edges per
//! object type over one shared node sequence. Every node and edge carries a
//! visibility threshold and a piecewise-constant count function
//! ([`ThresholdCounts`]); a single detail slider in [0, 1] decides what is
//! shown. [`filter_graph`] derives the renderable sub-graph for the current
//! threshold and object-type selection, [`PositionCache`] keeps node
//! coordinates stable across passes, and the [`highlight`] strategies turn
//! counts into edge widths.
//!
//! This crate is pure: no I/O, no async, no logging. Fetching documents
//! from the computation backend lives in `flowscope-client`.

pub mod color;
pub mod document;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod layout;
pub mod render;
pub mod steps;

// Re-export commonly used types
pub use document::{DfmDocument, DfmEdge, DfmNode, DocumentId};
pub use error::CoreError;
pub use filter::filter_graph;
pub use layout::{Position, PositionCache};
pub use render::{
    EdgeGeometry, LayoutInput, LegendEntry, NodeKind, RenderEdge, RenderGraph, RenderNode,
};
pub use steps::ThresholdCounts;
