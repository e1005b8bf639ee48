//! Core error types for flowscope-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! the document ingestion failure modes. Validation fails closed: any
//! violation rejects the whole document, so an out-of-range node index
//! can never reach rendering.

use thiserror::Error;

/// Errors produced while ingesting a DFM document.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The payload could not be decoded into the document wire shape.
    #[error("invalid document json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// An edge references a node index outside the document's node sequence.
    #[error("edge endpoint out of range: subgraph '{object_type}' edge {edge} references node {index} but the document has {node_count} nodes")]
    EdgeEndpointOutOfRange {
        object_type: String,
        edge: usize,
        index: usize,
        node_count: usize,
    },

    /// A counts sequence has breakpoints that do not strictly increase.
    #[error("breakpoints not strictly increasing in {entity}")]
    BreakpointsNotIncreasing { entity: String },

    /// A visibility threshold lies outside [0, 1].
    #[error("threshold out of range in {entity}: {value}")]
    ThresholdOutOfRange { entity: String, value: f64 },
}
