//! The directly-follows multigraph document and its ingestion validation.
//!
//! A [`DfmDocument`] is the immutable output of the backend discovery task:
//! one shared node sequence plus per-object-type edge subgraphs indexing
//! into it. Documents only come into existence through
//! [`DfmDocument::from_json`] / [`DfmDocument::from_value`], which validate
//! the payload against the wire schema and the structural invariants and
//! fail closed on any violation.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "nodes": [{"label": "...", "threshold": 0.2, "counts": [[0.2, 10], [1.01, 30]]}],
//!   "subgraphs": {
//!     "MATERIAL": [{"source": 0, "target": 2, "threshold": 0.2, "counts": [[1.01, 12]]}]
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::steps::ThresholdCounts;

/// Content identity of an ingested document.
///
/// A blake3 hash over the canonical serialization, computed once at
/// ingestion. Two byte-identical query results share one identity; any
/// changed result gets a fresh one, which is what invalidates cached node
/// positions downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(blake3::Hash);

/// An activity node.
///
/// `threshold` is the detail level at which the node becomes visible;
/// `counts` maps any threshold to the number of objects passing through the
/// node at that detail level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfmNode {
    pub label: String,
    pub threshold: f64,
    pub counts: ThresholdCounts,
}

/// A directly-follows edge inside one object type's subgraph.
///
/// `source` and `target` index into the document's shared node sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfmEdge {
    pub source: usize,
    pub target: usize,
    pub threshold: f64,
    pub counts: ThresholdCounts,
}

/// Wire shape of a document, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDocument {
    nodes: Vec<DfmNode>,
    subgraphs: IndexMap<String, Vec<DfmEdge>>,
}

/// A validated, immutable DFM document.
///
/// Fields are private; all construction goes through the validating
/// constructors so downstream code never sees an out-of-range edge
/// endpoint, a non-increasing counts sequence, or a threshold outside
/// [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DfmDocument {
    #[serde(skip)]
    id: DocumentId,
    nodes: Vec<DfmNode>,
    subgraphs: IndexMap<String, Vec<DfmEdge>>,
}

impl DfmDocument {
    /// Parses and validates a document from raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    /// Parses and validates a document from an already-decoded JSON value,
    /// e.g. the `preliminary`/`result` payload of a task response.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let raw: RawDocument = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self, CoreError> {
        validate(&raw)?;
        // Canonical bytes: Vec and IndexMap serialize in a stable order, so
        // equal documents hash equal regardless of the input formatting.
        let canonical = serde_json::to_vec(&raw)?;
        Ok(DfmDocument {
            id: DocumentId(blake3::hash(&canonical)),
            nodes: raw.nodes,
            subgraphs: raw.subgraphs,
        })
    }

    /// The content identity assigned at ingestion.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The shared node sequence.
    pub fn nodes(&self) -> &[DfmNode] {
        &self.nodes
    }

    /// Number of nodes in the shared sequence.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Per-object-type edge subgraphs, in backend insertion order.
    pub fn subgraphs(&self) -> &IndexMap<String, Vec<DfmEdge>> {
        &self.subgraphs
    }

    /// Object type names in backend insertion order.
    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.subgraphs.keys().map(String::as_str)
    }
}

fn validate(raw: &RawDocument) -> Result<(), CoreError> {
    let node_count = raw.nodes.len();

    for node in &raw.nodes {
        let entity = format!("node '{}'", node.label);
        check_threshold(node.threshold, &entity)?;
        node.counts.validate(&entity)?;
    }

    for (object_type, edges) in &raw.subgraphs {
        for (position, edge) in edges.iter().enumerate() {
            for index in [edge.source, edge.target] {
                if index >= node_count {
                    return Err(CoreError::EdgeEndpointOutOfRange {
                        object_type: object_type.clone(),
                        edge: position,
                        index,
                        node_count,
                    });
                }
            }
            let entity = format!("edge {position} of subgraph '{object_type}'");
            check_threshold(edge.threshold, &entity)?;
            edge.counts.validate(&entity)?;
        }
    }

    Ok(())
}

fn check_threshold(value: f64, entity: &str) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::ThresholdOutOfRange {
            entity: entity.to_string(),
            value,
        });
    }
    Ok(())
}
