//! Renderable graph types and the drawing-collaborator boundary shape.
//!
//! A [`RenderGraph`] is derived fresh from (document, threshold, selection)
//! by the graph filter and never persisted. [`RenderGraph::to_layout_input`]
//! converts it into the JSON shape handed to the external force/graph
//! drawing capability.

use serde::Serialize;

use crate::layout::Position;

/// Role of a node in the process. By backend convention node index 0 is the
/// process start marker and index 1 the process end marker; renderers
/// typically substitute icons for those two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Activity,
}

impl NodeKind {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => NodeKind::Start,
            1 => NodeKind::End,
            _ => NodeKind::Activity,
        }
    }
}

/// A node that survived filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    /// Index into the document's node sequence.
    pub id: usize,
    pub label: String,
    pub kind: NodeKind,
    /// Display count at the active threshold.
    pub count: u64,
    /// Cached coordinate, pinned for the layout engine when present.
    pub position: Option<Position>,
}

/// How an edge is drawn between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EdgeGeometry {
    /// Bezier bend with the given signed curvature; 0 is a straight line.
    Curved { curvature: f64 },
    /// `source == target`; drawn with dedicated loop geometry instead of
    /// the parallel-edge curvature scheme.
    SelfLoop,
}

impl EdgeGeometry {
    /// The curvature handed to the drawing collaborator (loops bend via
    /// their own fixed angle/sweep, not via curvature).
    pub fn curvature(&self) -> f64 {
        match self {
            EdgeGeometry::Curved { curvature } => *curvature,
            EdgeGeometry::SelfLoop => 0.0,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        matches!(self, EdgeGeometry::SelfLoop)
    }
}

/// An edge that survived filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub source: usize,
    pub target: usize,
    pub object_type: String,
    /// Display count at the active threshold.
    pub count: u64,
    pub color: String,
    pub width: f64,
    pub geometry: EdgeGeometry,
}

/// One legend row: an object type that contributed at least one visible
/// edge, with its assigned color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub object_type: String,
    pub color: String,
}

/// The filtered, renderable sub-graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub legend: Vec<LegendEntry>,
}

impl RenderGraph {
    /// Converts to the shape consumed by the drawing collaborator.
    pub fn to_layout_input(&self) -> LayoutInput {
        LayoutInput {
            nodes: self.nodes.iter().map(LayoutNode::from_render).collect(),
            links: self.edges.iter().map(LayoutLink::from_render).collect(),
        }
    }

    /// Visible node ids, in render order.
    pub fn node_ids(&self) -> Vec<usize> {
        self.nodes.iter().map(|node| node.id).collect()
    }
}

/// Input handed to the external force/graph drawing capability.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub id: usize,
    pub label: String,
    pub kind: NodeKind,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
}

impl LayoutNode {
    fn from_render(node: &RenderNode) -> Self {
        LayoutNode {
            id: node.id,
            label: node.label.clone(),
            kind: node.kind,
            count: node.count,
            x: node.position.map(|p| p.x),
            y: node.position.map(|p| p.y),
            // Pinned: the layout engine must not move memoized nodes.
            fx: node.position.map(|p| p.x),
            fy: node.position.map(|p| p.y),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutLink {
    pub source: usize,
    pub target: usize,
    pub label: String,
    pub color: String,
    pub curvature: f64,
    pub width: f64,
    pub self_loop: bool,
}

impl LayoutLink {
    fn from_render(edge: &RenderEdge) -> Self {
        LayoutLink {
            source: edge.source,
            target: edge.target,
            label: edge.count.to_string(),
            color: edge.color.clone(),
            curvature: edge.geometry.curvature(),
            width: edge.width,
            self_loop: edge.geometry.is_self_loop(),
        }
    }
}
