//! Node position memoization across filter passes.
//!
//! The force-layout collaborator is free to place nodes that have no cached
//! coordinate; once it settles (or the user drags a node), the coordinates
//! are captured here and handed back to subsequent filter passes as pinned
//! positions. That keeps the graph from re-shuffling every time the
//! threshold or the object-type selection changes.
//!
//! The cache has exactly one writer -- the render/update cycle. The graph
//! filter only ever reads it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{DfmDocument, DocumentId};

/// A 2D canvas coordinate. Compared exactly; the cache only rewrites its
/// state when a coordinate actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Per-document memory of node coordinates.
#[derive(Debug, Default)]
pub struct PositionCache {
    document: Option<DocumentId>,
    positions: HashMap<usize, Position>,
}

impl PositionCache {
    pub fn new() -> Self {
        PositionCache::default()
    }

    /// Binds the cache to `document`.
    ///
    /// A document of different identity clears the cache entirely; the same
    /// document only prunes entries whose node index no longer exists.
    /// Threshold or selection changes do not go through here and never
    /// clear anything.
    pub fn sync_document(&mut self, document: &DfmDocument) {
        if self.document != Some(document.id()) {
            self.positions.clear();
            self.document = Some(document.id());
            return;
        }
        let node_count = document.node_count();
        self.positions.retain(|&index, _| index < node_count);
    }

    /// Cached coordinate of a node, if any.
    pub fn position(&self, node: usize) -> Option<Position> {
        self.positions.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Merges the settled coordinates of every currently rendered node.
    ///
    /// The candidate cache keeps old entries for nodes that are not
    /// currently rendered and takes the fresh coordinate for those that
    /// are. The update is applied only when at least one coordinate
    /// differs; redundant merges return `false` so the caller can skip a
    /// re-render.
    pub fn on_settle(&mut self, rendered: &[(usize, Position)]) -> bool {
        let mut candidate = self.positions.clone();
        for &(node, position) in rendered {
            candidate.insert(node, position);
        }
        if candidate == self.positions {
            return false;
        }
        self.positions = candidate;
        true
    }

    /// Merges a single node's coordinate after a manual drag.
    pub fn on_drag_end(&mut self, node: usize, position: Position) -> bool {
        if self.positions.get(&node) == Some(&position) {
            return false;
        }
        self.positions.insert(node, position);
        true
    }
}
