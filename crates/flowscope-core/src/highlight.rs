//! Edge highlighting strategies.
//!
//! A strategy prepares an opaque aggregate once per filter pass from the
//! document and the active selection, then maps each visible edge to a raw
//! width. [`Remapped`] rescales raw widths linearly into a display range.
//!
//! Two log-scaled trace-count strategies exist side by side: they diverge
//! in log base and display range and are deliberately kept as distinctly
//! named presets instead of being collapsed into one.

use std::collections::HashMap;

use crate::document::DfmDocument;

/// Default display width range for the remapping combinator.
pub const DEFAULT_WIDTH_MIN: f64 = 0.2;
pub const DEFAULT_WIDTH_MAX: f64 = 1.5;

/// Width computation capability consumed by the graph filter.
pub trait EdgeHighlighter {
    /// Pass-scoped data prepared once per filter invocation.
    type Aggregate;

    /// Builds the aggregate for one filter pass. Recomputed whenever the
    /// document, selection, or threshold changes; never patched in place.
    fn create_aggregate(
        &self,
        document: &DfmDocument,
        selection: &[String],
        threshold: f64,
    ) -> Self::Aggregate;

    /// Raw width of the edge `(source, target)` of `object_type`.
    fn edge_width(
        &self,
        source: usize,
        target: usize,
        object_type: &str,
        aggregate: &Self::Aggregate,
    ) -> f64;
}

/// Uniform width regardless of counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatHighlighter;

impl EdgeHighlighter for FlatHighlighter {
    type Aggregate = ();

    fn create_aggregate(&self, _: &DfmDocument, _: &[String], _: f64) -> Self::Aggregate {}

    fn edge_width(&self, _: usize, _: usize, _: &str, _: &Self::Aggregate) -> f64 {
        1.0
    }
}

/// Scale applied to each count before aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountScale {
    Linear,
    /// `log2(count) / log2(base)` for positive counts; zero stays zero.
    Log { base: f64 },
}

impl CountScale {
    fn apply(self, count: u64) -> f64 {
        match self {
            CountScale::Linear => count as f64,
            CountScale::Log { base } => {
                if count > 0 {
                    (count as f64).log2() / base.log2()
                } else {
                    0.0
                }
            }
        }
    }
}

/// Width proportional to the (scaled) trace count at the active threshold,
/// normalized by the maximum over all selected edges.
#[derive(Debug, Clone, Copy)]
pub struct TraceCountHighlighter {
    scale: CountScale,
}

impl TraceCountHighlighter {
    pub fn new(scale: CountScale) -> Self {
        TraceCountHighlighter { scale }
    }
}

/// Per-pass aggregate of [`TraceCountHighlighter`].
#[derive(Debug, Clone, Default)]
pub struct TraceCountAggregate {
    max: f64,
    values: HashMap<(usize, usize), HashMap<String, f64>>,
}

impl EdgeHighlighter for TraceCountHighlighter {
    type Aggregate = TraceCountAggregate;

    fn create_aggregate(
        &self,
        document: &DfmDocument,
        selection: &[String],
        threshold: f64,
    ) -> Self::Aggregate {
        let mut aggregate = TraceCountAggregate::default();

        for object_type in selection {
            let Some(edges) = document.subgraphs().get(object_type) else {
                continue;
            };
            for edge in edges {
                let value = self.scale.apply(edge.counts.value_at(threshold));
                aggregate
                    .values
                    .entry((edge.source, edge.target))
                    .or_default()
                    .insert(object_type.clone(), value);
                if value > aggregate.max {
                    aggregate.max = value;
                }
            }
        }

        aggregate
    }

    fn edge_width(
        &self,
        source: usize,
        target: usize,
        object_type: &str,
        aggregate: &Self::Aggregate,
    ) -> f64 {
        if aggregate.max <= 0.0 {
            return 0.0;
        }
        aggregate
            .values
            .get(&(source, target))
            .and_then(|per_type| per_type.get(object_type))
            .map(|value| value / aggregate.max)
            .unwrap_or(0.0)
    }
}

/// Linear remap of an inner strategy's output into `[min, max]`:
/// `min + (max - min) * raw`.
#[derive(Debug, Clone, Copy)]
pub struct Remapped<H> {
    inner: H,
    min: f64,
    max: f64,
}

impl<H> Remapped<H> {
    pub fn new(inner: H, min: f64, max: f64) -> Self {
        Remapped { inner, min, max }
    }
}

impl<H: EdgeHighlighter> EdgeHighlighter for Remapped<H> {
    type Aggregate = H::Aggregate;

    fn create_aggregate(
        &self,
        document: &DfmDocument,
        selection: &[String],
        threshold: f64,
    ) -> Self::Aggregate {
        self.inner.create_aggregate(document, selection, threshold)
    }

    fn edge_width(
        &self,
        source: usize,
        target: usize,
        object_type: &str,
        aggregate: &Self::Aggregate,
    ) -> f64 {
        let raw = self.inner.edge_width(source, target, object_type, aggregate);
        self.min + (self.max - self.min) * raw
    }
}

/// Uniform edge widths.
pub fn flat() -> FlatHighlighter {
    FlatHighlighter
}

/// Width linear in the trace count, remapped into the default range.
pub fn linear_trace_count() -> Remapped<TraceCountHighlighter> {
    Remapped::new(
        TraceCountHighlighter::new(CountScale::Linear),
        DEFAULT_WIDTH_MIN,
        DEFAULT_WIDTH_MAX,
    )
}

/// Width logarithmic in the trace count (base 1.1), remapped into the
/// default range.
pub fn log_trace_count() -> Remapped<TraceCountHighlighter> {
    Remapped::new(
        TraceCountHighlighter::new(CountScale::Log { base: 1.1 }),
        DEFAULT_WIDTH_MIN,
        DEFAULT_WIDTH_MAX,
    )
}

/// Historical variant of [`log_trace_count`]: steeper log base 1.05,
/// remapped into the narrower 0.2..1.0 range.
pub fn narrow_log_trace_count() -> Remapped<TraceCountHighlighter> {
    Remapped::new(
        TraceCountHighlighter::new(CountScale::Log { base: 1.05 }),
        DEFAULT_WIDTH_MIN,
        1.0,
    )
}
