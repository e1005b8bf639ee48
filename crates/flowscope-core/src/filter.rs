//! Threshold-driven derivation of the renderable sub-graph.
//!
//! One filter pass walks the selected subgraphs in selection order, keeps
//! every edge whose visibility threshold is reached, and from those edges
//! derives the visible node set, per-type colors, parallel-edge curvature,
//! widths, and the legend. The pass is a pure function of its inputs; all
//! accumulators (pair counters, net-flow sums, node union) are local to the
//! invocation and never shared across passes.

use std::collections::{HashMap, HashSet};

use crate::color::object_type_color;
use crate::document::DfmDocument;
use crate::highlight::EdgeHighlighter;
use crate::layout::PositionCache;
use crate::render::{EdgeGeometry, LegendEntry, NodeKind, RenderEdge, RenderGraph, RenderNode};

/// Curvature of the `k`-th parallel edge between one ordered node pair.
///
/// Even `k` bends to one side, odd `k` to the other, with magnitudes
/// growing pair by pair: 0, 0.5, -0.5, 1.0, -1.0, ...
fn parallel_curvature(k: u32) -> f64 {
    if k % 2 == 0 {
        -(f64::from(k) / 4.0)
    } else {
        f64::from(k - 1) / 4.0 + 0.5
    }
}

/// Derives the renderable sub-graph for one (document, threshold,
/// selection) combination.
///
/// `selection` lists object-type names in selection order; types missing
/// from the document are skipped. An empty selection produces an empty
/// graph. Nodes present in `positions` come back pinned to their cached
/// coordinate.
pub fn filter_graph<H: EdgeHighlighter>(
    document: &DfmDocument,
    threshold: f64,
    selection: &[String],
    highlighter: &H,
    positions: &PositionCache,
) -> RenderGraph {
    let aggregate = highlighter.create_aggregate(document, selection, threshold);

    let mut edges: Vec<RenderEdge> = Vec::new();
    let mut legend: Vec<LegendEntry> = Vec::new();
    let mut touched: HashSet<usize> = HashSet::new();
    // Edges seen so far between each ordered node pair, for curvature.
    let mut pair_counts: HashMap<(usize, usize), u32> = HashMap::new();
    // Incoming minus outgoing display counts per node.
    let mut net_flow: HashMap<usize, f64> = HashMap::new();

    for (index, object_type) in selection.iter().enumerate() {
        let Some(subgraph) = document.subgraphs().get(object_type) else {
            continue;
        };
        let color = object_type_color(selection.len(), index);
        let mut has_visible_edge = false;

        for edge in subgraph {
            if edge.threshold > threshold {
                continue;
            }
            has_visible_edge = true;

            let count = edge.counts.value_at(threshold);
            touched.insert(edge.source);
            touched.insert(edge.target);
            *net_flow.entry(edge.source).or_default() -= count as f64;
            *net_flow.entry(edge.target).or_default() += count as f64;

            let geometry = if edge.source == edge.target {
                EdgeGeometry::SelfLoop
            } else {
                let seen = pair_counts.entry((edge.source, edge.target)).or_insert(0);
                let curvature = parallel_curvature(*seen);
                *seen += 1;
                EdgeGeometry::Curved { curvature }
            };

            let width = highlighter.edge_width(edge.source, edge.target, object_type, &aggregate);
            edges.push(RenderEdge {
                source: edge.source,
                target: edge.target,
                object_type: object_type.clone(),
                count,
                color: color.clone(),
                width,
                geometry,
            });
        }

        if has_visible_edge {
            legend.push(LegendEntry {
                object_type: object_type.clone(),
                color,
            });
        }
    }

    let mut nodes: Vec<RenderNode> = touched
        .into_iter()
        .filter(|&index| document.nodes()[index].threshold <= threshold)
        .map(|index| {
            let node = &document.nodes()[index];
            RenderNode {
                id: index,
                label: node.label.clone(),
                kind: NodeKind::from_index(index),
                count: node.counts.value_at(threshold),
                position: positions.position(index),
            }
        })
        .collect();

    // Stable default ordering for the layout engine: ascending net flow
    // puts sources before sinks; ties fall back to the node index.
    nodes.sort_by(|a, b| {
        let flow_a = net_flow.get(&a.id).copied().unwrap_or(0.0);
        let flow_b = net_flow.get(&b.id).copied().unwrap_or(0.0);
        flow_a.total_cmp(&flow_b).then(a.id.cmp(&b.id))
    });

    RenderGraph {
        nodes,
        edges,
        legend,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::highlight::{flat, linear_trace_count, FlatHighlighter};

    fn parse(value: serde_json::Value) -> DfmDocument {
        DfmDocument::from_value(value).unwrap()
    }

    fn sample_document() -> DfmDocument {
        parse(json!({
            "nodes": [
                {"label": "|START|", "threshold": 0.0, "counts": [[1.01, 20]]},
                {"label": "|END|", "threshold": 0.0, "counts": [[1.01, 20]]},
                {"label": "Create Order", "threshold": 0.0, "counts": [[0.4, 12], [1.01, 20]]},
                {"label": "Ship Order", "threshold": 0.4, "counts": [[1.01, 8]]}
            ],
            "subgraphs": {
                "ORDER": [
                    {"source": 0, "target": 2, "threshold": 0.0, "counts": [[1.01, 20]]},
                    {"source": 2, "target": 3, "threshold": 0.4, "counts": [[1.01, 8]]},
                    {"source": 3, "target": 1, "threshold": 0.4, "counts": [[1.01, 8]]}
                ],
                "MATERIAL": [
                    {"source": 2, "target": 2, "threshold": 0.2, "counts": [[1.01, 5]]}
                ]
            }
        }))
    }

    fn select(types: &[&str]) -> Vec<String> {
        types.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn empty_selection_yields_empty_graph() {
        let doc = sample_document();
        let graph = filter_graph(&doc, 1.0, &[], &flat(), &PositionCache::new());
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.legend.is_empty());
    }

    #[test]
    fn edges_below_threshold_are_hidden() {
        let doc = sample_document();
        let selection = select(&["ORDER"]);
        let graph = filter_graph(&doc, 0.2, &selection, &flat(), &PositionCache::new());
        // Only the start edge is visible at 0.2; shipping appears at 0.4.
        assert_eq!(graph.edges.len(), 1);
        assert_eq!((graph.edges[0].source, graph.edges[0].target), (0, 2));
        assert_eq!(graph.node_ids().len(), 2);

        let graph = filter_graph(&doc, 0.4, &selection, &flat(), &PositionCache::new());
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.node_ids().len(), 4);
    }

    #[test]
    fn display_counts_come_from_the_step_function() {
        let doc = sample_document();
        let selection = select(&["ORDER"]);
        let graph = filter_graph(&doc, 0.2, &selection, &flat(), &PositionCache::new());

        let start_edge = &graph.edges[0];
        assert_eq!(start_edge.count, 20);
        let create_order = graph.nodes.iter().find(|n| n.id == 2).unwrap();
        // At 0.2 the node sits in its first interval.
        assert_eq!(create_order.count, 12);
    }

    #[test]
    fn nodes_outside_threshold_are_excluded_even_when_touched() {
        let doc = parse(json!({
            "nodes": [
                {"label": "|START|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "|END|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "Rare", "threshold": 0.9, "counts": [[1.01, 1]]}
            ],
            "subgraphs": {
                "ORDER": [
                    {"source": 0, "target": 2, "threshold": 0.1, "counts": [[1.01, 1]]}
                ]
            }
        }));
        let selection = select(&["ORDER"]);
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());
        assert_eq!(graph.edges.len(), 1);
        // Node 2 is touched by the edge but its own threshold gates it out.
        assert_eq!(graph.node_ids(), vec![0]);
    }

    #[test]
    fn curvature_sequence_for_parallel_edges() {
        let doc = parse(json!({
            "nodes": [
                {"label": "|START|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "|END|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "a", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "b", "threshold": 0.0, "counts": [[1.01, 9]]}
            ],
            "subgraphs": {
                "T0": [{"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]}],
                "T1": [{"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]}],
                "T2": [{"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]}],
                "T3": [{"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]}],
                "T4": [{"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]}]
            }
        }));
        let selection = select(&["T0", "T1", "T2", "T3", "T4"]);
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());

        let curvatures: Vec<f64> = graph
            .edges
            .iter()
            .map(|edge| edge.geometry.curvature())
            .collect();
        assert_eq!(curvatures, vec![0.0, 0.5, -0.5, 1.0, -1.0]);
    }

    #[test]
    fn opposite_directions_count_separately() {
        let doc = parse(json!({
            "nodes": [
                {"label": "|START|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "|END|", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "a", "threshold": 0.0, "counts": [[1.01, 9]]},
                {"label": "b", "threshold": 0.0, "counts": [[1.01, 9]]}
            ],
            "subgraphs": {
                "ORDER": [
                    {"source": 2, "target": 3, "threshold": 0.0, "counts": [[1.01, 1]]},
                    {"source": 3, "target": 2, "threshold": 0.0, "counts": [[1.01, 1]]}
                ]
            }
        }));
        let selection = select(&["ORDER"]);
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());
        // (2,3) and (3,2) are distinct ordered pairs: both edges stay straight.
        assert_eq!(
            graph
                .edges
                .iter()
                .map(|e| e.geometry.curvature())
                .collect::<Vec<_>>(),
            vec![0.0, 0.0]
        );
    }

    #[test]
    fn self_loops_are_flagged_not_curved() {
        let doc = sample_document();
        let selection = select(&["MATERIAL"]);
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.edges[0].geometry.is_self_loop());
    }

    #[test]
    fn legend_lists_only_contributing_types_in_selection_order() {
        let doc = sample_document();
        let selection = select(&["MATERIAL", "ORDER"]);

        // At 0.1 only ORDER has a visible edge.
        let graph = filter_graph(&doc, 0.1, &selection, &flat(), &PositionCache::new());
        assert_eq!(graph.legend.len(), 1);
        assert_eq!(graph.legend[0].object_type, "ORDER");

        // At 0.5 both contribute, in selection order, with their
        // selection-order palette colors.
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());
        let legend: Vec<(&str, &str)> = graph
            .legend
            .iter()
            .map(|entry| (entry.object_type.as_str(), entry.color.as_str()))
            .collect();
        assert_eq!(legend, vec![("MATERIAL", "#E53935"), ("ORDER", "#1E88E5")]);
    }

    #[test]
    fn unknown_selected_types_are_skipped() {
        let doc = sample_document();
        let selection = select(&["ORDER", "NO_SUCH_TYPE"]);
        let graph = filter_graph(&doc, 1.0, &selection, &flat(), &PositionCache::new());
        assert_eq!(graph.legend.len(), 1);
        assert!(graph.edges.iter().all(|e| e.object_type == "ORDER"));
    }

    #[test]
    fn nodes_are_ordered_by_net_flow() {
        let doc = parse(json!({
            "nodes": [
                {"label": "|START|", "threshold": 0.0, "counts": [[1.01, 10]]},
                {"label": "|END|", "threshold": 0.0, "counts": [[1.01, 10]]},
                {"label": "a", "threshold": 0.0, "counts": [[1.01, 10]]}
            ],
            "subgraphs": {
                "ORDER": [
                    {"source": 0, "target": 2, "threshold": 0.0, "counts": [[1.01, 10]]},
                    {"source": 2, "target": 1, "threshold": 0.0, "counts": [[1.01, 10]]}
                ]
            }
        }));
        let selection = select(&["ORDER"]);
        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &PositionCache::new());
        // Start has flow -10, the middle node 0, the end +10.
        assert_eq!(graph.node_ids(), vec![0, 2, 1]);
    }

    #[test]
    fn cached_positions_are_pinned_on_nodes() {
        let doc = sample_document();
        let selection = select(&["ORDER"]);
        let mut cache = PositionCache::new();
        cache.sync_document(&doc);
        cache.on_drag_end(2, crate::layout::Position::new(10.0, 20.0));

        let graph = filter_graph(&doc, 0.5, &selection, &flat(), &cache);
        let pinned = graph.nodes.iter().find(|n| n.id == 2).unwrap();
        assert_eq!(pinned.position, Some(crate::layout::Position::new(10.0, 20.0)));
        let free = graph.nodes.iter().find(|n| n.id == 3).unwrap();
        assert_eq!(free.position, None);
    }

    #[test]
    fn widths_flow_from_the_highlighter() {
        let doc = sample_document();
        let selection = select(&["ORDER"]);
        let graph = filter_graph(
            &doc,
            0.5,
            &selection,
            &linear_trace_count(),
            &PositionCache::new(),
        );
        // The 20-count start edge saturates at 1.5, the 8-count edges sit
        // at 0.2 + 1.3 * 8/20.
        let widths: Vec<f64> = graph.edges.iter().map(|e| e.width).collect();
        assert!((widths[0] - 1.5).abs() < 1e-12);
        assert!((widths[1] - (0.2 + 1.3 * 0.4)).abs() < 1e-12);
    }

    mod monotonic_reveal {
        use proptest::prelude::*;
        use std::collections::{HashMap, HashSet};

        use super::*;

        fn arbitrary_document() -> impl Strategy<Value = DfmDocument> {
            let node_count = 3..7usize;
            node_count.prop_flat_map(|n| {
                let nodes = proptest::collection::vec(0.0..=1.0f64, n);
                let edges = proptest::collection::vec(
                    (0..n, 0..n, 0.0..=1.0f64, 1..50u64),
                    1..12,
                );
                (nodes, edges, edges_label_split())
                    .prop_map(move |(thresholds, edges, split)| {
                        build_document(&thresholds, &edges, split)
                    })
            })
        }

        // Distributes edges over one or two object types.
        fn edges_label_split() -> impl Strategy<Value = bool> {
            proptest::bool::ANY
        }

        fn build_document(
            thresholds: &[f64],
            edges: &[(usize, usize, f64, u64)],
            two_types: bool,
        ) -> DfmDocument {
            let nodes: Vec<serde_json::Value> = thresholds
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    serde_json::json!({
                        "label": format!("n{i}"),
                        "threshold": t,
                        "counts": [[1.01, 1]]
                    })
                })
                .collect();

            let mut subgraphs: HashMap<&str, Vec<serde_json::Value>> = HashMap::new();
            for (i, &(source, target, threshold, count)) in edges.iter().enumerate() {
                let object_type = if two_types && i % 2 == 1 { "B" } else { "A" };
                subgraphs.entry(object_type).or_default().push(serde_json::json!({
                    "source": source,
                    "target": target,
                    "threshold": threshold,
                    "counts": [[threshold, 0], [1.01, count]]
                }));
            }

            DfmDocument::from_value(serde_json::json!({
                "nodes": nodes,
                "subgraphs": subgraphs
            }))
            .unwrap()
        }

        fn visible_sets(
            document: &DfmDocument,
            threshold: f64,
        ) -> (HashSet<usize>, HashMap<(String, usize, usize), usize>) {
            let selection: Vec<String> =
                document.object_types().map(str::to_string).collect();
            let graph = filter_graph(
                document,
                threshold,
                &selection,
                &FlatHighlighter,
                &PositionCache::new(),
            );
            let nodes = graph.node_ids().into_iter().collect();
            let mut edges: HashMap<(String, usize, usize), usize> = HashMap::new();
            for edge in &graph.edges {
                *edges
                    .entry((edge.object_type.clone(), edge.source, edge.target))
                    .or_default() += 1;
            }
            (nodes, edges)
        }

        proptest! {
            #[test]
            fn lower_threshold_reveals_a_subset(
                document in arbitrary_document(),
                a in 0.0..=1.0f64,
                b in 0.0..=1.0f64,
            ) {
                let (t1, t2) = if a <= b { (a, b) } else { (b, a) };
                let (nodes_low, edges_low) = visible_sets(&document, t1);
                let (nodes_high, edges_high) = visible_sets(&document, t2);

                prop_assert!(nodes_low.is_subset(&nodes_high));
                for (key, count) in &edges_low {
                    prop_assert!(edges_high.get(key).copied().unwrap_or(0) >= *count);
                }
            }
        }
    }
}
