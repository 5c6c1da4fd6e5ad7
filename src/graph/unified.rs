use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use super::attributed_graph::{AttributedGraph, EdgeAttrs, NodeAttrs};
use super::node_ids::{IdAllocator, NodeNamespace};
use crate::file_format::event::EventLabel;
use crate::session::Session;

/// An edge survives if it carries at least this share of the traffic leaving
/// either of its endpoints.
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.072;

#[derive(Debug, Default)]
struct OutgoingTransitions {
    total: u64,
    targets: BTreeMap<EventLabel, u64>,
}

/// How often each request pattern was immediately followed by each other
/// one, over all sessions.
#[derive(Debug, Default)]
pub struct TransitionCounts {
    sources: BTreeMap<EventLabel, OutgoingTransitions>,
}

impl TransitionCounts {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let mut counts = TransitionCounts::default();
        for session in sessions {
            // Sessions shorter than two events yield no windows.
            for (prev, next) in session.labels().tuple_windows() {
                counts.record(prev, next);
            }
        }
        counts
    }

    pub fn record(&mut self, from: &EventLabel, to: &EventLabel) {
        let outgoing = self.sources.entry(from.clone()).or_default();
        outgoing.total += 1;
        *outgoing.targets.entry(to.clone()).or_insert(0) += 1;
    }

    /// Number of transitions out of `label`; zero for labels that only ever
    /// ended a session.
    pub fn total_out(&self, label: &EventLabel) -> u64 {
        self.sources.get(label).map_or(0, |o| o.total)
    }

    pub fn count(&self, from: &EventLabel, to: &EventLabel) -> u64 {
        self.sources
            .get(from)
            .and_then(|o| o.targets.get(to))
            .copied()
            .unwrap_or(0)
    }

    /// Every observed `(from, to, count)`, sorted by label.
    pub fn transitions(&self) -> impl Iterator<Item = (&EventLabel, &EventLabel, u64)> {
        self.sources.iter().flat_map(|(from, outgoing)| {
            outgoing
                .targets
                .iter()
                .map(move |(to, count)| (from, to, *count))
        })
    }

    /// Every label that takes part in a transition at either end.
    pub fn labels(&self) -> BTreeSet<&EventLabel> {
        self.transitions()
            .flat_map(|(from, to, _)| vec![from, to])
            .collect()
    }
}

/// Grayscale as an alpha channel over black: `#000000` plus a byte that grows
/// from 30 at rate 0 to 255 at rate 1.
pub fn gray(rate: f64) -> String {
    let intensity = (30.0 + 225.0 * rate).clamp(0.0, 255.0) as u8;
    format!("#000000{:02X}", intensity)
}

/// The two shares an edge `u -> v` is judged by.
///
/// `rate2` divides by `v`'s *outgoing* total rather than its incoming total.
/// That is how the graph has always been drawn; it is kept as is even though
/// it is not a true incoming share.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeRates {
    /// `count / total_out(u)`
    pub rate: f64,
    /// `count / total_out(v)`, or 0 when `v` has no outgoing transitions.
    pub rate2: f64,
}

impl EdgeRates {
    pub fn new(count: u64, source_total_out: u64, target_total_out: u64) -> Self {
        let share = |total: u64| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };
        EdgeRates {
            rate: share(source_total_out),
            rate2: share(target_total_out),
        }
    }

    /// Dropped only when both shares fall short of the threshold.
    pub fn is_significant(&self) -> bool {
        !(self.rate < SIGNIFICANCE_THRESHOLD && self.rate2 < SIGNIFICANCE_THRESHOLD)
    }

    pub fn rate_half(&self) -> f64 {
        (self.rate + self.rate2) / 2.0
    }

    /// Three-stop gradient running from the source's share to the target's.
    pub fn color(&self) -> String {
        format!(
            "{};0.33:{};0.33:{}",
            gray(self.rate),
            gray(self.rate_half()),
            gray(self.rate2)
        )
    }

    pub fn fontcolor(&self) -> String {
        gray(self.rate_half())
    }

    pub fn penwidth(&self) -> u32 {
        (3.0 * self.rate_half()).round().max(1.0) as u32
    }

    pub fn edge_attrs(&self, count: u64) -> EdgeAttrs {
        EdgeAttrs {
            color: Some(self.color()),
            fontcolor: Some(self.fontcolor()),
            penwidth: Some(self.penwidth()),
            label: Some(count.to_string()),
        }
    }
}

/// Node label showing how much traffic leaves the node.
pub fn unified_node_label(label: &EventLabel, total_out: u64) -> String {
    format!("{} ({})\n{}", label.method(), total_out, label.uri())
}

/// Build the weighted transition graph from already-aggregated counts.
pub fn build_unified_graph_from_counts(
    counts: &TransitionCounts,
    ids: &mut IdAllocator,
) -> AttributedGraph {
    let mut graph = AttributedGraph::new("unified");
    for label in counts.labels() {
        let id = ids.id_for(NodeNamespace::Global, label);
        graph.ensure_node(NodeAttrs::boxed(
            id,
            label,
            unified_node_label(label, counts.total_out(label)),
        ));
    }

    let mut dropped = 0;
    for (from, to, count) in counts.transitions() {
        let rates = EdgeRates::new(count, counts.total_out(from), counts.total_out(to));
        if !rates.is_significant() {
            trace!(from = %from, to = %to, count, rate = rates.rate, rate2 = rates.rate2, "dropping edge");
            dropped += 1;
            continue;
        }
        let from_id = ids.id_for(NodeNamespace::Global, from);
        let to_id = ids.id_for(NodeNamespace::Global, to);
        graph.add_edge(from_id, to_id, rates.edge_attrs(count));
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped,
        "built unified graph"
    );
    graph
}

pub fn build_unified_graph(sessions: &[Session], ids: &mut IdAllocator) -> AttributedGraph {
    let counts = TransitionCounts::from_sessions(sessions);
    build_unified_graph_from_counts(&counts, ids)
}
