use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use super::attributed_graph::{AttributedGraph, EdgeAttrs, NodeAttrs};
use super::node_ids::{IdAllocator, NodeNamespace};
use crate::file_format::event::EventLabel;
use crate::session::Session;

/// Order in which sessions are considered for becoming stories: most
/// distinct request patterns first, ties in input order, empty sessions
/// dropped.  The first of several equivalent sessions is the one whose
/// chain gets drawn, so this ordering decides which session represents a
/// story.
pub fn story_processing_order(sessions: &[Session]) -> Vec<&Session> {
    let mut order: Vec<&Session> = sessions.iter().filter(|s| !s.is_empty()).collect();
    // `sort_by` is stable, which is what keeps ties in input order.
    order.sort_by(|a, b| b.distinct_label_count().cmp(&a.distinct_label_count()));
    order
}

/// Accumulates the distinct stories of a set of sessions into one graph.
///
/// Every retained story is a disjoint chain of nodes, one node per request in
/// the session (a page visited twice is two nodes).  A session whose chain
/// can already be traced along existing nodes with the same labels adds no
/// information and is dropped.
pub struct StoryGraphBuilder<'a> {
    ids: &'a mut IdAllocator,
    graph: AttributedGraph,
    /// All node indices carrying a given label, to seed the containment
    /// search.
    nodes_by_label: HashMap<EventLabel, Vec<NodeIndex>>,
    retained: u32,
}

impl<'a> StoryGraphBuilder<'a> {
    pub fn new(ids: &'a mut IdAllocator) -> Self {
        StoryGraphBuilder {
            ids,
            graph: AttributedGraph::new("stories"),
            nodes_by_label: HashMap::new(),
            retained: 0,
        }
    }

    /// Number of stories retained so far.
    pub fn story_count(&self) -> u32 {
        self.retained
    }

    /// Consider one session; returns true if it became a new story.
    pub fn add_session(&mut self, session: &Session) -> bool {
        if session.is_empty() {
            return false;
        }
        let chain: Vec<&EventLabel> = session.labels().collect();
        if self.contains_chain(&chain) {
            trace!(identifier = %session.identifier, steps = chain.len(), "story already covered");
            return false;
        }
        self.retain_chain(&chain);
        trace!(
            identifier = %session.identifier,
            steps = chain.len(),
            ordinal = self.retained - 1,
            "retained story"
        );
        true
    }

    pub fn finish(self) -> AttributedGraph {
        self.graph
    }

    fn retain_chain(&mut self, chain: &[&EventLabel]) {
        let ordinal = self.retained;
        let mut prev = None;
        for (step, label) in chain.iter().enumerate() {
            let id = self.ids.id_for(
                NodeNamespace::Story {
                    ordinal,
                    step: step as u32,
                },
                label,
            );
            let ix = self
                .graph
                .ensure_node(NodeAttrs::boxed(id, label, label.to_multiline()));
            self.nodes_by_label
                .entry((*label).clone())
                .or_default()
                .push(ix);
            if let Some(prev_id) = prev {
                self.graph.add_edge(prev_id, id, EdgeAttrs::default());
            }
            prev = Some(id);
        }
        self.retained += 1;
    }

    /// Is there a walk through distinct nodes of the accumulated graph whose
    /// labels spell out `chain`, following edges forwards?
    ///
    /// Since every chain is a simple path we don't need general subgraph
    /// isomorphism; this is a backtracking search seeded from the nodes
    /// carrying the first label.  It is deliberately not bounded, so a
    /// pathological graph could make it take a very long time.
    fn contains_chain(&self, chain: &[&EventLabel]) -> bool {
        let (first, rest) = match chain.split_first() {
            Some(split) => split,
            None => return true,
        };
        let starts = match self.nodes_by_label.get(*first) {
            Some(starts) => starts,
            None => return false,
        };
        if rest.is_empty() {
            return true;
        }

        for &start in starts {
            let mut walk = vec![start];
            // pending[i] holds the untried candidates for walk[i + 1].
            let mut pending = vec![self.candidates(start, rest[0], &walk)];
            loop {
                let next = match pending.last_mut() {
                    Some(options) => options.pop(),
                    None => break,
                };
                match next {
                    Some(ix) => {
                        walk.push(ix);
                        if walk.len() == chain.len() {
                            return true;
                        }
                        let options = self.candidates(ix, chain[walk.len()], &walk);
                        pending.push(options);
                    }
                    None => {
                        pending.pop();
                        walk.pop();
                    }
                }
            }
        }
        false
    }

    fn candidates(&self, from: NodeIndex, label: &EventLabel, walk: &[NodeIndex]) -> Vec<NodeIndex> {
        self.graph
            .successors(from)
            .filter(|ix| &self.graph.node(*ix).event_label == label && !walk.contains(ix))
            .collect()
    }
}

/// Build the graph of distinct stories over all sessions.
pub fn build_story_graph(sessions: &[Session], ids: &mut IdAllocator) -> AttributedGraph {
    let order = story_processing_order(sessions);
    let considered = order.len();
    let mut builder = StoryGraphBuilder::new(ids);
    for session in order {
        builder.add_session(session);
    }
    info!(
        sessions = considered,
        stories = builder.story_count(),
        "built story graph"
    );
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::assemble_sessions;
    use crate::session::test_support::visit;

    fn sessions(visits: Vec<Vec<crate::file_format::event::Event>>) -> Vec<Session> {
        assemble_sessions(visits.concat())
    }

    #[test]
    fn test_processing_order() {
        let sessions = sessions(vec![
            visit("a", &["GET /1"]),
            visit("b", &["GET /1", "GET /2", "GET /1"]),
            visit("c", &["GET /3", "GET /4"]),
            visit("d", &["GET /1", "GET /2", "GET /3"]),
            visit("e", &["GET /5", "GET /5", "GET /5", "GET /5"]),
        ]);
        let order: Vec<&str> = story_processing_order(&sessions)
            .iter()
            .map(|s| s.identifier.as_str())
            .collect();
        assert_eq!(order, vec!["d", "b", "c", "a", "e"]);
    }

    #[test]
    fn test_duplicate_sessions_collapse() {
        let sessions = sessions(vec![
            visit("a", &["GET /x", "GET /y"]),
            visit("b", &["GET /x", "GET /y"]),
            visit("c", &["GET /x", "GET /z"]),
        ]);
        let mut ids = IdAllocator::new();
        let graph = build_story_graph(&sessions, &mut ids);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(
            graph.label_edges(),
            vec![
                ("GET /x".to_string(), "GET /y".to_string()),
                ("GET /x".to_string(), "GET /z".to_string()),
            ]
        );
    }

    #[test]
    fn test_subchain_is_covered() {
        let sessions = sessions(vec![
            visit("short", &["GET /b", "GET /c"]),
            visit("long", &["GET /a", "GET /b", "GET /c", "GET /d"]),
            visit("single", &["GET /d"]),
        ]);
        let mut ids = IdAllocator::new();
        let mut builder = StoryGraphBuilder::new(&mut ids);
        let order = story_processing_order(&sessions);
        assert_eq!(order[0].identifier, "long");
        let retained: Vec<bool> = order.iter().map(|s| builder.add_session(s)).collect();
        assert_eq!(retained, vec![true, false, false]);
        assert_eq!(builder.story_count(), 1);
        assert_eq!(builder.finish().node_count(), 4);
    }

    #[test]
    fn test_reversed_chain_is_not_covered() {
        let sessions = sessions(vec![visit("a", &["GET /x", "GET /y"]), visit("b", &["GET /y", "GET /x"])]);
        let mut ids = IdAllocator::new();
        let graph = build_story_graph(&sessions, &mut ids);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_repeats_are_distinct_nodes() {
        let sessions = sessions(vec![
            visit("loop", &["GET /list", "GET /item", "GET /list", "GET /item"]),
            visit("twice", &["GET /list", "GET /item", "GET /list"]),
            visit("more", &["GET /list", "GET /item", "GET /list", "GET /item", "GET /list"]),
        ]);
        let mut ids = IdAllocator::new();
        let mut builder = StoryGraphBuilder::new(&mut ids);
        // All three share two distinct labels, so input order applies.
        let retained: Vec<bool> = story_processing_order(&sessions)
            .iter()
            .map(|s| builder.add_session(s))
            .collect();
        // "twice" walks along "loop"; "more" needs a fifth distinct node.
        assert_eq!(retained, vec![true, false, true]);
        let graph = builder.finish();
        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.edge_count(), 7);
    }

    #[test]
    fn test_backtracks_across_candidates() {
        // Two retained stories both start with /a; only the second continues
        // with /c, so the search has to back out of the first.
        let sessions = sessions(vec![
            visit("first", &["GET /a", "GET /b", "GET /x"]),
            visit("second", &["GET /a", "GET /c", "GET /y"]),
            visit("probe", &["GET /a", "GET /c"]),
        ]);
        let mut ids = IdAllocator::new();
        let mut builder = StoryGraphBuilder::new(&mut ids);
        let retained: Vec<bool> = story_processing_order(&sessions)
            .iter()
            .map(|s| builder.add_session(s))
            .collect();
        assert_eq!(retained, vec![true, true, false]);
    }

    #[test]
    fn test_single_event_sessions() {
        let sessions = sessions(vec![
            visit("path", &["GET /a", "GET /b"]),
            visit("seen", &["GET /b"]),
            visit("new", &["GET /c"]),
        ]);
        let mut ids = IdAllocator::new();
        let mut builder = StoryGraphBuilder::new(&mut ids);
        let retained: Vec<bool> = story_processing_order(&sessions)
            .iter()
            .map(|s| builder.add_session(s))
            .collect();
        // A lone request is kept only when nothing drawn so far carries it.
        assert_eq!(retained, vec![true, false, true]);
        let graph = builder.finish();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let mut ids = IdAllocator::new();
        let graph = build_story_graph(&[], &mut ids);
        assert_eq!(graph.node_count(), 0);
        assert!(ids.is_empty());
    }
}
