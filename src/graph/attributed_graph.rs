use std::collections::HashMap;

use petgraph::{
    graph::NodeIndex,
    visit::EdgeRef,
    Directed, Direction, Graph,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::node_ids::GraphNodeId;
use crate::file_format::event::EventLabel;

/// Both graph flavors draw request patterns as rounded boxes.
pub const NODE_SHAPE: &str = "box";
pub const NODE_STYLE: &str = "rounded";

/// Per-node payload: the request pattern the node stands for and how it
/// should be drawn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeAttrs {
    pub id: GraphNodeId,
    #[serde(skip)]
    pub event_label: EventLabel,
    pub label: String,
    pub shape: String,
    pub style: String,
}

impl NodeAttrs {
    pub fn boxed(id: GraphNodeId, event_label: &EventLabel, label: String) -> Self {
        NodeAttrs {
            id,
            event_label: event_label.clone(),
            label,
            shape: NODE_SHAPE.to_string(),
            style: NODE_STYLE.to_string(),
        }
    }
}

/// Per-edge drawing payload.  Story edges carry none of these; unified graph
/// edges carry all of them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EdgeAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fontcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penwidth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A directed graph over request patterns that knows how it wants to be
/// drawn.  This is the hand-off point between the graph builders and the
/// renderer.
///
/// petgraph's `Graph` operates in terms of the `NodeIndex` values returned by
/// `add_node`, so we keep a map from our own `GraphNodeId` values to those.
/// Like the builders that use it, the graph is append-only.
#[derive(Debug)]
pub struct AttributedGraph {
    pub name: String,
    graph: Graph<NodeAttrs, EdgeAttrs, Directed>,
    node_id_to_ix: HashMap<GraphNodeId, NodeIndex>,
}

impl AttributedGraph {
    pub fn new(name: &str) -> Self {
        AttributedGraph {
            name: name.to_string(),
            graph: Graph::new(),
            node_id_to_ix: HashMap::new(),
        }
    }

    /// Add the node unless one with the same id is already present, in which
    /// case the existing attributes win.
    pub fn ensure_node(&mut self, attrs: NodeAttrs) -> NodeIndex {
        if let Some(ix) = self.node_id_to_ix.get(&attrs.id) {
            return *ix;
        }
        let id = attrs.id;
        let ix = self.graph.add_node(attrs);
        self.node_id_to_ix.insert(id, ix);
        ix
    }

    /// Add an edge between two nodes that must already have been ensured.
    /// Returns false if either endpoint is unknown.
    pub fn add_edge(&mut self, source: GraphNodeId, target: GraphNodeId, attrs: EdgeAttrs) -> bool {
        match (self.node_id_to_ix.get(&source), self.node_id_to_ix.get(&target)) {
            (Some(s), Some(t)) => {
                self.graph.update_edge(*s, *t, attrs);
                true
            }
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, ix: NodeIndex) -> &NodeAttrs {
        &self.graph[ix]
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttrs> {
        self.graph.raw_nodes().iter().map(|n| &n.weight)
    }

    /// Nodes reachable over a single outgoing edge of `ix`.
    pub fn successors(&self, ix: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(ix, Direction::Outgoing)
    }

    /// Edges in insertion order as (source, target, attributes).
    pub fn edges(&self) -> Vec<(&NodeAttrs, &NodeAttrs, &EdgeAttrs)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
            .collect()
    }

    pub fn find_edge(&self, source: GraphNodeId, target: GraphNodeId) -> Option<&EdgeAttrs> {
        let s = self.node_id_to_ix.get(&source)?;
        let t = self.node_id_to_ix.get(&target)?;
        self.graph.find_edge(*s, *t).map(|e| &self.graph[e])
    }

    /// Edge labels as `"method uri"` pairs; handy for checking structure
    /// without caring about ids.
    pub fn label_edges(&self) -> Vec<(String, String)> {
        self.edges()
            .into_iter()
            .map(|(s, t, _)| (s.event_label.to_string(), t.event_label.to_string()))
            .collect()
    }

    /// Convert the graph to a `{ name, nodes, edges }` rep where nodes are
    /// listed in insertion order and edges refer to node ids.
    pub fn to_json(&self) -> Value {
        let nodes: Vec<Value> = self.nodes().map(|n| json!(n)).collect();
        let edges: Vec<Value> = self
            .edges()
            .into_iter()
            .map(|(s, t, attrs)| {
                let mut edge = json!({ "from": s.id, "to": t.id });
                if let (Value::Object(obj), Value::Object(extra)) = (&mut edge, json!(attrs)) {
                    obj.extend(extra);
                }
                edge
            })
            .collect();

        json!({
            "name": self.name,
            "nodes": nodes,
            "edges": edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node_ids::{IdAllocator, NodeNamespace};

    #[test]
    fn test_ensure_node_and_edges() {
        let mut ids = IdAllocator::new();
        let x = EventLabel::new("GET", "/x");
        let y = EventLabel::new("GET", "/y");
        let xid = ids.id_for(NodeNamespace::Global, &x);
        let yid = ids.id_for(NodeNamespace::Global, &y);

        let mut graph = AttributedGraph::new("test");
        let first = graph.ensure_node(NodeAttrs::boxed(xid, &x, "first".to_string()));
        let again = graph.ensure_node(NodeAttrs::boxed(xid, &x, "second".to_string()));
        assert_eq!(first, again);
        assert_eq!(graph.node(first).label, "first");

        assert!(!graph.add_edge(xid, yid, EdgeAttrs::default()));
        graph.ensure_node(NodeAttrs::boxed(yid, &y, "y".to_string()));
        assert!(graph.add_edge(xid, yid, EdgeAttrs::default()));
        // Re-adding updates rather than duplicating.
        assert!(graph.add_edge(
            xid,
            yid,
            EdgeAttrs {
                penwidth: Some(2),
                ..EdgeAttrs::default()
            }
        ));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.find_edge(xid, yid).unwrap().penwidth, Some(2));
        assert!(graph.find_edge(yid, xid).is_none());
        assert_eq!(
            graph.label_edges(),
            vec![("GET /x".to_string(), "GET /y".to_string())]
        );
    }

    #[test]
    fn test_to_json() {
        let mut ids = IdAllocator::new();
        let x = EventLabel::new("GET", "/x");
        let y = EventLabel::new("POST", "/y");
        let xid = ids.id_for(NodeNamespace::Global, &x);
        let yid = ids.id_for(NodeNamespace::Global, &y);

        let mut graph = AttributedGraph::new("unified");
        graph.ensure_node(NodeAttrs::boxed(xid, &x, x.to_multiline()));
        graph.ensure_node(NodeAttrs::boxed(yid, &y, y.to_multiline()));
        graph.add_edge(
            xid,
            yid,
            EdgeAttrs {
                label: Some("3".to_string()),
                ..EdgeAttrs::default()
            },
        );

        assert_eq!(
            graph.to_json(),
            json!({
                "name": "unified",
                "nodes": [
                    { "id": 0, "label": "GET\n/x", "shape": "box", "style": "rounded" },
                    { "id": 1, "label": "POST\n/y", "shape": "box", "style": "rounded" },
                ],
                "edges": [
                    { "from": 0, "to": 1, "label": "3" },
                ],
            })
        );
    }
}
