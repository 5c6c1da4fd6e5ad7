use std::path::Path;

use dot_structures::{Attribute, Edge, EdgeTy, Graph, Id, Node, NodeId, Stmt, Vertex};
use graphviz_rust::{
    cmd::{CommandArg, Format},
    exec, print,
    printer::PrinterContext,
};

use super::attributed_graph::AttributedGraph;
use super::node_ids::GraphNodeId;
use crate::error::{AnalysisError, Result};
use crate::file_utils::{ensure_parent_dir, write_file_ensuring_parent_dir};

/// What we write, picked from the output file's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    /// Also used for `.html`, which browsers display fine.
    Svg,
    Png,
    /// The abstract graph itself, for tooling and tests.
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("dot") => Ok(OutputFormat::Dot),
            Some("svg") | Some("html") => Ok(OutputFormat::Svg),
            Some("png") => Ok(OutputFormat::Png),
            Some("json") => Ok(OutputFormat::Json),
            _ => Err(AnalysisError::bad_input(format!(
                "unexpected extension: {}",
                path.display()
            ))),
        }
    }
}

fn plain(text: &str) -> Id {
    Id::Plain(text.to_string())
}

/// DOT quoted string.  Newlines become `\n` escapes so graphviz centers each
/// line; backslashes (common in URI patterns) are doubled so they show up.
fn quoted(text: &str) -> Id {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    Id::Escaped(out)
}

fn node_id(id: GraphNodeId) -> NodeId {
    NodeId(Id::Plain(id.get().to_string()), None)
}

pub fn to_dot_graph(graph: &AttributedGraph) -> Graph {
    let mut stmts = vec![];
    for node in graph.nodes() {
        stmts.push(Stmt::Node(Node {
            id: node_id(node.id),
            attributes: vec![
                Attribute(plain("label"), quoted(&node.label)),
                Attribute(plain("shape"), quoted(&node.shape)),
                Attribute(plain("style"), quoted(&node.style)),
            ],
        }));
    }

    for (source, target, attrs) in graph.edges() {
        let mut attributes = vec![];
        if let Some(color) = &attrs.color {
            attributes.push(Attribute(plain("color"), quoted(color)));
        }
        if let Some(fontcolor) = &attrs.fontcolor {
            attributes.push(Attribute(plain("fontcolor"), quoted(fontcolor)));
        }
        if let Some(penwidth) = attrs.penwidth {
            attributes.push(Attribute(plain("penwidth"), plain(&penwidth.to_string())));
        }
        if let Some(label) = &attrs.label {
            attributes.push(Attribute(plain("label"), quoted(label)));
        }
        stmts.push(Stmt::Edge(Edge {
            ty: EdgeTy::Pair(Vertex::N(node_id(source.id)), Vertex::N(node_id(target.id))),
            attributes,
        }));
    }

    Graph::DiGraph {
        id: plain(&graph.name),
        strict: false,
        stmts,
    }
}

pub fn to_dot(graph: &AttributedGraph) -> String {
    print(to_dot_graph(graph), &mut PrinterContext::default())
}

/// Write `graph` to `path` in `format`.  SVG and PNG are produced by the
/// graphviz `dot` executable, which has to be on the PATH.
pub fn write_graph(graph: &AttributedGraph, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Dot => write_file_ensuring_parent_dir(path, &to_dot(graph))?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&graph.to_json())?;
            write_file_ensuring_parent_dir(path, &json)?
        }
        OutputFormat::Svg | OutputFormat::Png => {
            ensure_parent_dir(path)?;
            let graphviz_format = if format == OutputFormat::Svg {
                Format::Svg
            } else {
                Format::Png
            };
            exec(
                to_dot_graph(graph),
                &mut PrinterContext::default(),
                vec![
                    CommandArg::Format(graphviz_format),
                    CommandArg::Output(path.to_string_lossy().to_string()),
                ],
            )
            .map_err(|err| AnalysisError::render(format!("graphviz failed: {}", err)))?;
        }
    }
    info!(path = %path.display(), ?format, "wrote graph");
    Ok(())
}
