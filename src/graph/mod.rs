pub mod attributed_graph;
pub mod node_ids;
pub mod render;
pub mod stories;
pub mod unified;
