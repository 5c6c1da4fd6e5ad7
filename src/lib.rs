extern crate serde;
extern crate serde_json;

extern crate chrono;
extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate petgraph;
extern crate regex;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;

pub mod config;
pub mod error;
pub mod file_format;
pub mod file_utils;
pub mod graph;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod statistics;
pub mod uri_unifier;

// Public so the integration tests can use it too.
pub mod utils;
