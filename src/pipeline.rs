use crate::config::{AnalysisConfig, Mode};
use crate::error::{AnalysisError, Result};
use crate::file_format::event::{Event, EventLabel, METHOD, URI};
use crate::file_format::ltsv::{read_log_file, LogRecord};
use crate::graph::attributed_graph::AttributedGraph;
use crate::graph::node_ids::IdAllocator;
use crate::graph::render::write_graph;
use crate::graph::stories::build_story_graph;
use crate::graph::unified::build_unified_graph;
use crate::session::assemble_sessions;
use crate::statistics::StatisticsReport;
use crate::uri_unifier::UriUnifier;

/// What a finished run produced.
#[derive(Debug)]
pub enum RunOutput {
    Graph { nodes: usize, edges: usize },
    /// Statistics runs hand back the report for the caller to print.
    Statistics(String),
}

/// Drop ignored records and canonicalize the URIs of the rest, pairing each
/// surviving record with its label.  Records without a method or URI are
/// data errors.
pub fn canonicalize_records(
    records: Vec<LogRecord>,
    unifier: &mut UriUnifier,
) -> Result<Vec<(LogRecord, EventLabel)>> {
    let mut kept = Vec::with_capacity(records.len());
    let mut ignored = 0;
    for record in records {
        let raw_uri = record.require(URI)?;
        if unifier.is_ignored(raw_uri) {
            ignored += 1;
            continue;
        }
        let method = record.require(METHOD)?;
        let uri = unifier.canonicalize(method, raw_uri);
        let label = EventLabel::new(method, &uri);
        kept.push((record, label));
    }
    debug!(kept = kept.len(), ignored, "canonicalized records");
    Ok(kept)
}

/// Build the graph for a graph-producing mode entirely in memory.
pub fn build_graph(
    mode: Mode,
    records: Vec<(LogRecord, EventLabel)>,
    identifier_key: &str,
) -> Result<AttributedGraph> {
    let events = records
        .into_iter()
        .map(|(record, label)| Event::from_record(record, identifier_key, label.uri()))
        .collect::<Result<Vec<Event>>>()?;
    let sessions = assemble_sessions(events);

    // One allocator per run so ids are dense and reproducible.
    let mut ids = IdAllocator::new();
    let graph = match mode {
        Mode::Unified => build_unified_graph(&sessions, &mut ids),
        Mode::Stories | Mode::Statistics => build_story_graph(&sessions, &mut ids),
    };
    Ok(graph)
}

pub fn build_statistics(config: &AnalysisConfig, records: &[(LogRecord, EventLabel)], unifier: &UriUnifier) -> String {
    let mut report = StatisticsReport::new(&config.aggregates);
    for (record, label) in records {
        report.observe(record, label);
    }
    report.render(&unifier.hit_counts())
}

/// Run one analysis end to end.  Everything is built in memory first and the
/// output written once at the end, so a failure leaves no partial graph.
pub fn run(config: &AnalysisConfig) -> Result<RunOutput> {
    let _span = info_span!("run", mode = ?config.mode, log = %config.log_path.display()).entered();

    let output_format = match (config.mode, config.output_format) {
        (Mode::Statistics, _) => None,
        (_, Some(format)) => Some(format),
        (mode, None) => {
            return Err(AnalysisError::invariant(format!(
                "{:?} run configured without an output format",
                mode
            )));
        }
    };

    // Patterns are compiled before the log is read so a typo fails fast.
    let mut unifier = UriUnifier::new(&config.aggregates, &config.ignore)?;
    let records = read_log_file(&config.log_path, &config.identifier)?;
    let records = canonicalize_records(records, &mut unifier)?;

    let output_format = match output_format {
        Some(format) => format,
        None => {
            return Ok(RunOutput::Statistics(build_statistics(config, &records, &unifier)));
        }
    };

    let graph = build_graph(config.mode, records, &config.identifier)?;
    write_graph(&graph, &config.out, output_format)?;
    Ok(RunOutput::Graph {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    })
}
