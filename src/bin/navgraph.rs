use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use navgraph::config::{AnalysisConfig, Mode, Settings};
use navgraph::logging::init_logging;
use navgraph::pipeline::{run, RunOutput};

/// Reconstruct visitor sessions from an LTSV access log and draw how people
/// move through the site.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Access log in LTSV format
    ltsv: PathBuf,

    /// URI aggregation regexes, comma separated or repeated; a matching URI
    /// is replaced by the pattern text itself
    #[arg(long, num_args = 0..)]
    aggregates: Vec<String>,

    /// URI regexes whose requests are dropped entirely
    #[arg(long, num_args = 0..)]
    ignore: Vec<String>,

    /// Draw one weighted transition graph instead of distinct stories
    #[arg(long)]
    unified: bool,

    /// Print value frequencies instead of drawing a graph
    #[arg(long)]
    statistics: bool,

    /// Log field identifying a visitor [default: uid]
    #[arg(long)]
    identifier: Option<String>,

    /// Output file; .svg, .html, .png, .dot or .json [default: stories.svg]
    #[arg(long)]
    out: Option<PathBuf>,

    /// TOML file providing defaults for the options above
    #[arg(long, env = "NAVGRAPH_CONFIG")]
    config: Option<PathBuf>,
}

fn configure(args: Args) -> navgraph::error::Result<AnalysisConfig> {
    let cli = Settings {
        aggregates: args.aggregates,
        ignore: args.ignore,
        identifier: args.identifier,
        out: args.out,
    };
    let settings = match &args.config {
        Some(path) => cli.over(Settings::load(path)?),
        None => cli,
    };
    AnalysisConfig::new(
        args.ltsv,
        settings,
        Mode::from_flags(args.unified, args.statistics),
    )
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let result = configure(args).and_then(|config| {
        let output = run(&config)?;
        Ok((config, output))
    });

    match result {
        Ok((_, RunOutput::Statistics(report))) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Ok((config, RunOutput::Graph { nodes, edges })) => {
            info!(out = %config.out.display(), nodes, edges, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            // Logging is opt-in, so make sure the failure is seen regardless.
            eprintln!("navgraph: {}", err);
            ExitCode::FAILURE
        }
    }
}
