use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

/// Install a stderr fmt subscriber, but only if RUST_LOG is set to something.
///
/// Wrapper scripts frequently set RUST_LOG unconditionally with an empty
/// value, and that shouldn't turn logging on.  Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_logging() {
    let rustlog = match std::env::var("RUST_LOG") {
        Ok(value) if !value.is_empty() => value,
        _ => return,
    };

    let env_filter = match EnvFilter::try_new(&rustlog) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("Ignoring unparseable RUST_LOG {:?}: {}", rustlog, err);
            return;
        }
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        // Output mostly ends up in files, where escape codes are noise.
        .with_ansi(false)
        // Runs are short; wall time just eats columns.
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = Registry::default().with(layer).try_init();
}
