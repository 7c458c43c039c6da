//! Logging setup inside a host that already owns the global subscriber.
//!
//! Kept in its own test binary so the global subscriber is installed
//! before anything else touches it.

use quarry::observability::{init_logging, run_span, LogFormat};
use quarry::RunId;

#[test]
fn test_init_logging_defers_to_existing_subscriber() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry()).unwrap();

    init_logging(LogFormat::Json, "debug");
    init_logging(LogFormat::Pretty, "info");

    let run: RunId = "20240501T100000".parse().unwrap();
    let span = run_span(&run);
    let _guard = span.enter();
    tracing::info!("still logging through the host subscriber");
}
