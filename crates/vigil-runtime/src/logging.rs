//! Structured logger initialization.
//!
//! Initializes the process-wide `tracing` subscriber from the
//! configuration's logging triple (level, format, output). Runs exactly
//! once per process; later calls (more engines, tests) are no-ops, as is
//! a call in a process where something else already installed a
//! subscriber.
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use crate::FrameworkConfig;
use std::io::IsTerminal;
use std::sync::Once;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes the global subscriber from the configuration.
pub fn init(config: &FrameworkConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

        let writer = make_writer(&config.log_output);
        let ansi = config.log_output == "stdout" && std::io::stdout().is_terminal();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(ansi);

        let result = if config.log_format == "json" {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        // Err means a subscriber is already installed (e.g. a test
        // harness); keep it.
        let _ = result;
    });
}

fn make_writer(output: &str) -> BoxMakeWriter {
    match output {
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        path => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => BoxMakeWriter::new(std::sync::Arc::new(file)),
            Err(e) => {
                eprintln!("vigil: cannot open log file {path}: {e}; falling back to stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        },
    }
}
