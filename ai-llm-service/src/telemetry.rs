//! Shared `tracing` setup for the workspace binaries.
//!
//! The binary owns the global subscriber; this module only builds the pieces:
//! a compact fmt layer with RFC3339 UTC timestamps and an `EnvFilter` with
//! per-crate level directives.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Crate targets of this workspace, used for per-crate level directives.
pub const WORKSPACE_TARGETS: [&str; 5] = [
    "ai_llm_service",
    "rag_store",
    "contextor",
    "api",
    "rag_chat_backend",
];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Build the formatting layer.
///
/// - RFC3339 UTC timestamps
/// - Compact single-line format with target and `file:line`
/// - Span close events (duration of instrumented calls)
/// - ANSI colors only when stdout is a terminal
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
}

/// Level directive for one crate target, e.g. `rag_store=debug`.
///
/// Returns `None` for a target that is not a valid directive.
pub fn level_directive(target: &str, level: Level) -> Option<Directive> {
    let s = format!("{target}={}", level.as_str().to_lowercase());
    Directive::from_str(&s).ok()
}

/// `EnvFilter` from `RUST_LOG`, falling back to `default`; when `workspace_level`
/// is set, every crate of this workspace is raised to that level.
///
/// Example: `env_filter_with_level("info", Some(Level::DEBUG))` shows INFO for
/// dependencies and DEBUG for the workspace crates.
pub fn env_filter_with_level(default: &str, workspace_level: Option<Level>) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if let Some(level) = workspace_level {
        for target in WORKSPACE_TARGETS {
            if let Some(d) = level_directive(target, level) {
                filter = filter.add_directive(d);
            }
        }
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_formats_target_and_level() {
        let d = level_directive("rag_store", Level::DEBUG).unwrap();
        assert_eq!(d.to_string().to_lowercase(), "rag_store=debug");
    }
}
