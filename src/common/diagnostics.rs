//! Diagnostic reporting for recoverable decoding anomalies.
//!
//! Every anomaly that does not abort decoding (a truncated record, an
//! unknown formula token, a re-claimed sector in permissive mode) is sent to
//! the `log` facade and, when the caller supplied one, written as a single
//! line to a diagnostic sink.

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;

/// Writer receiving one line per diagnostic.
pub type DiagnosticSink = Box<dyn Write + Send>;

/// Shared diagnostic reporter.
///
/// The sink is behind a lock so that lazily loaded sheets may report from
/// different threads.
#[derive(Default)]
pub struct Diagnostics {
    sink: Option<Mutex<DiagnosticSink>>,
}

impl Diagnostics {
    /// A reporter that only logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that logs and also writes to `sink`.
    pub fn with_sink(sink: DiagnosticSink) -> Self {
        Diagnostics {
            sink: Some(Mutex::new(sink)),
        }
    }

    /// Whether a sink is attached.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Report an anomaly that changes the decoded result.
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        log::warn!("{}", message);
        self.emit("WARNING", message);
    }

    /// Report a noteworthy but harmless condition.
    pub fn note(&self, message: fmt::Arguments<'_>) {
        log::info!("{}", message);
        self.emit("NOTE", message);
    }

    /// Verbose tracing; never goes to the sink.
    pub fn debug(&self, message: fmt::Arguments<'_>) {
        log::debug!("{}", message);
    }

    fn emit(&self, level: &str, message: fmt::Arguments<'_>) {
        if let Some(sink) = &self.sink {
            let mut sink = sink.lock();
            // A failing sink must not turn a recoverable anomaly into an error.
            let _ = writeln!(sink, "{} *** {}", level, message);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::capture::CaptureSink;
    use super::*;

    #[test]
    fn test_warn_writes_prefixed_line() {
        let sink = CaptureSink::default();
        let diagnostics = Diagnostics::with_sink(Box::new(sink.clone()));
        diagnostics.warn(format_args!("record 0x{:04X} truncated", 0x0203));
        diagnostics.note(format_args!("ignoring chart"));
        diagnostics.debug(format_args!("not written"));
        assert_eq!(
            sink.text(),
            "WARNING *** record 0x0203 truncated\nNOTE *** ignoring chart\n"
        );
    }

    #[test]
    fn test_without_sink() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_sink());
        diagnostics.warn(format_args!("only logged"));
    }
}
