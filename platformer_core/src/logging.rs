//! Process-wide diagnostics sink.
//!
//! Configuration problems are reported here once at initialization; the
//! per-step simulation path never logs.

use std::fmt;
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        };
        write!(f, "{}", label)
    }
}

type Sink = Box<dyn Fn(Severity, &str) + Send + Sync + 'static>;

fn stderr_sink(severity: Severity, message: &str) {
    eprintln!("[{}] {}", severity, message);
}

fn sink_cell() -> &'static Mutex<Sink> {
    static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Box::new(stderr_sink)))
}

/// Replaces the process-wide sink. The default writes to stderr.
pub fn set_sink(sink: impl Fn(Severity, &str) + Send + Sync + 'static) {
    let mut guard = match sink_cell().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Box::new(sink);
}

pub fn report(severity: Severity, message: impl AsRef<str>) {
    let guard = match sink_cell().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    (guard)(severity, message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    report(Severity::Error, message);
}

pub fn warn(message: impl AsRef<str>) {
    report(Severity::Warn, message);
}

pub fn info(message: impl AsRef<str>) {
    report(Severity::Info, message);
}
