//! Structured JSON logger for cinder
//!
//! - One log line = one event, written synchronously
//! - Keys sorted alphabetically for deterministic output
//! - Process-wide minimum severity, adjustable at runtime
//! - ERROR and FATAL go to stderr, everything else to stdout

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Per-row or per-call detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(v: u8) -> Severity {
        match v {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    /// Sets the minimum severity that is written
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Turns logging on or off entirely
    pub fn set_enabled(enabled: bool) {
        ENABLED.store(enabled, Ordering::Relaxed);
    }

    /// Returns true if an event of this severity would be written
    pub fn enabled(severity: Severity) -> bool {
        ENABLED.load(Ordering::Relaxed) && severity >= Self::min_severity()
    }

    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = Self::render(severity, event, fields);
        if severity >= Severity::Error {
            Self::write_line(&line, &mut io::stderr());
        } else {
            Self::write_line(&line, &mut io::stdout());
        }
    }

    /// Renders one log line (newline-terminated JSON object).
    ///
    /// Caller fields never override `event`, `severity` or `ts`.
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut obj = Map::new();
        for (key, value) in fields {
            obj.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        obj.insert("event".into(), Value::String(event.to_string()));
        obj.insert("severity".into(), Value::String(severity.as_str().to_string()));
        obj.insert(
            "ts".into(),
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
        );

        let mut line = Value::Object(obj).to_string();
        line.push('\n');
        line
    }

    fn write_line<W: Write>(line: &str, writer: &mut W) {
        // one write per line; logging failures are ignored
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_roundtrip_u8() {
        for s in [
            Severity::Trace,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            assert_eq!(Severity::from_u8(s as u8), s);
        }
    }

    #[test]
    fn test_render_is_json() {
        let line = Logger::render(Severity::Info, "PLAN_INDEX_SCAN", &[("index", "IDX")]);
        assert!(line.ends_with('\n'));

        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["event"], "PLAN_INDEX_SCAN");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["index"], "IDX");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn test_render_sorted_keys() {
        let line = Logger::render(Severity::Warn, "E", &[("zebra", "1"), ("apple", "2")]);
        let apple = line.find("apple").unwrap();
        let event = line.find("\"event\"").unwrap();
        let zebra = line.find("zebra").unwrap();
        assert!(apple < event);
        assert!(event < zebra);
    }

    #[test]
    fn test_render_escapes_and_reserved_keys() {
        let line = Logger::render(
            Severity::Info,
            "E",
            &[("message", "a \"quoted\"\nline"), ("event", "spoofed")],
        );
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["message"], "a \"quoted\"\nline");
        assert_eq!(parsed["event"], "E");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_severity_deserialize() {
        let s: Severity = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(s, Severity::Warn);
    }
}
