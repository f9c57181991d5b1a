//! User-facing notices.
//!
//! The store never fails its caller; instead it hands back a list of
//! [`Notice`]s describing fallbacks, backups, and uploads. Surfaces decide
//! how to show them. The CLI prints them on **stderr** so stdout stays
//! parseable; the HTTP API returns them in the response body.

use std::io::Write;

use serde::Serialize;

use crate::error::StoreError;

/// Severity of a notice.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    fn label(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// One message for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Stable machine-readable code, e.g. `remote_unavailable`.
    pub code: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, code, message)
    }

    pub fn success(code: &str, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, code, message)
    }

    pub fn warning(err: &StoreError) -> Self {
        Self::new(NoticeLevel::Warning, err.code(), err.to_string())
    }

    pub fn error(err: &StoreError) -> Self {
        Self::new(NoticeLevel::Error, err.code(), err.to_string())
    }
}

/// Emits notices somewhere the user will see them.
pub trait NoticeReporter: Send + Sync {
    fn report(&self, notice: &Notice);

    fn report_all(&self, notices: &[Notice]) {
        for notice in notices {
            self.report(notice);
        }
    }
}

/// Human-friendly lines on stderr: `warning: could not reach …`.
pub struct StderrNotices;

impl NoticeReporter for StderrNotices {
    fn report(&self, notice: &Notice) {
        let line = format!("{}: {}\n", notice.level.label(), notice.message);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonNotices;

impl NoticeReporter for JsonNotices {
    fn report(&self, notice: &Notice) {
        let obj = serde_json::json!({
            "event": "notice",
            "level": notice.level,
            "code": notice.code,
            "message": notice.message,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// Discards everything.
pub struct NoNotices;

impl NoticeReporter for NoNotices {
    fn report(&self, _notice: &Notice) {}
}

/// Notice output mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum NoticeMode {
    Off,
    Human,
    Json,
}

impl NoticeMode {
    /// Human notices when stderr is a TTY, JSON lines otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NoticeMode::Human
        } else {
            NoticeMode::Json
        }
    }

    pub fn reporter(&self) -> Box<dyn NoticeReporter> {
        match self {
            NoticeMode::Off => Box::new(NoNotices),
            NoticeMode::Human => Box::new(StderrNotices),
            NoticeMode::Json => Box::new(JsonNotices),
        }
    }
}
