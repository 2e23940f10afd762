//! Diagnostics for the analyzer.
//!
//! All diagnostics are text lines carrying the reporting routine, the
//! file, a 1-based line/column and a message. A [`DiagSink`] accumulates
//! them per run together with a context chain that nested parser
//! routines push onto, so the outermost failure point can surface the
//! path that led to it.

mod codes;
mod sink;

pub use codes::ErrorCode;
pub use sink::{Diag, DiagSink, LoopGuard};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Processing continues
    Warning,
    /// The current statement is abandoned, parsing resumes at the next
    /// plausible statement boundary
    #[default]
    Error,
    /// Processing of the current file aborts
    Fatal,
}

impl Severity {
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Warning)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}
