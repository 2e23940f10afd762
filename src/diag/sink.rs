//! Diagnostic accumulation.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{ErrorCode, Severity};

/// A single diagnostic line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub severity: Severity,
    pub code: ErrorCode,
    pub routine: &'static str,
    pub file: SmolStr,
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl Diag {
    /// Render as `<routine> (<code>) <file> line <N> col <M>: <message>`
    pub fn format(&self) -> String {
        format!(
            "{} ({}) {} line {} col {}: {}",
            self.routine, self.code, self.file, self.line, self.col, self.message
        )
    }
}

/// Accumulates diagnostics and the per-call-depth context chain.
///
/// Nested parser routines push context lines as they descend; when the
/// outermost caller decides to surface a failure the chain is drained
/// into the diagnostic stream prefixed by the file name. Absorbing a
/// failure instead truncates the chain back to the caller's depth.
#[derive(Debug, Default)]
pub struct DiagSink {
    diags: Vec<Diag>,
    chain: Vec<String>,
    counts: FxHashMap<SmolStr, (u32, u32)>,
}

impl DiagSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, d: Diag) {
        match d.severity {
            Severity::Warning => {
                tracing::warn!("{}", d.format());
                self.counts.entry(d.file.clone()).or_default().0 += 1;
            }
            Severity::Error | Severity::Fatal => {
                tracing::error!("{}", d.format());
                self.counts.entry(d.file.clone()).or_default().1 += 1;
            }
        }
        self.diags.push(d);
    }

    pub fn warning(
        &mut self,
        routine: &'static str,
        file: &str,
        line: u32,
        col: u32,
        message: impl Into<String>,
    ) {
        self.push(Diag {
            severity: Severity::Warning,
            code: ErrorCode::Format,
            routine,
            file: SmolStr::new(file),
            line,
            col,
            message: message.into(),
        });
    }

    pub fn error(
        &mut self,
        routine: &'static str,
        code: ErrorCode,
        file: &str,
        line: u32,
        col: u32,
        message: impl Into<String>,
    ) {
        self.push(Diag {
            severity: Severity::Error,
            code,
            routine,
            file: SmolStr::new(file),
            line,
            col,
            message: message.into(),
        });
    }

    pub fn fatal(
        &mut self,
        routine: &'static str,
        code: ErrorCode,
        file: &str,
        line: u32,
        col: u32,
        message: impl Into<String>,
    ) {
        self.push(Diag {
            severity: Severity::Fatal,
            code,
            routine,
            file: SmolStr::new(file),
            line,
            col,
            message: message.into(),
        });
    }

    // -----------------------------------------------------------------
    // Context chain
    // -----------------------------------------------------------------

    /// Record a context line at the current call depth.
    pub fn context(&mut self, line: impl Into<String>) {
        self.chain.push(line.into());
    }

    /// Depth marker for [`DiagSink::absorb`].
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Discard context pushed since `mark` (the caller absorbed the
    /// failure).
    pub fn absorb(&mut self, mark: usize) {
        self.chain.truncate(mark);
    }

    /// Surface remaining chain content as error diagnostics for `file`.
    pub fn surface(&mut self, routine: &'static str, file: &str) {
        let lines: Vec<String> = self.chain.drain(..).collect();
        for line in lines {
            self.error(routine, ErrorCode::Syntax, file, 0, 0, line);
        }
    }

    // -----------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------

    pub fn all(&self) -> &[Diag] {
        &self.diags
    }

    /// (warnings, errors) recorded against a file
    pub fn summary(&self, file: &str) -> (u32, u32) {
        self.counts.get(file).copied().unwrap_or((0, 0))
    }

    /// Number of files with at least one error. This is the process
    /// exit code contract: zero means success.
    pub fn files_with_errors(&self) -> usize {
        self.counts.values().filter(|(_, e)| *e > 0).count()
    }

    pub fn has_errors(&self) -> bool {
        self.counts.values().any(|(_, e)| *e > 0)
    }
}

/// Guard against parser loops that fail to advance.
///
/// Every parser loop records the token index at entry and aborts with
/// E_CORRUPT if it is unchanged after one iteration.
#[derive(Debug)]
pub struct LoopGuard {
    last: Option<usize>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn check(&mut self, pos: usize) -> Result<(), ErrorCode> {
        if self.last == Some(pos) {
            return Err(ErrorCode::Corrupt);
        }
        self.last = Some(pos);
        Ok(())
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut sink = DiagSink::new();
        sink.warning("lex", "a.h", 1, 1, "missing comment");
        sink.error("parse", ErrorCode::Syntax, "a.h", 2, 5, "bad statement");
        sink.error("parse", ErrorCode::Syntax, "b.cpp", 9, 1, "bad statement");
        assert_eq!(sink.summary("a.h"), (1, 1));
        assert_eq!(sink.summary("b.cpp"), (0, 1));
        assert_eq!(sink.files_with_errors(), 2);
    }

    #[test]
    fn test_chain_absorb_and_surface() {
        let mut sink = DiagSink::new();
        let mark = sink.depth();
        sink.context("inner detail");
        sink.absorb(mark);
        assert_eq!(sink.depth(), 0);

        sink.context("kept detail");
        sink.surface("parse", "a.h");
        assert_eq!(sink.summary("a.h").1, 1);
    }

    #[test]
    fn test_loop_guard_trips() {
        let mut guard = LoopGuard::new();
        assert!(guard.check(3).is_ok());
        assert!(guard.check(4).is_ok());
        assert!(guard.check(4).is_err());
    }

    #[test]
    fn test_diag_format() {
        let d = Diag {
            severity: Severity::Error,
            code: ErrorCode::Syntax,
            routine: "proc_class",
            file: SmolStr::new("x.h"),
            line: 12,
            col: 3,
            message: "expected '{'".into(),
        };
        assert_eq!(d.format(), "proc_class (E_SYNTAX) x.h line 12 col 3: expected '{'");
    }
}
