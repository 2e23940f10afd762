//! Recursive-descent construction of the entity model.
//!
//! The parser consumes the active stream statement by statement and
//! feeds the entity model: namespaces, typedefs, forward declarations,
//! class/struct/union/enum definitions (nested), variable declarations,
//! function declarations and definitions, function bodies, and
//! operator and cast-operator functions.
//!
//! Member function bodies encountered inside class bodies are recorded
//! with their token spans and revisited after all members of the class
//! are declared, so forward references within the body resolve.
//!
//! The submodules carve the grammar up the way the statements group:
//! - [`stmts`] - file and namespace level statement dispatch
//! - [`types`] - typlex establishment
//! - [`classes`] - class, struct and union definitions
//! - [`enums`] - enum definitions and the value expression evaluator
//! - [`funcs`] - function declarations, definitions and argument lists
//! - [`body`] - function body statements
//! - [`exprs`] - expression assessment and call resolution

mod body;
mod classes;
mod enums;
mod exprs;
mod funcs;
mod stmts;
mod types;

pub use exprs::match_arg;

use smol_str::SmolStr;

use crate::base::FileId;
use crate::diag::ErrorCode;
use crate::project::Project;
use crate::semantic::{Attrs, EntityId, LookupCtx, ScopeId, Stmt};
use crate::token::{NO_IDX, Token, TokenKind, kind_at, text_at};

/// Parser state over one file's streams.
///
/// The raw and active streams are moved out of the project for the
/// duration of the parse so the model can be mutated freely, and moved
/// back when the parse finishes.
pub struct Parser<'p> {
    pub prj: &'p mut Project,
    pub fid: FileId,
    pub fname: SmolStr,
    /// Raw stream P (for comment links)
    pub p: Vec<Token>,
    /// Active stream X (the parser's sole input)
    pub x: Vec<Token>,
    /// Statements collected at the file level
    pub stmts: Vec<Stmt>,
}

/// Attribute bits collected from declaration prefix keywords
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclPrefix {
    pub attrs: Attrs,
    pub is_static: bool,
    pub is_extern: bool,
    pub is_friend: bool,
}

impl<'p> Parser<'p> {
    // -----------------------------------------------------------------
    // Token inspection
    // -----------------------------------------------------------------

    pub fn kind(&self, at: usize) -> TokenKind {
        kind_at(&self.x, at)
    }

    pub fn text(&self, at: usize) -> &str {
        text_at(&self.x, at)
    }

    pub fn line(&self, at: usize) -> u32 {
        self.x.get(at).map(|t| t.line).unwrap_or(0)
    }

    pub fn col(&self, at: usize) -> u32 {
        self.x.get(at).map(|t| t.col).unwrap_or(0)
    }

    /// Matched partner of a delimiter token
    pub fn mate(&self, at: usize) -> Option<usize> {
        let m = self.x.get(at)?.mate;
        if m == NO_IDX { None } else { Some(m as usize) }
    }

    pub fn at_end(&self, at: usize) -> bool {
        at >= self.x.len()
    }

    // -----------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------

    pub fn error(&mut self, routine: &'static str, at: usize, msg: impl Into<String>) {
        let line = self.line(at);
        let col = self.col(at);
        self.prj
            .diags
            .error(routine, ErrorCode::Syntax, &self.fname, line, col, msg);
    }

    pub fn warning(&mut self, routine: &'static str, at: usize, msg: impl Into<String>) {
        let line = self.line(at);
        let col = self.col(at);
        self.prj.diags.warning(routine, &self.fname, line, col, msg);
    }

    /// Recovery that always makes progress, for use inside statement
    /// loops guarded against stalls.
    pub fn recover_from(&self, from: usize) -> usize {
        let next = self.recover(from);
        if next > from { next } else { from + 1 }
    }

    /// Advance to the next plausible statement boundary: one past the
    /// next `;` at the current code level, or one past the matching
    /// `}` of an intervening open brace.
    pub fn recover(&self, from: usize) -> usize {
        let mut at = from;
        while at < self.x.len() {
            match self.x[at].kind {
                TokenKind::Semicolon => return at + 1,
                TokenKind::BraceOpen => match self.mate(at) {
                    Some(m) => {
                        // A body: its closing brace may be followed by ';'
                        if kind_at(&self.x, m + 1) == TokenKind::Semicolon {
                            return m + 2;
                        }
                        return m + 1;
                    }
                    None => return self.x.len(),
                },
                TokenKind::BraceClose => return at,
                _ => at += 1,
            }
        }
        at
    }

    // -----------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------

    /// Raw index of the comment following an active token, if any and
    /// not already consumed.
    pub fn com_post(&self, at: usize) -> Option<usize> {
        let c = self.x.get(at)?.com_post;
        if c == NO_IDX {
            return None;
        }
        let c = c as usize;
        if self.p.get(c)?.comment_processed() {
            return None;
        }
        Some(c)
    }

    /// Raw index of the comment preceding an active token.
    pub fn com_pre(&self, at: usize) -> Option<usize> {
        let c = self.x.get(at)?.com_pre;
        if c == NO_IDX {
            return None;
        }
        let c = c as usize;
        if self.p.get(c)?.comment_processed() {
            return None;
        }
        Some(c)
    }

    /// Mark a raw-stream comment consumed.
    pub fn consume_comment(&mut self, raw_idx: usize) -> String {
        let t = &mut self.p[raw_idx];
        t.flags |= crate::token::COM_FLAG_PROC;
        t.text.to_string()
    }

    // -----------------------------------------------------------------
    // Declaration prefixes
    // -----------------------------------------------------------------

    /// Consume `const static extern friend inline virtual register` in
    /// any order ahead of a typlex. `const` is left for the typlex
    /// reader. Invalid combinations are a syntax error.
    pub fn read_prefix(&mut self, mut at: usize) -> Result<(DeclPrefix, usize), ErrorCode> {
        let mut pre = DeclPrefix::default();
        loop {
            match self.kind(at) {
                TokenKind::KwStatic => {
                    pre.is_static = true;
                    pre.attrs.set(Attrs::STATIC);
                }
                TokenKind::KwExtern => {
                    pre.is_extern = true;
                    pre.attrs.set(Attrs::EXTERN);
                }
                TokenKind::KwFriend => {
                    pre.is_friend = true;
                    pre.attrs.set(Attrs::FRIEND);
                }
                TokenKind::KwInline => pre.attrs.set(Attrs::INLINE),
                TokenKind::KwVirtual => pre.attrs.set(Attrs::VIRTUAL),
                TokenKind::KwRegister => pre.attrs.set(Attrs::REGISTER),
                TokenKind::Mutable => pre.attrs.set(Attrs::MUTABLE),
                _ => break,
            }
            at += 1;
        }
        if pre.is_static && pre.is_extern {
            self.error("read_prefix", at, "'static' and 'extern' cannot be combined");
            return Err(ErrorCode::Syntax);
        }
        Ok((pre, at))
    }

    /// The lookup context for the current position: file-static table
    /// plus optional host class and function scope.
    pub fn ctx(&self, host: Option<EntityId>, func: Option<ScopeId>) -> LookupCtx {
        LookupCtx {
            host,
            func,
            file: self.prj.file(self.fid).table,
        }
    }
}

/// Parse a preprocessed file into the entity model. Every directly
/// included file parses first, so header order follows the include
/// graph.
pub fn parse_file(prj: &mut Project, fid: FileId, depth: u32) -> Result<(), ErrorCode> {
    if prj.file(fid).stage2 {
        return Ok(());
    }
    if depth > 10 {
        let fname = prj.file(fid).name.clone();
        prj.diags.fatal(
            "parse_file",
            ErrorCode::Corrupt,
            &fname,
            0,
            0,
            "include recursion limit reached",
        );
        return Err(ErrorCode::Corrupt);
    }
    prj.file_mut(fid).stage2 = true;

    for inc in prj.file(fid).direct_inc.clone() {
        parse_file(prj, inc, depth + 1)?;
    }

    let fname = prj.file(fid).name.clone();
    tracing::debug!("parsing {} (level {})", fname, depth);

    let p = std::mem::take(&mut prj.file_mut(fid).raw);
    let x = std::mem::take(&mut prj.file_mut(fid).active);

    let mut parser = Parser {
        prj,
        fid,
        fname,
        p,
        x,
        stmts: Vec::new(),
    };

    let rc = parser.parse_top_level();

    let Parser { prj, p, x, stmts, .. } = parser;
    let f = prj.file_mut(fid);
    f.raw = p;
    f.active = x;
    f.stmts = stmts;
    rc
}

/// Parse every deferred member-function body. Bodies queue while their
/// class definitions are open and drain once the class's entity table
/// is fully populated; this final drain catches bodies of classes
/// whose definitions closed at end of file.
pub fn drain_deferred(prj: &mut Project) -> Result<(), ErrorCode> {
    while let Some(d) = prj.deferred.pop_front() {
        funcs::parse_deferred_body(prj, d)?;
    }
    Ok(())
}
