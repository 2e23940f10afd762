//! The token model.
//!
//! Source and header files are tokenized according to the syntax rules
//! of C++. All tokens found in a file form the raw stream `P`. The
//! preprocessor resolves directives, #defines and macros and drops
//! comments, leaving only active tokens in the stream `X` which the
//! parser consumes.
//!
//! Active tokens are linked back to adjacent comments in `P` through
//! `com_pre` and `com_post`. An active token may have both a preceding
//! and a following comment, but each comment belongs to at most one
//! token.

mod kind;
pub mod matcher;

pub use kind::{TokenKind, mask};

use smol_str::SmolStr;

use crate::base::StrId;

/// Sentinel for "no cross reference"
pub const NO_IDX: u32 = u32::MAX;

/// Comment flag: the comment was assembled from `//` line comments
pub const COM_FLAG_LINE: u8 = 0x01;
/// Comment flag: the comment has been consumed by a comment processor
pub const COM_FLAG_PROC: u8 = 0x02;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical kind
    pub kind: TokenKind,
    /// Text value (empty for purely structural tokens)
    pub text: SmolStr,
    /// Interned id of the text
    pub str_no: Option<StrId>,
    /// 1-based source line
    pub line: u32,
    /// 1-based source column; 0 marks a token generated by expansion
    pub col: u32,
    /// Index in the raw stream, NO_IDX for generated tokens
    pub orig: u32,
    /// Matched partner index for (), [], {} and ?:
    pub mate: u32,
    /// Raw index of the preceding unattached comment
    pub com_pre: u32,
    /// Raw index of the following comment
    pub com_post: u32,
    /// Count of enclosing {} pairs
    pub level: u16,
    /// Formal-argument ordinal when the token is an ersatz placeholder
    pub arg_no: u16,
    /// Excluded-by-directive depth (zero when active)
    pub excl: u16,
    /// Comment subtype flags
    pub flags: u8,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, line: u32, col: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            str_no: None,
            line,
            col,
            orig: NO_IDX,
            mate: NO_IDX,
            com_pre: NO_IDX,
            com_post: NO_IDX,
            level: 0,
            arg_no: 0,
            excl: 0,
            flags: 0,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }

    /// True once a comment processor has consumed this comment
    pub fn comment_processed(&self) -> bool {
        self.flags & COM_FLAG_PROC != 0
    }

    /// Text for diagnostics: the value where present, else the kind name
    pub fn show(&self) -> &str {
        if self.text.is_empty() {
            self.kind.name()
        } else {
            &self.text
        }
    }
}

/// Convenience access with a safe out-of-range answer, so lookahead
/// never panics at stream end.
pub fn kind_at(toks: &[Token], idx: usize) -> TokenKind {
    toks.get(idx).map(|t| t.kind).unwrap_or(TokenKind::Unknown)
}

/// Text at an index, empty past the end.
pub fn text_at(toks: &[Token], idx: usize) -> &str {
    toks.get(idx).map(|t| t.text.as_str()).unwrap_or("")
}
