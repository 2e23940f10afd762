//! Lexing: byte stream to the raw token stream `P`.
//!
//! The pipeline is detab → logos scan → stream assembly. Assembly drops
//! whitespace, merges consecutive `//` lines into single comment tokens,
//! strips block comment continuation prefixes, joins adjacent string
//! literals, elides `#if 0 … #endif` regions outright, and stamps every
//! token with its 1-based line/column and raw index.

mod raw;

pub use raw::RawToken;

use logos::Logos;
use smol_str::SmolStr;

use crate::base::Interner;
use crate::diag::{DiagSink, ErrorCode};
use crate::token::{COM_FLAG_LINE, Token, TokenKind, matcher};

/// Replace tabs with spaces such that column numbers are stable: each
/// tab advances to the next multiple of the tab width. CR is dropped,
/// LF preserved, all other bytes below 0x20 dropped. Widths other than
/// 4 and 8 are clamped.
pub fn detab(src: &str, tab_width: u32) -> String {
    let width = if tab_width > 4 { 8 } else { 4 } as usize;
    let mut out = String::with_capacity(src.len());
    let mut col = 0usize;
    for ch in src.chars() {
        match ch {
            ' ' => {
                col += 1;
                out.push(' ');
            }
            '\t' => {
                let n = width - (col % width);
                col += n;
                for _ in 0..n {
                    out.push(' ');
                }
            }
            '\n' => {
                col = 0;
                out.push('\n');
            }
            c if (c as u32) < 0x20 => {}
            c => {
                col += 1;
                out.push(c);
            }
        }
    }
    out
}

/// Byte-offset to 1-based line/column conversion over a fixed text.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(n) => n,
            Err(n) => n - 1,
        };
        ((line + 1) as u32, (offset - self.starts[line] + 1) as u32)
    }
}

fn strip_line_comment(slice: &str) -> &str {
    let body = &slice[2..];
    if body.starts_with(' ') {
        body.trim_start_matches(' ')
    } else if let Some(rest) = body.strip_prefix('\t') {
        rest
    } else {
        body
    }
}

fn unescape_comment(line: &str, out: &mut String) {
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('/') => {
                    out.push('/');
                    chars.next();
                    continue;
                }
                Some('*') => {
                    out.push('*');
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
}

/// Strip `/* */` delimiters and per-line `**` / `//` continuation
/// prefixes. A block starting at column 1 keeps the leading whitespace
/// of its continuation lines, the common practice for synopses.
fn strip_block_comment(slice: &str, start_col: u32) -> String {
    let interior = slice
        .strip_prefix("/*")
        .unwrap_or(slice)
        .strip_suffix("*/")
        .unwrap_or(slice);
    let mut out = String::with_capacity(interior.len());
    for (n, raw_line) in interior.split('\n').enumerate() {
        let mut line = raw_line;
        if n == 0 {
            line = line.trim_start_matches([' ', '\t']);
        } else {
            out.push('\n');
            if start_col != 1 {
                line = line.trim_start_matches([' ', '\t']);
            }
            if line.starts_with("**") || line.starts_with("//") {
                line = &line[2..];
                if line.starts_with('\t') || line.starts_with(' ') {
                    line = &line[1..];
                }
            }
        }
        unescape_comment(line, &mut out);
    }
    out
}

/// Apply string escapes: `\"` and `\\` are honored, any other
/// backslash pair is passed through verbatim.
fn unescape_string(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some(q) if q == quote => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

type RawItem = (Result<RawToken, ()>, std::ops::Range<usize>);

fn newline_count(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

/// Lex detabbed text into the raw stream.
///
/// Lex errors are fatal to the file: no tokens are produced.
pub fn lex(
    text: &str,
    file: &str,
    interner: &mut Interner,
    diags: &mut DiagSink,
) -> Result<Vec<Token>, ErrorCode> {
    let index = LineIndex::new(text);
    let raws: Vec<RawItem> = RawToken::lexer(text).spanned().collect();
    let mut toks: Vec<Token> = Vec::with_capacity(raws.len());

    let mut i = 0usize;
    while i < raws.len() {
        let (ref res, ref span) = raws[i];
        let slice = &text[span.clone()];
        let (line, col) = index.position(span.start);

        let rt = match res {
            Ok(rt) => *rt,
            Err(()) => {
                diags.fatal(
                    "lex",
                    ErrorCode::Syntax,
                    file,
                    line,
                    col,
                    format!("unknown sequence [{slice}]"),
                );
                return Err(ErrorCode::Syntax);
            }
        };

        match rt {
            RawToken::Whitespace => {
                i += 1;
            }

            RawToken::HashIf if peek_if_zero(text, &raws, i) => {
                // `#if 0 … #endif` blocks are elided outright, whatever
                // they contain. Any nested #if/#endif pair counts.
                let mut level = 1u32;
                let mut j = i + 1;
                while j < raws.len() && level > 0 {
                    match raws[j].0 {
                        Ok(RawToken::HashIf) | Ok(RawToken::HashIfdef) | Ok(RawToken::HashIfndef) => level += 1,
                        Ok(RawToken::HashEndif) => level -= 1,
                        _ => {}
                    }
                    j += 1;
                }
                i = j;
            }

            RawToken::LineComment => {
                let mut body = String::from(strip_line_comment(slice));
                let mut end_line = line;
                let mut j = i + 1;
                // Merge directly following `//` lines until a blank
                // line or a non-comment token separates them.
                while j + 1 < raws.len() {
                    let (Ok(RawToken::Whitespace), ref wspan) = raws[j] else { break };
                    if newline_count(&text[wspan.clone()]) != 1 {
                        break;
                    }
                    let (Ok(RawToken::LineComment), ref cspan) = raws[j + 1] else { break };
                    let (cline, _) = index.position(cspan.start);
                    if cline != end_line + 1 {
                        break;
                    }
                    body.push('\n');
                    body.push_str(strip_line_comment(&text[cspan.clone()]));
                    end_line = cline;
                    j += 2;
                }
                let mut t = Token::new(TokenKind::Comment, SmolStr::new(&body), line, col);
                t.flags |= COM_FLAG_LINE;
                toks.push(t);
                i = j;
            }

            RawToken::BlockComment => {
                let body = strip_block_comment(slice, col);
                toks.push(Token::new(TokenKind::Comment, SmolStr::new(&body), line, col));
                i += 1;
            }

            RawToken::Str => {
                let mut body = unescape_string(&slice[1..slice.len() - 1], '"');
                let mut j = i + 1;
                // Adjacent double-quoted literals join into one token.
                loop {
                    let mut k = j;
                    while k < raws.len() && matches!(raws[k].0, Ok(RawToken::Whitespace)) {
                        k += 1;
                    }
                    if k < raws.len() && matches!(raws[k].0, Ok(RawToken::Str)) {
                        let s = &text[raws[k].1.clone()];
                        body.push_str(&unescape_string(&s[1..s.len() - 1], '"'));
                        j = k + 1;
                        continue;
                    }
                    break;
                }
                let mut t = Token::new(TokenKind::StrLit, SmolStr::new(&body), line, col);
                t.str_no = Some(interner.intern(&t.text));
                toks.push(t);
                i = j;
            }

            RawToken::CharLit => {
                let body = unescape_string(&slice[1..slice.len() - 1], '\'');
                let mut t = Token::new(TokenKind::CharLit, SmolStr::new(&body), line, col);
                t.str_no = Some(interner.intern(&t.text));
                toks.push(t);
                i += 1;
            }

            other => {
                let kind = TokenKind::from(other);
                let mut t = Token::new(kind, slice, line, col);
                if kind == TokenKind::Word || kind.is_literal() {
                    t.str_no = Some(interner.intern(slice));
                }
                toks.push(t);
                i += 1;
            }
        }
    }

    for (n, t) in toks.iter_mut().enumerate() {
        t.orig = n as u32;
    }
    Ok(toks)
}

/// True when the directive at `i` is `#if` immediately followed by the
/// literal 0.
fn peek_if_zero(text: &str, raws: &[RawItem], i: usize) -> bool {
    let mut j = i + 1;
    while j < raws.len() && matches!(raws[j].0, Ok(RawToken::Whitespace)) {
        j += 1;
    }
    j < raws.len()
        && matches!(raws[j].0, Ok(RawToken::Integer))
        && &text[raws[j].1.clone()] == "0"
}

/// Detab, lex and match in one step: the per-file activation path.
pub fn tokenize(
    src: &str,
    file: &str,
    tab_width: u32,
    interner: &mut Interner,
    diags: &mut DiagSink,
) -> Result<Vec<Token>, ErrorCode> {
    let text = detab(src, tab_width);
    let mut toks = lex(&text, file, interner, diags)?;
    matcher::match_tokens(&mut toks, file, diags)?;
    Ok(toks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(src: &str) -> Vec<Token> {
        let mut interner = Interner::new();
        let mut diags = DiagSink::new();
        tokenize(src, "t.cpp", 4, &mut interner, &mut diags).expect("lex failed")
    }

    fn kinds(toks: &[Token]) -> Vec<TokenKind> {
        toks.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_detab_advances_to_multiple() {
        assert_eq!(detab("a\tb", 4), "a   b");
        assert_eq!(detab("abcd\te", 4), "abcd    e");
        assert_eq!(detab("a\tb", 8), "a       b");
        assert_eq!(detab("a\r\nb", 4), "a\nb");
    }

    #[test]
    fn test_empty_source_yields_zero_tokens() {
        assert!(lex_ok("").is_empty());
    }

    #[test]
    fn test_simple_declaration() {
        let toks = lex_ok("int x = 1 ;");
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Int,
                TokenKind::Word,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Semicolon
            ]
        );
        assert_eq!(toks[1].text, "x");
        assert_eq!(toks[1].line, 1);
        assert_eq!(toks[1].col, 5);
    }

    #[test]
    fn test_raw_indices_are_sequential() {
        let toks = lex_ok("int a; int b;");
        for (i, t) in toks.iter().enumerate() {
            assert_eq!(t.orig, i as u32);
            assert!(t.line >= 1 && t.col >= 1);
        }
    }

    #[test]
    fn test_operator_runs_split_longest_legal() {
        let toks = lex_ok("a >>= b >> c >= d > e");
        assert_eq!(toks[1].kind, TokenKind::RshiftEq);
        assert_eq!(toks[3].kind, TokenKind::Rshift);
        assert_eq!(toks[5].kind, TokenKind::MoreEq);
        assert_eq!(toks[7].kind, TokenKind::More);
    }

    #[test]
    fn test_scope_tilde_is_one_token() {
        let toks = lex_ok("A::~A()");
        assert_eq!(toks[1].kind, TokenKind::ScopeTilde);
    }

    #[test]
    fn test_template_close_run() {
        // *>:: splits into the longest legal prefixes
        let toks = lex_ok("x*>::y");
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::Word,
                TokenKind::Mult,
                TokenKind::More,
                TokenKind::Scope,
                TokenKind::Word
            ]
        );
        assert_eq!(toks[2].col, 3);
    }

    #[test]
    fn test_number_classification() {
        let toks = lex_ok("10 3.14 1.5e-3 0x1F 0755 077");
        assert_eq!(toks[0].kind, TokenKind::Integer);
        assert_eq!(toks[1].kind, TokenKind::StdForm);
        assert_eq!(toks[2].kind, TokenKind::StdForm);
        assert_eq!(toks[3].kind, TokenKind::Hex);
        assert_eq!(toks[4].kind, TokenKind::Octal);
        assert_eq!(toks[5].kind, TokenKind::Octal);
    }

    #[test]
    fn test_string_escapes_and_concat() {
        let toks = lex_ok(r#"const char* s = "a\"b" "cd";"#);
        let lit: Vec<_> = toks.iter().filter(|t| t.kind == TokenKind::StrLit).collect();
        assert_eq!(lit.len(), 1);
        assert_eq!(lit[0].text, "a\"bcd");
    }

    #[test]
    fn test_char_literal() {
        let toks = lex_ok(r"char c = '\'';");
        let lit: Vec<_> = toks.iter().filter(|t| t.kind == TokenKind::CharLit).collect();
        assert_eq!(lit[0].text, "'");
    }

    #[test]
    fn test_line_comments_merge() {
        let toks = lex_ok("// first\n// second\nint x;\n// alone\n");
        let comments: Vec<_> = toks.iter().filter(|t| t.is_comment()).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first\nsecond");
        assert_eq!(comments[1].text, "alone");
        assert!(comments[0].flags & COM_FLAG_LINE != 0);
    }

    #[test]
    fn test_blank_line_separates_line_comments() {
        let toks = lex_ok("// one\n\n// two\n");
        let comments: Vec<_> = toks.iter().filter(|t| t.is_comment()).collect();
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn test_block_comment_continuation_stripped() {
        let toks = lex_ok("    /*  Heading\n    **  body line\n    */\nint x;");
        let c = toks.iter().find(|t| t.is_comment()).unwrap();
        assert!(c.text.starts_with("Heading"));
        assert!(c.text.contains("body line"));
        assert!(!c.text.contains("**"));
    }

    #[test]
    fn test_if_zero_block_elided() {
        let toks = lex_ok("int a;\n#if 0\nthis is @#! not C++\n#endif\nint b;");
        let words: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert!(words.contains(&"a") && words.contains(&"b"));
        assert!(!toks.iter().any(|t| t.kind.is_directive()));
    }

    #[test]
    fn test_if_zero_nested_directives() {
        let toks = lex_ok("#if 0\n#ifdef X\njunk\n#endif\nmore\n#endif\nint a;");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[1].text, "a");
    }

    #[test]
    fn test_directives_lex_as_tokens() {
        let toks = lex_ok("#ifdef FOO\n#define BAR 1\n#endif\n");
        assert_eq!(toks[0].kind, TokenKind::HashIfdef);
        assert_eq!(toks[2].kind, TokenKind::HashDefine);
        assert_eq!(toks[5].kind, TokenKind::HashEndif);
    }

    #[test]
    fn test_unknown_sequence_is_fatal() {
        let mut interner = Interner::new();
        let mut diags = DiagSink::new();
        let r = tokenize("int a = @@;", "t.cpp", 4, &mut interner, &mut diags);
        assert_eq!(r, Err(ErrorCode::Syntax));
    }

    #[test]
    fn test_keywords_and_booleans() {
        let toks = lex_ok("static const bool b = true;");
        assert_eq!(toks[0].kind, TokenKind::KwStatic);
        assert_eq!(toks[1].kind, TokenKind::Const);
        assert_eq!(toks[2].kind, TokenKind::Word); // bool is not a reserved kind
        assert_eq!(toks[5].kind, TokenKind::Boolean);
        assert_eq!(toks[5].text, "true");
    }

    #[test]
    fn test_ellipsis_and_indirection() {
        let toks = lex_ok("f(int, ...); char** p;");
        assert!(toks.iter().any(|t| t.kind == TokenKind::Ellipsis));
        assert!(toks.iter().any(|t| t.kind == TokenKind::Indirect && t.text == "**"));
    }
}
