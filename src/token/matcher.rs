//! Delimiter matching over a token stream.
//!
//! Matching runs once over the raw stream and again over the active
//! stream after preprocessing. It sets the partner index on every
//! `{}`, `()`, `[]` and `?:` pair and assigns each token a code level
//! equal to the count of enclosing curly braces.

use crate::diag::{DiagSink, ErrorCode};

use super::{NO_IDX, Token, TokenKind};

fn match_pair(
    toks: &mut [Token],
    open: TokenKind,
    close: TokenKind,
    what: &str,
    file: &str,
    diags: &mut DiagSink,
) -> Result<(), ErrorCode> {
    for idx in 0..toks.len() {
        if toks[idx].kind != open {
            continue;
        }
        let mut level = 1u32;
        let mut at = idx + 1;
        while level > 0 && at < toks.len() {
            if toks[at].kind == open {
                level += 1;
            }
            if toks[at].kind == close {
                level -= 1;
            }
            at += 1;
        }
        if level > 0 {
            diags.fatal(
                "match_tokens",
                ErrorCode::Syntax,
                file,
                toks[idx].line,
                toks[idx].col,
                format!("token {what} not matched"),
            );
            return Err(ErrorCode::Syntax);
        }
        let at = at - 1;
        toks[idx].mate = at as u32;
        toks[at].mate = idx as u32;
    }
    Ok(())
}

/// Set partner indices and code levels. Unbalanced delimiters are a
/// syntax error naming the unmatched line/col.
pub fn match_tokens(toks: &mut [Token], file: &str, diags: &mut DiagSink) -> Result<(), ErrorCode> {
    for t in toks.iter_mut() {
        t.mate = NO_IDX;
    }

    match_pair(toks, TokenKind::BraceOpen, TokenKind::BraceClose, "{}", file, diags)?;
    match_pair(toks, TokenKind::ParenOpen, TokenKind::ParenClose, "()", file, diags)?;
    match_pair(toks, TokenKind::BracketOpen, TokenKind::BracketClose, "[]", file, diags)?;
    match_pair(toks, TokenKind::Query, TokenKind::Colon, "?:", file, diags)?;

    // Code levels: tokens at the file level are at 0, the braces
    // themselves count as inside.
    let mut level: u16 = 0;
    for idx in 0..toks.len() {
        if toks[idx].kind == TokenKind::BraceOpen {
            level += 1;
        }
        toks[idx].level = level;
        if toks[idx].kind == TokenKind::BraceClose {
            if level == 0 {
                diags.fatal(
                    "match_tokens",
                    ErrorCode::Syntax,
                    file,
                    toks[idx].line,
                    toks[idx].col,
                    "brace level mismatch",
                );
                return Err(ErrorCode::Syntax);
            }
            level -= 1;
        }
    }
    if level != 0 {
        diags.fatal("match_tokens", ErrorCode::Syntax, file, 0, 0, "brace level mismatch at end of file");
        return Err(ErrorCode::Syntax);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, "", 1, 1)
    }

    #[test]
    fn test_matches_nested_braces() {
        let mut toks = vec![
            tok(TokenKind::BraceOpen),
            tok(TokenKind::Word),
            tok(TokenKind::BraceOpen),
            tok(TokenKind::BraceClose),
            tok(TokenKind::BraceClose),
        ];
        let mut diags = DiagSink::new();
        match_tokens(&mut toks, "t.h", &mut diags).unwrap();
        assert_eq!(toks[0].mate, 4);
        assert_eq!(toks[4].mate, 0);
        assert_eq!(toks[2].mate, 3);
        assert_eq!(toks[3].mate, 2);
    }

    #[test]
    fn test_code_levels() {
        let mut toks = vec![
            tok(TokenKind::Word),
            tok(TokenKind::BraceOpen),
            tok(TokenKind::Word),
            tok(TokenKind::BraceClose),
            tok(TokenKind::Semicolon),
        ];
        let mut diags = DiagSink::new();
        match_tokens(&mut toks, "t.h", &mut diags).unwrap();
        assert_eq!(toks[0].level, 0);
        assert_eq!(toks[1].level, 1);
        assert_eq!(toks[2].level, 1);
        assert_eq!(toks[3].level, 1);
        assert_eq!(toks[4].level, 0);
    }

    #[test]
    fn test_unbalanced_brace_is_error() {
        let mut toks = vec![tok(TokenKind::BraceOpen), tok(TokenKind::Word)];
        let mut diags = DiagSink::new();
        assert_eq!(match_tokens(&mut toks, "t.h", &mut diags), Err(ErrorCode::Syntax));
        assert!(diags.has_errors());
    }

    #[test]
    fn test_query_colon_partnering() {
        let mut toks = vec![
            tok(TokenKind::Word),
            tok(TokenKind::Query),
            tok(TokenKind::Word),
            tok(TokenKind::Colon),
            tok(TokenKind::Word),
        ];
        let mut diags = DiagSink::new();
        match_tokens(&mut toks, "t.h", &mut diags).unwrap();
        assert_eq!(toks[1].mate, 3);
        assert_eq!(toks[3].mate, 1);
    }
}
