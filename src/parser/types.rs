//! Typlex establishment: reading a fully qualified type expression at
//! a token position.

use crate::diag::ErrorCode;
use crate::semantic::{Atom, Basis, EntityId, LookupCtx, TyAttr, Typlex, lookup_token};
use crate::token::{Token, TokenKind};

use super::Parser;

impl Parser<'_> {
    /// Read a type expression: optional `const`/`static`/`unsigned`, a
    /// base type (primitive keyword, class name, template argument or
    /// typedef name), an optional template-argument list, `*` series
    /// for indirection and `&` for reference. Returns the typlex and
    /// the index one past it.
    pub fn get_typlex(
        &mut self,
        ctx: &LookupCtx,
        start: usize,
    ) -> Result<(Typlex, usize), ErrorCode> {
        let mut tpx = Typlex {
            elements: 1,
            ..Default::default()
        };
        let mut at = start;

        loop {
            match self.kind(at) {
                TokenKind::Const => {
                    tpx.attrs.set(TyAttr::CONST);
                    at += 1;
                }
                TokenKind::KwStatic => {
                    tpx.attrs.set(TyAttr::STATIC);
                    at += 1;
                }
                // Superfluous elaboration: `enum Color c`, `struct S s`
                TokenKind::Enum | TokenKind::Struct | TokenKind::Class | TokenKind::Union
                    if self.kind(at + 1) == TokenKind::Word =>
                {
                    at += 1;
                }
                _ => break,
            }
        }

        let Some((base, mut end)) = lookup_token(&self.prj.model, &self.x, ctx, at, true) else {
            self.prj.diags.context(format!(
                "get_typlex: {} line {} col {}: no such type as '{}'",
                self.fname,
                self.line(at),
                self.col(at),
                self.text(at)
            ));
            return Err(ErrorCode::NotFound);
        };

        if !self.prj.model.entity(base).is_type() {
            self.prj.diags.context(format!(
                "get_typlex: {} line {} col {}: '{}' is a {}, not a type",
                self.fname,
                self.line(at),
                self.col(at),
                self.text(at),
                self.prj.model.entity(base).kind().as_str()
            ));
            return Err(ErrorCode::Syntax);
        }

        tpx.base = Some(base);
        match self.prj.model.basis_of(base) {
            Basis::TmplArg => tpx.attrs.set(TyAttr::TMPLARG),
            _ => {}
        }
        if self.prj.model.entity(base).base.attrs.has(crate::semantic::Attrs::TEMPLATE) {
            tpx.attrs.set(TyAttr::TEMPLATE);
            // Template argument list
            if self.kind(end) == TokenKind::Less {
                end = self.read_template_args(ctx, end, &mut tpx.args)?;
            }
        }

        loop {
            match self.kind(end) {
                TokenKind::Mult => {
                    tpx.indir += 1;
                    end += 1;
                }
                TokenKind::Indirect => {
                    tpx.indir += self.text(end).len() as i16;
                    end += 1;
                }
                TokenKind::BitAnd => {
                    tpx.attrs.set(TyAttr::REFERENCE);
                    if tpx.indir == 0 {
                        tpx.indir = -1;
                    }
                    end += 1;
                }
                _ => break,
            }
        }

        Ok((tpx, end))
    }

    /// Read `<tpx, tpx, …>` after a template class name. `at` sits on
    /// the `<`; returns the index one past the `>`.
    fn read_template_args(
        &mut self,
        ctx: &LookupCtx,
        at: usize,
        args: &mut Vec<Typlex>,
    ) -> Result<usize, ErrorCode> {
        let mut at = at + 1;
        loop {
            let (arg, end) = self.get_typlex(ctx, at)?;
            args.push(arg);
            match self.kind(end) {
                TokenKind::Comma => at = end + 1,
                TokenKind::More => return Ok(end + 1),
                _ => {
                    self.error(
                        "get_typlex",
                        end,
                        format!("expected ',' or '>' in template argument list, found {}", self.text(end)),
                    );
                    return Err(ErrorCode::Syntax);
                }
            }
        }
    }

    /// Read an array extent `[N]` at `at` (the `[`). An empty `[]`
    /// yields no extent. `N` is evaluated by the value expression
    /// evaluator when it is not a plain literal.
    pub fn get_array_extent(
        &mut self,
        ctx: &LookupCtx,
        at: usize,
    ) -> Result<(Option<u32>, usize), ErrorCode> {
        debug_assert_eq!(self.kind(at), TokenKind::BracketOpen);
        let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
        if close == at + 1 {
            return Ok((None, close + 1));
        }
        let (v, end) = self.eval_num(ctx, at + 1)?;
        if end != close {
            self.error("get_array_extent", end, "malformed array extent");
            return Err(ErrorCode::Syntax);
        }
        Ok((Some(v.max(0) as u32), close + 1))
    }

    /// Typlex and value of a literal token.
    pub fn literal_typlex(&self, tok: &Token) -> (Typlex, Atom) {
        let std = &self.prj.model.std;
        let (base, atom) = match tok.kind {
            TokenKind::Integer => {
                let v = tok.text.parse::<i64>().unwrap_or(0);
                (std.int_, Atom::Int(v))
            }
            TokenKind::Hex => {
                let t = tok.text.trim_start_matches("0x").trim_start_matches("0X");
                (std.uint, Atom::Int(i64::from_str_radix(t, 16).unwrap_or(0)))
            }
            TokenKind::Octal => {
                (std.uint, Atom::Int(i64::from_str_radix(&tok.text[1..], 8).unwrap_or(0)))
            }
            TokenKind::StdForm => (std.double_, Atom::Double(tok.text.parse().unwrap_or(0.0))),
            TokenKind::Boolean => (std.bool_, Atom::Bool(tok.text == "true")),
            TokenKind::CharLit => (
                std.char_,
                Atom::Char(tok.text.chars().next().unwrap_or('\0')),
            ),
            TokenKind::StrLit => (std.char_, Atom::Str(tok.text.clone().into())),
            _ => (std.int_, Atom::Null),
        };
        let mut tpx = Typlex::of(base);
        tpx.attrs.set(TyAttr::LITERAL);
        if tok.kind == TokenKind::StrLit {
            tpx.indir = 1;
            tpx.attrs.set(TyAttr::CONST);
        }
        if atom.is_zero() {
            tpx.attrs.set(TyAttr::ZERO);
        }
        (tpx, atom)
    }

    /// Does a typlex start at `at`? A cheap probe used to separate
    /// declarations from expression statements in code bodies.
    pub fn at_type(&self, ctx: &LookupCtx, at: usize) -> bool {
        let mut at = at;
        loop {
            match self.kind(at) {
                TokenKind::Const | TokenKind::KwStatic => at += 1,
                TokenKind::Enum | TokenKind::Struct | TokenKind::Class | TokenKind::Union
                    if self.kind(at + 1) == TokenKind::Word =>
                {
                    at += 1;
                }
                _ => break,
            }
        }
        if self.kind(at).is_vtype() {
            return true;
        }
        if self.kind(at) != TokenKind::Word {
            return false;
        }
        match lookup_token(&self.prj.model, &self.x, ctx, at, true) {
            Some((id, _)) => self.prj.model.entity(id).is_type(),
            None => false,
        }
    }

    /// Resolve a class (possibly `ns::Class` or `Outer::Inner`) at
    /// `at`, for out-of-class member definitions. Returns the class
    /// and the index one past the series.
    pub fn get_class(&self, at: usize) -> Option<(EntityId, usize)> {
        let ctx = LookupCtx::default();
        let (id, end) = lookup_token(&self.prj.model, &self.x, &ctx, at, true)?;
        match self.prj.model.entity(id).kind() {
            crate::semantic::EntityKind::Class | crate::semantic::EntityKind::Union => {
                Some((id, end))
            }
            _ => None,
        }
    }
}
