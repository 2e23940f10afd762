//! Expression assessment.
//!
//! `assess_expr` parses operand-operator-operand chains with C++
//! precedence, producing a result typlex and, when every operand is a
//! compile-time constant, a value. Function calls resolve against a
//! function group by scoring each candidate's formal-actual pairs.

use smol_str::SmolStr;

use crate::diag::ErrorCode;
use crate::semantic::{
    Atom, Basis, EntityData, EntityId, EntityKind, LookupCtx, Model, TyAttr, Typlex,
    lookup_member, lookup_token,
};
use crate::token::TokenKind;

use super::Parser;

/// Binding strength of a binary operator, None for non-binary tokens
fn prec(k: TokenKind) -> Option<u32> {
    use TokenKind::*;
    Some(match k {
        CondOr => 1,
        CondAnd => 2,
        BitOr => 3,
        BitXor => 4,
        BitAnd => 5,
        TestEq | NotEq => 6,
        Less | LessEq | More | MoreEq => 7,
        Lshift | Rshift => 8,
        Plus | Minus => 9,
        Mult | Div | Rem => 10,
        _ => return None,
    })
}

/// Score a supplied typlex against an expected argument typlex:
/// exact match 5, class with a cast operator returning the expected
/// type 4, acceptable implicit conversion 1, otherwise 0.
pub fn match_arg(model: &Model, expected: &Typlex, supplied: &Typlex) -> u32 {
    if expected.base == supplied.base && expected.indir == supplied.indir {
        return 5;
    }

    if expected.basis(model) != Basis::Class && supplied.basis(model) == Basis::Class {
        if let Some(base) = supplied.base {
            if let EntityData::Class(c) = &model.entity(base).data {
                for &op in &c.ops {
                    let Some(f) = model.entity(op).as_func() else { continue };
                    if !f.args.is_empty() {
                        continue;
                    }
                    if f.tpx.base == expected.base && f.tpx.indir == expected.indir {
                        return 4;
                    }
                }
            }
        }
    }

    if expected.test_set(model, supplied).is_ok() {
        return 1;
    }
    0
}

impl Parser<'_> {
    /// Assess the expression in `[start, limit)`. Returns its result
    /// typlex, its constant value where statically derivable, and the
    /// index one past the last token consumed.
    pub fn assess_expr(
        &mut self,
        ctx: &LookupCtx,
        start: usize,
        limit: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        self.parse_binary(ctx, 0, start, limit, level)
    }

    fn parse_binary(
        &mut self,
        ctx: &LookupCtx,
        min_prec: u32,
        at: usize,
        limit: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        let (mut ltpx, mut lval, mut at) = self.parse_operand(ctx, at, limit, level)?;

        loop {
            if at >= limit {
                break;
            }
            let k = self.kind(at);

            if k == TokenKind::Query {
                // (cond) ? A : B — technically an if/else in expression
                // position; the result typlex is the then-arm's
                let colon = self.mate(at).ok_or(ErrorCode::Corrupt)?;
                let (ttpx, tval, _) = self.assess_expr(ctx, at + 1, colon, level)?;
                let (_etpx, eval_, end) = self.assess_expr(ctx, colon + 1, limit, level)?;
                let val = match lval.as_i64() {
                    Some(c) => {
                        if c != 0 {
                            tval
                        } else {
                            eval_
                        }
                    }
                    None => Atom::Null,
                };
                return Ok((ttpx, val, end));
            }

            if k.is_assign_op() {
                let (rtpx, rval, end) = self.parse_binary(ctx, 0, at + 1, limit, level)?;
                if ltpx.test_set(&self.prj.model, &rtpx).is_err() {
                    self.warning(
                        "assess_expr",
                        at,
                        format!(
                            "assignment of {} to {}",
                            rtpx.render(&self.prj.model),
                            ltpx.render(&self.prj.model)
                        ),
                    );
                }
                lval = if k == TokenKind::Assign { rval } else { Atom::Null };
                at = end;
                continue;
            }

            let Some(p) = prec(k) else { break };
            if p < min_prec {
                break;
            }

            let (rtpx, rval, end) = self.parse_binary(ctx, p + 1, at + 1, limit, level)?;
            let (t, v) = self.apply_operator(&ltpx, &lval, &rtpx, &rval, k);
            ltpx = t;
            lval = v;
            at = end;
        }

        Ok((ltpx, lval, at))
    }

    /// Result typlex and folded value of a binary operation.
    fn apply_operator(
        &self,
        ltpx: &Typlex,
        lval: &Atom,
        rtpx: &Typlex,
        rval: &Atom,
        op: TokenKind,
    ) -> (Typlex, Atom) {
        let model = &self.prj.model;

        if op.is_condition_op() {
            let v = match (lval.as_i64(), rval.as_i64()) {
                (Some(a), Some(b)) => {
                    let r = match op {
                        TokenKind::TestEq => a == b,
                        TokenKind::NotEq => a != b,
                        TokenKind::Less => a < b,
                        TokenKind::LessEq => a <= b,
                        TokenKind::More => a > b,
                        TokenKind::MoreEq => a >= b,
                        TokenKind::CondAnd => a != 0 && b != 0,
                        TokenKind::CondOr => a != 0 || b != 0,
                        _ => false,
                    };
                    Atom::Bool(r)
                }
                _ => Atom::Null,
            };
            return (Typlex::of(model.std.bool_), v);
        }

        // Pointer arithmetic keeps the pointer typlex
        let tpx = if ltpx.is_pointer() {
            ltpx.clone()
        } else if rtpx.is_pointer() {
            rtpx.clone()
        } else if ltpx.basis(model) == Basis::Double || rtpx.basis(model) == Basis::Double {
            Typlex::of(model.std.double_)
        } else {
            ltpx.clone()
        };

        let v = match (lval.as_i64(), rval.as_i64()) {
            (Some(a), Some(b)) => {
                let folded = match op {
                    TokenKind::Plus => Some(a.wrapping_add(b)),
                    TokenKind::Minus => Some(a.wrapping_sub(b)),
                    TokenKind::Mult => Some(a.wrapping_mul(b)),
                    TokenKind::Div if b != 0 => Some(a / b),
                    TokenKind::Rem if b != 0 => Some(a % b),
                    TokenKind::Lshift => Some(a.wrapping_shl(b as u32)),
                    TokenKind::Rshift => Some(a.wrapping_shr(b as u32)),
                    TokenKind::BitAnd => Some(a & b),
                    TokenKind::BitOr => Some(a | b),
                    TokenKind::BitXor => Some(a ^ b),
                    _ => None,
                };
                folded.map(Atom::Int).unwrap_or(Atom::Null)
            }
            _ => Atom::Null,
        };

        (tpx, v)
    }

    /// Parse one operand: unary prefixes, a primary, and postfix
    /// member selection, subscripting, calls, increments.
    fn parse_operand(
        &mut self,
        ctx: &LookupCtx,
        at: usize,
        limit: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        if at >= limit {
            self.prj.diags.context(format!(
                "assess_expr: {} line {}: expression missing an operand",
                self.fname,
                self.line(at.saturating_sub(1))
            ));
            return Err(ErrorCode::Syntax);
        }

        // Unary prefixes
        match self.kind(at) {
            TokenKind::Not => {
                let (_, v, end) = self.parse_operand(ctx, at + 1, limit, level)?;
                let folded = v.as_i64().map(|a| Atom::Bool(a == 0)).unwrap_or(Atom::Null);
                return Ok((Typlex::of(self.prj.model.std.bool_), folded, end));
            }
            TokenKind::Invert => {
                let (t, v, end) = self.parse_operand(ctx, at + 1, limit, level)?;
                let folded = v.as_i64().map(|a| Atom::Int(!a)).unwrap_or(Atom::Null);
                return Ok((t, folded, end));
            }
            TokenKind::Minus => {
                let (t, v, end) = self.parse_operand(ctx, at + 1, limit, level)?;
                let folded = v.as_i64().map(|a| Atom::Int(-a)).unwrap_or(Atom::Null);
                return Ok((t, folded, end));
            }
            TokenKind::Plus | TokenKind::Incr | TokenKind::Decr => {
                return self.parse_operand(ctx, at + 1, limit, level);
            }
            TokenKind::Mult => {
                // Dereference
                let (mut t, _, end) = self.parse_operand(ctx, at + 1, limit, level)?;
                if t.indir > 0 {
                    t.indir -= 1;
                }
                return Ok((t, Atom::Null, end));
            }
            TokenKind::BitAnd => {
                // Address-of
                let (mut t, _, end) = self.parse_operand(ctx, at + 1, limit, level)?;
                t.indir += 1;
                return Ok((t, Atom::Null, end));
            }
            _ => {}
        }

        let (tpx, val, end) = self.parse_primary(ctx, at, limit, level)?;
        self.parse_postfix(ctx, tpx, val, end, limit, level)
    }

    fn parse_primary(
        &mut self,
        ctx: &LookupCtx,
        at: usize,
        limit: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        let k = self.kind(at);

        if k.is_literal() {
            let tok = self.x[at].clone();
            let (tpx, atom) = self.literal_typlex(&tok);
            return Ok((tpx, atom, at + 1));
        }

        match k {
            TokenKind::ParenOpen => {
                let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
                // A parenthesized type is a cast
                let mark = self.prj.diags.depth();
                if let Ok((cast, tend)) = self.get_typlex(ctx, at + 1) {
                    if tend == close {
                        self.prj.diags.absorb(mark);
                        let (_, v, end) = self.parse_operand(ctx, close + 1, limit, level)?;
                        return Ok((cast, v, end));
                    }
                }
                self.prj.diags.absorb(mark);
                let (t, v, _) = self.assess_expr(ctx, at + 1, close, level)?;
                Ok((t, v, close + 1))
            }

            TokenKind::This => {
                let Some(host) = ctx.host else {
                    self.error("assess_expr", at, "'this' outside a class member");
                    return Err(ErrorCode::Syntax);
                };
                let mut t = Typlex::of(host);
                t.indir = 1;
                Ok((t, Atom::Null, at + 1))
            }

            TokenKind::Sizeof => {
                let open = at + 1;
                if self.kind(open) != TokenKind::ParenOpen {
                    self.error("assess_expr", open, "expected '(' after sizeof");
                    return Err(ErrorCode::Syntax);
                }
                let close = self.mate(open).ok_or(ErrorCode::Corrupt)?;
                Ok((Typlex::of(self.prj.model.std.uint), Atom::Null, close + 1))
            }

            TokenKind::New => {
                let (mut t, end) = self.get_typlex(ctx, at + 1)?;
                t.indir += 1;
                // Constructor arguments or array extent
                let end = match self.kind(end) {
                    TokenKind::ParenOpen => self.mate(end).ok_or(ErrorCode::Corrupt)? + 1,
                    TokenKind::BracketOpen => self.mate(end).ok_or(ErrorCode::Corrupt)? + 1,
                    _ => end,
                };
                Ok((t, Atom::Null, end))
            }

            TokenKind::DynCast => {
                if self.kind(at + 1) != TokenKind::Less {
                    self.error("assess_expr", at + 1, "expected '<' after dynamic_cast");
                    return Err(ErrorCode::Syntax);
                }
                let (t, tend) = self.get_typlex(ctx, at + 2)?;
                if self.kind(tend) != TokenKind::More
                    || self.kind(tend + 1) != TokenKind::ParenOpen
                {
                    self.error("assess_expr", tend, "malformed dynamic_cast");
                    return Err(ErrorCode::Syntax);
                }
                let close = self.mate(tend + 1).ok_or(ErrorCode::Corrupt)?;
                self.assess_expr(ctx, tend + 2, close, level)?;
                Ok((t, Atom::Null, close + 1))
            }

            TokenKind::Word | TokenKind::KwOperator => {
                let Some((ent, end)) = lookup_token(&self.prj.model, &self.x, ctx, at, true)
                else {
                    self.prj.diags.context(format!(
                        "assess_expr: {} line {} col {}: '{}' not found",
                        self.fname,
                        self.line(at),
                        self.col(at),
                        self.text(at)
                    ));
                    return Err(ErrorCode::NotFound);
                };
                self.entity_operand(ctx, ent, end, level)
            }

            _ => {
                self.prj.diags.context(format!(
                    "assess_expr: {} line {} col {}: unexpected {} in expression",
                    self.fname,
                    self.line(at),
                    self.col(at),
                    self.x.get(at).map(|t| t.show().to_string()).unwrap_or_default()
                ));
                Err(ErrorCode::Syntax)
            }
        }
    }

    /// Operand value of a resolved entity at `end` (one past its name).
    fn entity_operand(
        &mut self,
        ctx: &LookupCtx,
        ent: EntityId,
        end: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        match self.prj.model.entity(ent).kind() {
            EntityKind::Variable => {
                let EntityData::Variable(v) = &self.prj.model.entity(ent).data else {
                    unreachable!()
                };
                let mut t = v.tpx.clone();
                t.attrs.set(TyAttr::LVALUE);
                let val = v.value.clone();
                Ok((t, val, end))
            }
            EntityKind::EnumVal => {
                let EntityData::EnumVal(ev) = &self.prj.model.entity(ent).data else {
                    unreachable!()
                };
                Ok((Typlex::of(ev.parent), Atom::Int(ev.num), end))
            }
            EntityKind::Literal => {
                let EntityData::Literal(l) = &self.prj.model.entity(ent).data else {
                    unreachable!()
                };
                let base = match l.basis {
                    Basis::Double => self.prj.model.std.double_,
                    Basis::Bool => self.prj.model.std.bool_,
                    Basis::String => self.prj.model.std.char_,
                    _ => self.prj.model.std.int_,
                };
                Ok((Typlex::of(base), l.value.clone(), end))
            }
            EntityKind::FuncGroup => {
                if self.kind(end) == TokenKind::ParenOpen {
                    let (winner, after) = self.proc_func_call(ent, ctx, end, level)?;
                    let t = winner
                        .and_then(|f| self.prj.model.entity(f).as_func().map(|f| f.tpx.clone()))
                        .unwrap_or_default();
                    Ok((t, Atom::Null, after))
                } else {
                    // Function address
                    let mut t = Typlex::default();
                    t.attrs.set(TyAttr::FNPTR);
                    Ok((t, Atom::Null, end))
                }
            }
            EntityKind::Class => {
                // Constructor-style temporary: Class(args)
                let end = if self.kind(end) == TokenKind::ParenOpen {
                    self.mate(end).ok_or(ErrorCode::Corrupt)? + 1
                } else {
                    end
                };
                Ok((Typlex::of(ent), Atom::Null, end))
            }
            EntityKind::Function => {
                let f = self.prj.model.entity(ent).as_func().unwrap();
                let t = f.tpx.clone();
                let end = if self.kind(end) == TokenKind::ParenOpen {
                    self.mate(end).ok_or(ErrorCode::Corrupt)? + 1
                } else {
                    end
                };
                Ok((t, Atom::Null, end))
            }
            other => {
                self.prj.diags.context(format!(
                    "assess_expr: {} cannot be evaluated (a {})",
                    self.prj.model.entity(ent).base.name,
                    other.as_str()
                ));
                Err(ErrorCode::Type)
            }
        }
    }

    fn parse_postfix(
        &mut self,
        ctx: &LookupCtx,
        mut tpx: Typlex,
        mut val: Atom,
        mut at: usize,
        limit: usize,
        level: u32,
    ) -> Result<(Typlex, Atom, usize), ErrorCode> {
        loop {
            if at >= limit {
                break;
            }
            match self.kind(at) {
                TokenKind::Period | TokenKind::Arrow => {
                    let Some(host) = tpx.base else {
                        self.error("assess_expr", at, "member selection on unknown type");
                        return Err(ErrorCode::Type);
                    };
                    let mname = SmolStr::new(self.text(at + 1));
                    let Some(member) = lookup_member(&self.prj.model, host, &mname) else {
                        self.prj.diags.context(format!(
                            "assess_expr: {} line {}: no member '{}' in {}",
                            self.fname,
                            self.line(at + 1),
                            mname,
                            self.prj.model.entity(host).base.name
                        ));
                        return Err(ErrorCode::NotFound);
                    };
                    let (t, v, end) = self.entity_operand(ctx, member, at + 2, level)?;
                    tpx = t;
                    val = v;
                    at = end;
                }
                TokenKind::BracketOpen => {
                    let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
                    if close > at + 1 {
                        self.assess_expr(ctx, at + 1, close, level)?;
                    }
                    if tpx.indir > 0 {
                        tpx.indir -= 1;
                    }
                    tpx.elements = 1;
                    val = Atom::Null;
                    at = close + 1;
                }
                TokenKind::Incr | TokenKind::Decr => {
                    val = Atom::Null;
                    at += 1;
                }
                _ => break,
            }
        }
        Ok((tpx, val, at))
    }

    /// Resolve a function call against a group. `at` sits on the
    /// opening `(` of the actual arguments. Every actual is assessed
    /// to a typlex; candidates are rejected on argument count, scored
    /// per argument, and the highest-rated candidate wins. Ties are
    /// reported.
    pub fn proc_func_call(
        &mut self,
        group: EntityId,
        ctx: &LookupCtx,
        at: usize,
        level: u32,
    ) -> Result<(Option<EntityId>, usize), ErrorCode> {
        if self.kind(at) != TokenKind::ParenOpen {
            self.error("proc_func_call", at, "expected to be at start of argument block");
            return Err(ErrorCode::Syntax);
        }
        let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;

        // Assess the supplied arguments. An argument expression may
        // itself contain calls, so commas only count at this depth.
        let mut supplied: Vec<Typlex> = Vec::new();
        let mut ct = at + 1;
        while ct < close {
            let mut xt = ct;
            let mut nest = 0u32;
            while xt < close {
                match self.kind(xt) {
                    TokenKind::ParenOpen => nest += 1,
                    TokenKind::ParenClose => nest -= 1,
                    TokenKind::Comma if nest == 0 => break,
                    _ => {}
                }
                xt += 1;
            }
            let (tpx, _, _) = self.assess_expr(ctx, ct, xt, level)?;
            if tpx.is_null() {
                let gname = self.prj.model.entity(group).base.name.clone();
                self.prj.diags.context(format!(
                    "proc_func_call: {} line {}: argument of {} fails to evaluate",
                    self.fname,
                    self.line(ct),
                    gname
                ));
                return Err(ErrorCode::Type);
            }
            supplied.push(tpx);
            ct = xt + 1;
        }

        let funcs: Vec<EntityId> = match &self.prj.model.entity(group).data {
            EntityData::FuncGroup(g) => g.funcs.clone(),
            _ => return Err(ErrorCode::Argument),
        };

        // A group of one is not tested
        if funcs.len() == 1 {
            return Ok((Some(funcs[0]), close + 1));
        }

        let mut found: Vec<(EntityId, u32)> = Vec::new();
        for &fe in &funcs {
            let Some(f) = self.prj.model.entity(fe).as_func() else { continue };
            if supplied.len() < f.min_args as usize {
                continue;
            }
            if !f.variadic && supplied.len() > f.args.len() {
                continue;
            }

            let mut rating = 0u32;
            let mut ok = true;
            for (n, &arg) in f.args.iter().enumerate() {
                if n >= supplied.len() {
                    // Remaining formals must carry defaults
                    let has_default = matches!(
                        &self.prj.model.entity(arg).data,
                        EntityData::Variable(v) if !v.value.is_null()
                    );
                    if !has_default {
                        ok = false;
                    }
                    break;
                }
                let EntityData::Variable(v) = &self.prj.model.entity(arg).data else {
                    continue;
                };
                let score = match_arg(&self.prj.model, &v.tpx, &supplied[n]);
                if score == 0 {
                    ok = false;
                    break;
                }
                rating += score;
            }
            if ok {
                found.push((fe, rating));
            }
        }

        if found.is_empty() {
            let gname = self.prj.model.entity(group).base.name.clone();
            self.prj.diags.context(format!(
                "proc_func_call: {} line {}: call of {} has no viable candidate",
                self.fname,
                self.line(at),
                gname
            ));
            return Ok((None, close + 1));
        }

        let best = found.iter().map(|&(_, r)| r).max().unwrap_or(0);
        let winners: Vec<EntityId> = found
            .iter()
            .filter(|&&(_, r)| r == best)
            .map(|&(f, _)| f)
            .collect();
        if winners.len() > 1 {
            let names: Vec<String> = winners
                .iter()
                .map(|&f| {
                    self.prj
                        .model
                        .entity(f)
                        .as_func()
                        .map(|fd| fd.ext_name.to_string())
                        .unwrap_or_default()
                })
                .collect();
            self.warning(
                "proc_func_call",
                at,
                format!("ambiguous call, candidates rated equally: {}", names.join(", ")),
            );
        }

        Ok((Some(winners[0]), close + 1))
    }
}
