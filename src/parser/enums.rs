//! Enum definitions and the arithmetic value evaluator.

use smol_str::SmolStr;

use crate::diag::ErrorCode;
use crate::semantic::{
    Access, Attrs, EntityBase, EntityData, EntityId, EntityKind, EnumData, EnumValData,
    LookupCtx, ScopeId, Stmt, StmtKind, lookup_token,
};
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    /// Evaluate a constant integer expression: parenthesized terms,
    /// unary minus and complement, numbers, enum-value references, and
    /// the binary operators `+ - * / % << >> ^ & |`. Returns the value
    /// and the index of the terminator (`,`, `}`, `]`, `)` or `;`).
    pub fn eval_num(&mut self, ctx: &LookupCtx, start: usize) -> Result<(i64, usize), ErrorCode> {
        let mut at = start;

        // First term
        let mut value: i64;
        if self.kind(at) == TokenKind::ParenOpen {
            let (v, end) = self.eval_num(ctx, at + 1)?;
            value = v;
            if self.kind(end) != TokenKind::ParenClose {
                self.error("eval_num", end, "expected ')' in value expression");
                return Err(ErrorCode::Format);
            }
            at = end + 1;
        } else {
            let mut minus = false;
            let mut invert = false;
            if self.kind(at) == TokenKind::Minus {
                minus = true;
                at += 1;
            }
            if self.kind(at) == TokenKind::Invert {
                invert = true;
                at += 1;
            }

            value = match self.kind(at) {
                TokenKind::Integer => self.text(at).parse::<i64>().unwrap_or(0),
                TokenKind::Hex => {
                    let t = self.text(at).trim_start_matches("0x").trim_start_matches("0X");
                    i64::from_str_radix(t, 16).unwrap_or(0)
                }
                TokenKind::Octal => i64::from_str_radix(&self.text(at)[1..], 8).unwrap_or(0),
                TokenKind::CharLit => self.text(at).chars().next().unwrap_or('\0') as i64,
                TokenKind::Word => {
                    // A name that equates to a number: an enum value or
                    // a named literal
                    let Some((ent, end)) =
                        lookup_token(&self.prj.model, &self.x, ctx, at, false)
                    else {
                        self.error("eval_num", at, "expected a numeric value");
                        return Err(ErrorCode::Format);
                    };
                    at = end - 1;
                    match &self.prj.model.entity(ent).data {
                        EntityData::EnumVal(ev) => ev.num,
                        EntityData::Literal(l) => l.value.as_i64().unwrap_or(0),
                        _ => {
                            self.error(
                                "eval_num",
                                at,
                                format!("'{}' is not an enum value", self.text(at)),
                            );
                            return Err(ErrorCode::Format);
                        }
                    }
                }
                _ => {
                    self.error("eval_num", at, "expected a numeric value");
                    return Err(ErrorCode::Format);
                }
            };
            at += 1;

            if minus {
                value = -value;
            }
            if invert {
                value = !value;
            }
        }

        // Terminator, or an operator followed by another expression
        match self.kind(at) {
            TokenKind::ParenClose
            | TokenKind::BracketClose
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::BraceClose
            | TokenKind::Unknown => return Ok((value, at)),
            _ => {}
        }

        let op = self.kind(at);
        let (rhs, end) = self.eval_num(ctx, at + 1)?;
        let value = match op {
            TokenKind::Plus => value.wrapping_add(rhs),
            TokenKind::Minus => value.wrapping_sub(rhs),
            TokenKind::Mult => value.wrapping_mul(rhs),
            TokenKind::Div => {
                if rhs == 0 {
                    self.error("eval_num", at, "division by zero in value expression");
                    return Err(ErrorCode::Format);
                }
                value / rhs
            }
            TokenKind::Rem => {
                if rhs == 0 {
                    self.error("eval_num", at, "division by zero in value expression");
                    return Err(ErrorCode::Format);
                }
                value % rhs
            }
            TokenKind::Lshift => value.wrapping_shl(rhs as u32),
            TokenKind::Rshift => value.wrapping_shr(rhs as u32),
            TokenKind::BitXor => value ^ rhs,
            TokenKind::BitAnd => value & rhs,
            TokenKind::BitOr => value | rhs,
            _ => {
                self.error("eval_num", at, "no such operation allowed in value expression");
                return Err(ErrorCode::Format);
            }
        };
        Ok((value, end))
    }

    /// Process an enum statement. Three forms:
    /// a definition `enum E { … } ;`, a forward declaration
    /// `enum E ;`, or a typlex where the `enum` is superfluous
    /// (`enum E word`) — the latter returns `None` so the caller
    /// re-reads from the name as a declaration.
    pub fn proc_enum(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        start: usize,
    ) -> Result<Option<usize>, ErrorCode> {
        debug_assert_eq!(self.kind(start), TokenKind::Enum);
        let mut stmt = Stmt::new(StmtKind::EnumDef, self.line(start), start as u32, self.x[start].level as u32);
        let mut at = start + 1;

        if self.kind(at) != TokenKind::Word {
            self.error("proc_enum", at, "'enum' must be followed by a name");
            return Err(ErrorCode::Format);
        }
        let name = SmolStr::new(self.text(at));
        stmt.object = name.clone();

        let ctx = self.ctx(host, None);
        let existing = lookup_token(&self.prj.model, &self.x, &ctx, at, false).map(|(id, _)| id);
        if let Some(id) = existing {
            if self.prj.model.entity(id).kind() != EntityKind::Enum {
                self.error(
                    "proc_enum",
                    at,
                    format!(
                        "cannot use {} as enum name, already defined as a {}",
                        name,
                        self.prj.model.entity(id).kind().as_str()
                    ),
                );
                return Err(ErrorCode::Duplicate);
            }
        }
        at += 1;

        // Superfluous `enum` ahead of a typlex
        if self.kind(at) == TokenKind::Word {
            return Ok(None);
        }

        // Forward declaration
        if self.kind(at) == TokenKind::Semicolon {
            if existing.is_none() {
                self.make_enum(host, scope, access, &name, (start as u32, at as u32))?;
            }
            stmt.kind = StmtKind::EnumDecl;
            stmt.end = at as u32;
            self.stmts.push(stmt);
            return Ok(Some(at + 1));
        }

        if self.kind(at) != TokenKind::BraceOpen {
            self.error("proc_enum", at, "expected the opening of an enum definition body");
            return Err(ErrorCode::Format);
        }
        let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;

        let enum_id = match existing {
            Some(id) => id,
            None => self.make_enum(host, scope, access, &name, (start as u32, close as u32))?,
        };
        if let EntityData::Enum(e) = &mut self.prj.model.entity_mut(enum_id).data {
            e.def_file = Some(self.fid);
            e.def_span = (start as u32, close as u32);
        }

        // Leading comment directly after the '{'
        match self.com_post(at) {
            Some(raw) => {
                let text = self.consume_comment(raw);
                crate::comments::proc_comment_enum(self, enum_id, &text);
            }
            None => {
                if !self.prj.model.system_mask {
                    self.warning(
                        "proc_enum",
                        at,
                        format!("expected a leading comment for enum {name}"),
                    );
                }
            }
        }

        // Values: `name [= expr]` separated by commas
        at += 1;
        let mut seq: i64 = 0;
        while at < close {
            if self.kind(at) == TokenKind::Comment {
                at += 1;
                continue;
            }
            if self.kind(at) != TokenKind::Word {
                self.error("proc_enum", at, "expected an enum value name");
                return Err(ErrorCode::Format);
            }
            let vname = SmolStr::new(self.text(at));
            let vtok = at;
            at += 1;

            let num = if self.kind(at) == TokenKind::Assign {
                let (v, end) = self.eval_num(&self.ctx(host, None), at + 1)?;
                at = end;
                seq = v;
                v
            } else {
                seq
            };
            seq += 1;

            self.add_enum_value(enum_id, scope, access, &vname, num, vtok)?;

            match self.kind(at) {
                TokenKind::Comma => at += 1,
                TokenKind::BraceClose => break,
                TokenKind::Comment => at += 1,
                _ => {
                    self.error("proc_enum", at, "expected ',' or '}' after enum value");
                    return Err(ErrorCode::Format);
                }
            }
        }

        let mut at = close + 1;
        if self.kind(at) == TokenKind::Semicolon {
            at += 1;
        } else {
            self.warning("proc_enum", at, "expected ';' after enum definition");
        }

        stmt.end = (at - 1) as u32;
        self.stmts.push(stmt);
        Ok(Some(at))
    }

    fn make_enum(
        &mut self,
        _host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        name: &SmolStr,
        span: (u32, u32),
    ) -> Result<EntityId, ErrorCode> {
        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, name),
            access,
            comp: self.prj.file(self.fid).comp,
            attrs: Attrs::NONE,
            ..Default::default()
        };
        let data = EntityData::Enum(EnumData {
            def_file: Some(self.fid),
            def_span: span,
            ..Default::default()
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_enum");
        self.prj.diags = diags;
        r.map_err(|e| {
            self.prj.diags.surface("proc_enum", &self.fname.clone());
            e
        })
    }

    fn add_enum_value(
        &mut self,
        enum_id: EntityId,
        scope: ScopeId,
        access: Access,
        name: &SmolStr,
        num: i64,
        at: usize,
    ) -> Result<(), ErrorCode> {
        // Within any enum no two values may share a number once
        // explicit assignments are applied
        if let EntityData::Enum(e) = &self.prj.model.entity(enum_id).data {
            if let Some(&other) = e.by_num.get(&num) {
                let other_name = self.prj.model.entity(other).base.name.clone();
                self.warning(
                    "proc_enum",
                    at,
                    format!("enum value {name} duplicates the number {num} of {other_name}"),
                );
            }
        }

        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, name),
            access,
            comp: self.prj.file(self.fid).comp,
            ..Default::default()
        };
        let data = EntityData::EnumVal(EnumValData {
            parent: enum_id,
            num,
            text: name.clone(),
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_enum");
        self.prj.diags = diags;
        let id = match r {
            Ok(id) => id,
            Err(e) => {
                self.prj.diags.surface("proc_enum", &self.fname.clone());
                return Err(e);
            }
        };

        if let EntityData::Enum(e) = &mut self.prj.model.entity_mut(enum_id).data {
            e.by_name.insert(name.clone(), id);
            e.by_num.entry(num).or_insert(id);
        }
        Ok(())
    }
}
