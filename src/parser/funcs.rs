//! Function declarations and definitions.
//!
//! Functions are keyed by their extended name, the base name combined
//! with the argument typlexes, so overloads coexist in one scope. All
//! functions sharing a base name belong to a function group, created on
//! first sight of the name.

use smol_str::SmolStr;

use crate::diag::ErrorCode;
use crate::project::{DeferredBody, Project};
use crate::semantic::{
    Access, Atom, Attrs, EntityBase, EntityData, EntityId, EntityKind, FuncData, GroupData,
    LookupCtx, ScopeId, Typlex, VarData, lookup_token,
};
use crate::token::TokenKind;

use super::Parser;

/// Outcome of parsing an argument block
#[derive(Debug, Default)]
pub struct FuncArgs {
    pub args: Vec<EntityId>,
    /// Comma-joined argument typlex renderings
    pub mangled: String,
    pub min_args: u16,
    pub variadic: bool,
    /// One past the closing `)`
    pub end: usize,
}

impl Parser<'_> {
    /// Parse the argument block of a function declaration. `at` sits on
    /// the opening `(`. Each argument is a typlex, an optional name,
    /// an optional array extent and an optional default value; a
    /// trailing `...` sets the variadic flag; `void` as the sole
    /// argument yields an empty list.
    pub fn proc_func_args(
        &mut self,
        ctx: &LookupCtx,
        at: usize,
    ) -> Result<FuncArgs, ErrorCode> {
        debug_assert_eq!(self.kind(at), TokenKind::ParenOpen);
        let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
        let mut out = FuncArgs {
            end: close + 1,
            ..Default::default()
        };

        if close == at + 1 || (self.kind(at + 1) == TokenKind::Void && close == at + 2) {
            return Ok(out);
        }

        let mut defaults = 0u16;
        let mut ct = at + 1;
        while ct < close {
            if self.kind(ct) == TokenKind::Ellipsis {
                out.variadic = true;
                ct += 1;
                if ct != close {
                    self.error("proc_func_args", ct, "'...' must end the argument list");
                    return Err(ErrorCode::Syntax);
                }
                break;
            }

            let (mut tpx, mut end) = self.get_typlex(ctx, ct)?;

            let mut name = SmolStr::default();
            if self.kind(end) == TokenKind::Word {
                name = SmolStr::new(self.text(end));
                end += 1;
            }
            if self.kind(end) == TokenKind::BracketOpen {
                let (extent, after) = self.get_array_extent(ctx, end)?;
                tpx.elements = extent.unwrap_or(0);
                if tpx.indir == 0 {
                    tpx.indir = 1;
                }
                end = after;
            }

            let mut value = Atom::Null;
            let mut has_default = false;
            if self.kind(end) == TokenKind::Assign {
                has_default = true;
                end += 1;
                let tok = self.x.get(end).cloned();
                if let Some(tok) = tok {
                    if tok.kind.is_literal() {
                        let (_, atom) = self.literal_typlex(&tok);
                        value = atom;
                        end += 1;
                    } else {
                        // Named default: an enum value or constant
                        if let Some((ent, after)) =
                            lookup_token(&self.prj.model, &self.x, ctx, end, true)
                        {
                            value = match &self.prj.model.entity(ent).data {
                                EntityData::EnumVal(ev) => Atom::Int(ev.num),
                                EntityData::Literal(l) => l.value.clone(),
                                EntityData::Variable(v) => v.value.clone(),
                                _ => Atom::Null,
                            };
                            end = after;
                        } else {
                            // Unresolvable default: skip to , or )
                            while end < close && self.kind(end) != TokenKind::Comma {
                                end += 1;
                            }
                        }
                    }
                }
            }
            if has_default {
                defaults += 1;
            } else if defaults > 0 {
                self.warning(
                    "proc_func_args",
                    end,
                    "argument without default follows argument with default",
                );
            }

            if !out.mangled.is_empty() {
                out.mangled.push(',');
            }
            out.mangled.push_str(&tpx.render(&self.prj.model));

            let var = self.prj.model.alloc_entity(
                EntityBase {
                    fqname: name.clone(),
                    name,
                    access: Access::FuncLocal,
                    comp: self.prj.file(self.fid).comp,
                    ..Default::default()
                },
                EntityData::Variable(VarData {
                    tpx,
                    parent: ctx.host,
                    decl_file: Some(self.fid),
                    value,
                }),
            );
            out.args.push(var);

            match self.kind(end) {
                TokenKind::Comma => ct = end + 1,
                TokenKind::ParenClose if end == close => break,
                _ => {
                    self.error(
                        "proc_func_args",
                        end,
                        format!("expected ',' or ')' in argument list, found {}", self.text(end)),
                    );
                    return Err(ErrorCode::Syntax);
                }
            }
        }

        out.min_args = out.args.len() as u16 - defaults;
        Ok(out)
    }

    /// Find or create the function group named `name` in `scope`.
    pub fn func_group(&mut self, scope: ScopeId, name: &str) -> Result<EntityId, ErrorCode> {
        if let Some(id) = self.prj.model.scope(scope).get(name) {
            return match self.prj.model.entity(id).kind() {
                EntityKind::FuncGroup => Ok(id),
                other => {
                    self.prj.diags.context(format!(
                        "func_group: {name} already exists as {}",
                        other.as_str()
                    ));
                    Err(ErrorCode::Conflict)
                }
            };
        }
        let base = EntityBase {
            name: SmolStr::new(name),
            fqname: SmolStr::new(name),
            access: Access::Unknown,
            comp: self.prj.file(self.fid).comp,
            ..Default::default()
        };
        let data = EntityData::FuncGroup(GroupData {
            title: SmolStr::new(name),
            ..Default::default()
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "func_group");
        self.prj.diags = diags;
        r
    }

    /// Process a function declaration or definition. `at` sits on the
    /// opening `(` of the argument block. Returns the function and the
    /// index one past the statement.
    ///
    /// A body at file scope parses immediately; a body inside a class
    /// definition is recorded with its token span and deferred until
    /// the class completes.
    #[allow(clippy::too_many_arguments)]
    pub fn proc_func_def(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        ret: Typlex,
        name: &str,
        mut attrs: Attrs,
        access: Access,
        at: usize,
        in_class: bool,
    ) -> Result<(EntityId, usize), ErrorCode> {
        let ctx = self.ctx(host, None);
        let args = self.proc_func_args(&ctx, at)?;
        let ext_name = SmolStr::new(format!("{name}({})", args.mangled));
        let mut end = args.end;

        if self.kind(end) == TokenKind::Const {
            attrs.set(Attrs::CONST_MEMBER);
            end += 1;
        }

        let mut is_def = false;
        let mut body_start = 0usize;

        // `= 0 ;` declares pure virtual
        if self.kind(end) == TokenKind::Assign
            && self.kind(end + 1) == TokenKind::Integer
            && self.text(end + 1) == "0"
        {
            attrs.set(Attrs::PURE_VIRTUAL | Attrs::VIRTUAL);
            end += 2;
        }

        // Constructor initializer list runs to the body
        if attrs.has(Attrs::CONSTRUCTOR) && self.kind(end) == TokenKind::Colon {
            while end < self.x.len() && self.kind(end) != TokenKind::BraceOpen {
                end += 1;
            }
        }

        match self.kind(end) {
            TokenKind::Semicolon => {
                end += 1;
            }
            TokenKind::BraceOpen => {
                is_def = true;
                body_start = end;
                end = self.mate(end).ok_or(ErrorCode::Corrupt)? + 1;
            }
            _ => {
                self.error(
                    "proc_func_def",
                    end,
                    format!("expected ';' or function body, found {}", self.text(end)),
                );
                return Err(ErrorCode::Syntax);
            }
        }

        if host.is_none() {
            attrs.set(Attrs::GLOBAL_FN);
        }

        let base = EntityBase {
            name: SmolStr::new(name),
            fqname: self.prj.model.qualify_in(scope, name),
            access,
            comp: self.prj.file(self.fid).comp,
            attrs,
            ..Default::default()
        };
        let data = EntityData::Function(FuncData {
            tpx: ret,
            ext_name: ext_name.clone(),
            args: args.args.clone(),
            parent: host,
            decl_file: Some(self.fid),
            min_args: args.min_args,
            variadic: args.variadic,
            ..Default::default()
        });

        let mut diags = std::mem::take(&mut self.prj.diags);
        let added = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_func_def");
        self.prj.diags = diags;
        let func = match added {
            Ok(id) => id,
            Err(e) => {
                self.prj.diags.surface("proc_func_def", &self.fname.clone());
                return Err(e);
            }
        };

        // Group membership
        let group = self.func_group(scope, name)?;
        {
            let ent = self.prj.model.entity_mut(group);
            if let EntityData::FuncGroup(g) = &mut ent.data {
                if !g.funcs.contains(&func) {
                    g.funcs.push(func);
                }
            }
        }
        if let Some(f) = self.prj.model.entity_mut(func).as_func_mut() {
            f.group = Some(group);
        }

        // Class membership
        if let Some(h) = host {
            let is_op = attrs.has(Attrs::OPERATOR);
            if let Some(c) = self.prj.model.entity_mut(h).as_class_mut() {
                if !c.funcs.contains(&func) {
                    c.funcs.push(func);
                }
                if is_op && !c.ops.contains(&func) {
                    c.ops.push(func);
                }
            }
        }

        if is_def {
            {
                let f = self.prj.model.entity_mut(func).as_func_mut().unwrap();
                f.def_file = Some(self.fid);
                f.body_span = (body_start as u32, (end - 1) as u32);
            }
            if name == "main" {
                self.prj.file_mut(self.fid).has_main = true;
            }
            if in_class {
                self.prj.deferred.push_back(DeferredBody {
                    func,
                    host,
                    file: self.fid,
                    start: body_start as u32,
                });
            } else {
                self.proc_code_body(func, host, body_start)?;
            }
        }

        Ok((func, end))
    }
}

/// Parse one deferred member-function body outside any live parser,
/// taking the owning file's streams for the duration.
pub fn parse_deferred_body(prj: &mut Project, d: DeferredBody) -> Result<(), ErrorCode> {
    let fname = prj.file(d.file).name.clone();
    let p = std::mem::take(&mut prj.file_mut(d.file).raw);
    let x = std::mem::take(&mut prj.file_mut(d.file).active);
    let mut parser = Parser {
        prj,
        fid: d.file,
        fname,
        p,
        x,
        stmts: Vec::new(),
    };
    let rc = parser.proc_code_body(d.func, d.host, d.start as usize);
    let Parser { prj, p, x, .. } = parser;
    let f = prj.file_mut(d.file);
    f.raw = p;
    f.active = x;
    rc.map(|_| ())
}
