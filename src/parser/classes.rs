//! Class, struct and union definitions.
//!
//! A class body is parsed by a per-class statement processor which
//! honors access-specifier labels, constructors, destructors, casting
//! operators, member variables and member functions, and recurses for
//! nested types. Function bodies inside the class body are recorded
//! and deferred until the class's entity table is fully populated.

use smol_str::SmolStr;

use crate::diag::{ErrorCode, LoopGuard};
use crate::semantic::{
    Access, Attrs, ClassData, EntityBase, EntityData, EntityId, EntityKind, ScopeId, Stmt,
    StmtKind, Typlex, UnionData, lookup_token,
};
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    /// Process a class or struct statement: a forward declaration or a
    /// definition, possibly nested and possibly templated. `at` sits
    /// on the `class`/`struct` keyword.
    pub fn proc_class(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        targs: &[SmolStr],
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let is_struct = self.kind(at) == TokenKind::Struct;
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let mut stmt = Stmt::new(StmtKind::ClassDef, self.line(at), at as u32, level);

        let mut ct = at + 1;
        if self.kind(ct) != TokenKind::Word {
            self.error("proc_class", ct, "expected a class name");
            return Err(ErrorCode::Syntax);
        }
        let name = SmolStr::new(self.text(ct));
        stmt.object = name.clone();
        ct += 1;

        let existing = self
            .prj
            .model
            .scope(scope)
            .get(&name)
            .filter(|&id| self.prj.model.entity(id).kind() == EntityKind::Class);

        // Forward declaration
        if self.kind(ct) == TokenKind::Semicolon {
            if existing.is_none() {
                self.make_class(host, scope, access, &name, is_struct, targs)?;
            }
            stmt.kind = StmtKind::ClassDecl;
            stmt.end = ct as u32;
            self.stmts.push(stmt);
            return Ok(ct + 1);
        }

        // Optional base clause
        let mut base_class = None;
        if self.kind(ct) == TokenKind::Colon {
            ct += 1;
            if matches!(
                self.kind(ct),
                TokenKind::KwPublic | TokenKind::KwPrivate | TokenKind::KwProtected
            ) {
                ct += 1;
            }
            let ctx = self.ctx(host, None);
            match lookup_token(&self.prj.model, &self.x, &ctx, ct, true) {
                Some((b, end)) if self.prj.model.entity(b).kind() == EntityKind::Class => {
                    base_class = Some(b);
                    ct = end;
                }
                _ => {
                    self.error(
                        "proc_class",
                        ct,
                        format!("base class '{}' not found", self.text(ct)),
                    );
                    return Err(ErrorCode::NotFound);
                }
            }
        }

        if self.kind(ct) != TokenKind::BraceOpen {
            self.error("proc_class", ct, "expected '{' opening the class definition");
            return Err(ErrorCode::Syntax);
        }
        let open = ct;
        let close = self.mate(open).ok_or(ErrorCode::Corrupt)?;

        let class = match existing {
            Some(id) => id,
            None => self.make_class(host, scope, access, &name, is_struct, targs)?,
        };
        {
            let is_template = !targs.is_empty();
            let ent = self.prj.model.entity_mut(class);
            if is_template {
                ent.base.attrs.set(Attrs::TEMPLATE);
                stmt.kind = StmtKind::ClassTmplDef;
            }
            if let EntityData::Class(c) = &mut ent.data {
                c.base = base_class;
                c.def_file = Some(self.fid);
                c.def_span = (at as u32, close as u32);
            }
        }

        // Internal class comment: the first comment inside the brace
        if let Some(raw) = self.com_post(open) {
            let text = self.consume_comment(raw);
            crate::comments::proc_comment_class(self, class, &text);
        } else if !self.prj.model.system_mask {
            self.warning(
                "proc_class",
                open,
                format!("expected a leading comment for class {name}"),
            );
        }

        // Members. The default range is private for a class, public
        // for a struct.
        let table = self.prj.model.entity(class).as_class().unwrap().table;
        let mut cur = if is_struct { Access::Public } else { Access::Private };
        let mut guard = LoopGuard::new();
        let mut mt = open + 1;
        while mt < close {
            if guard.check(mt).is_err() {
                self.error("proc_class", mt, "loop stop condition in class body");
                return Err(ErrorCode::Corrupt);
            }
            match self.proc_struct_stmt(class, table, &mut cur, &name, mt) {
                Ok(next) => mt = next,
                Err(ErrorCode::Corrupt) => return Err(ErrorCode::Corrupt),
                Err(_) => {
                    self.prj.diags.surface("proc_class", &self.fname.clone());
                    mt = self.recover_from(mt);
                }
            }
        }

        // The class's table is now fully populated: member function
        // bodies recorded during the definition parse now.
        self.drain_class_deferred(class)?;

        let mut end = close + 1;
        if self.kind(end) == TokenKind::Semicolon {
            end += 1;
        } else {
            self.warning("proc_class", end, "expected ';' after class definition");
        }

        stmt.end = (end - 1) as u32;
        self.stmts.push(stmt);
        Ok(end)
    }

    fn make_class(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        name: &SmolStr,
        is_struct: bool,
        targs: &[SmolStr],
    ) -> Result<EntityId, ErrorCode> {
        let table = self.prj.model.alloc_scope(None, name.clone(), Some(scope));
        let mut attrs = Attrs::NONE;
        if is_struct {
            attrs.set(Attrs::STRUCT);
        }
        if !targs.is_empty() {
            attrs.set(Attrs::TEMPLATE);
        }
        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, name),
            access,
            comp: self.prj.file(self.fid).comp,
            attrs,
            ..Default::default()
        };
        let data = EntityData::Class(ClassData {
            table,
            parent: host.filter(|&h| self.prj.model.entity(h).kind() == EntityKind::Class),
            def_file: Some(self.fid),
            ..Default::default()
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_class");
        self.prj.diags = diags;
        let class = match r {
            Ok(id) => id,
            Err(e) => {
                self.prj.diags.surface("proc_class", &self.fname.clone());
                return Err(e);
            }
        };

        // Template arguments act as data types within the definition
        let targ_ids = self.make_template_args(table, targs);
        if let EntityData::Class(c) = &mut self.prj.model.entity_mut(class).data {
            c.targs = targ_ids;
        }
        Ok(class)
    }

    /// Create template-argument placeholder types inside `table`.
    pub fn make_template_args(&mut self, table: ScopeId, targs: &[SmolStr]) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(targs.len());
        for (n, t) in targs.iter().enumerate() {
            let id = self.prj.model.alloc_entity(
                EntityBase {
                    name: t.clone(),
                    fqname: t.clone(),
                    access: Access::Public,
                    comp: self.prj.file(self.fid).comp,
                    ..Default::default()
                },
                EntityData::TemplateArg { order: n as u16 },
            );
            self.prj.model.scope_mut(table).entries.insert(t.clone(), id);
            ids.push(id);
        }
        ids
    }

    /// One statement of a class/struct definition body.
    fn proc_struct_stmt(
        &mut self,
        class: EntityId,
        table: ScopeId,
        cur: &mut Access,
        class_name: &SmolStr,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        match self.kind(at) {
            // Access specifier labels set the default range for what follows
            TokenKind::KwPublic | TokenKind::KwPrivate | TokenKind::KwProtected => {
                if self.kind(at + 1) != TokenKind::Colon {
                    self.error("proc_struct_stmt", at + 1, "expected ':' after access specifier");
                    return Err(ErrorCode::Syntax);
                }
                *cur = match self.kind(at) {
                    TokenKind::KwPublic => Access::Public,
                    TokenKind::KwProtected => Access::Protected,
                    _ => Access::Private,
                };
                Ok(at + 2)
            }

            TokenKind::Semicolon => Ok(at + 1),

            // Constructor: the class name followed by an argument block
            TokenKind::Word
                if self.text(at) == class_name.as_str()
                    && self.kind(at + 1) == TokenKind::ParenOpen =>
            {
                let mut attrs = Attrs::NONE;
                attrs.set(Attrs::CONSTRUCTOR);
                let ret = Typlex::of(class);
                let (_, end) = self.proc_func_def(
                    Some(class),
                    table,
                    ret,
                    class_name,
                    attrs,
                    *cur,
                    at + 1,
                    true,
                )?;
                Ok(end)
            }

            // Destructor
            TokenKind::Invert
                if self.text(at + 1) == class_name.as_str()
                    && self.kind(at + 2) == TokenKind::ParenOpen =>
            {
                let mut attrs = Attrs::NONE;
                attrs.set(Attrs::DESTRUCTOR);
                let name = format!("~{class_name}");
                let ret = Typlex::of(self.prj.model.std.void);
                let (_, end) =
                    self.proc_func_def(Some(class), table, ret, &name, attrs, *cur, at + 2, true)?;
                Ok(end)
            }

            // Virtual destructor
            TokenKind::KwVirtual
                if self.kind(at + 1) == TokenKind::Invert
                    && self.text(at + 2) == class_name.as_str()
                    && self.kind(at + 3) == TokenKind::ParenOpen =>
            {
                let mut attrs = Attrs::NONE;
                attrs.set(Attrs::DESTRUCTOR);
                attrs.set(Attrs::VIRTUAL);
                let name = format!("~{class_name}");
                let ret = Typlex::of(self.prj.model.std.void);
                let (_, end) =
                    self.proc_func_def(Some(class), table, ret, &name, attrs, *cur, at + 3, true)?;
                Ok(end)
            }

            // Casting operator: `operator <typlex> (args)`
            TokenKind::KwOperator if !self.kind(at + 1).is_operator()
                && self.kind(at + 1) != TokenKind::BracketOpen =>
            {
                let ctx = self.ctx(Some(class), None);
                let (ret, end) = self.get_typlex(&ctx, at + 1)?;
                if self.kind(end) != TokenKind::ParenOpen {
                    self.error("proc_struct_stmt", end, "expected '(' after casting operator");
                    return Err(ErrorCode::Syntax);
                }
                let name = format!("operator {}", ret.render(&self.prj.model));
                let mut attrs = Attrs::NONE;
                attrs.set(Attrs::OPERATOR);
                let (_, after) =
                    self.proc_func_def(Some(class), table, ret, &name, attrs, *cur, end, true)?;
                Ok(after)
            }

            // Nested definitions
            TokenKind::Class | TokenKind::Struct => {
                self.proc_class(Some(class), table, *cur, &[], at)
            }
            TokenKind::Union => self.proc_union(Some(class), table, at),
            TokenKind::Enum => match self.proc_enum(Some(class), table, *cur, at)? {
                Some(next) => Ok(next),
                None => self.proc_declaration(Some(class), table, *cur, &[], at, true),
            },
            TokenKind::Typedef => self.proc_typedef(Some(class), table, at),

            TokenKind::Template => {
                let (targs, next) = self.parse_template_prefix(at)?;
                match self.kind(next) {
                    TokenKind::Class | TokenKind::Struct => {
                        self.proc_class(Some(class), table, *cur, &targs, next)
                    }
                    _ => self.proc_declaration(Some(class), table, *cur, &targs, next, true),
                }
            }

            TokenKind::KwFriend => self.proc_friend(class, at),

            _ => self.proc_declaration(Some(class), table, *cur, &[], at, true),
        }
    }

    /// `friend class X ;` or a friend function declaration. Friend
    /// functions are global entities recorded on the class.
    fn proc_friend(&mut self, class: EntityId, at: usize) -> Result<usize, ErrorCode> {
        if self.kind(at + 1) == TokenKind::Class || self.kind(at + 1) == TokenKind::Struct {
            // Friendship with a class needs no entity of its own
            let mut end = at + 2;
            while end < self.x.len() && self.kind(end) != TokenKind::Semicolon {
                end += 1;
            }
            return Ok(end + 1);
        }

        let (pre, ct) = self.read_prefix(at + 1)?;
        let ctx = self.ctx(None, None);
        let (ret, end) = self.get_typlex(&ctx, ct)?;
        if self.kind(end) != TokenKind::Word || self.kind(end + 1) != TokenKind::ParenOpen {
            self.error("proc_friend", end, "malformed friend declaration");
            return Err(ErrorCode::Syntax);
        }
        let name = SmolStr::new(self.text(end));
        let mut attrs = pre.attrs;
        attrs.set(Attrs::FRIEND);
        let (func, after) = self.proc_func_def(
            None,
            self.prj.model.root,
            ret,
            &name,
            attrs,
            Access::Global,
            end + 1,
            false,
        )?;
        if let Some(c) = self.prj.model.entity_mut(class).as_class_mut() {
            if !c.friends.contains(&func) {
                c.friends.push(func);
            }
        }
        Ok(after)
    }

    /// Process a union statement. `at` sits on the `union` keyword.
    pub fn proc_union(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let mut stmt = Stmt::new(StmtKind::UnionDef, self.line(at), at as u32, level);
        let mut ct = at + 1;
        if self.kind(ct) != TokenKind::Word {
            self.error("proc_union", ct, "expected a union name");
            return Err(ErrorCode::Syntax);
        }
        let name = SmolStr::new(self.text(ct));
        stmt.object = name.clone();
        ct += 1;

        let existing = self
            .prj
            .model
            .scope(scope)
            .get(&name)
            .filter(|&id| self.prj.model.entity(id).kind() == EntityKind::Union);

        if self.kind(ct) == TokenKind::Semicolon {
            if existing.is_none() {
                self.make_union(host, scope, &name, (at, ct))?;
            }
            stmt.kind = StmtKind::UnionDecl;
            stmt.end = ct as u32;
            self.stmts.push(stmt);
            return Ok(ct + 1);
        }

        if self.kind(ct) != TokenKind::BraceOpen {
            self.error("proc_union", ct, "expected '{' opening the union definition");
            return Err(ErrorCode::Syntax);
        }
        let close = self.mate(ct).ok_or(ErrorCode::Corrupt)?;

        let union_id = match existing {
            Some(id) => id,
            None => self.make_union(host, scope, &name, (at, close))?,
        };
        if let EntityData::Union(u) = &mut self.prj.model.entity_mut(union_id).data {
            u.def_file = Some(self.fid);
            u.def_span = (at as u32, close as u32);
        }

        // Union members: plain variable declarations
        let table = match &self.prj.model.entity(union_id).data {
            EntityData::Union(u) => u.table,
            _ => unreachable!(),
        };
        let mut guard = LoopGuard::new();
        let mut mt = ct + 1;
        while mt < close {
            if guard.check(mt).is_err() {
                return Err(ErrorCode::Corrupt);
            }
            match self.proc_declaration(Some(union_id), table, Access::Public, &[], mt, false) {
                Ok(next) => mt = next,
                Err(_) => {
                    self.prj.diags.surface("proc_union", &self.fname.clone());
                    mt = self.recover_from(mt);
                }
            }
        }

        let mut end = close + 1;
        if self.kind(end) == TokenKind::Semicolon {
            end += 1;
        } else {
            self.warning("proc_union", end, "expected ';' after union definition");
        }
        stmt.end = (end - 1) as u32;
        self.stmts.push(stmt);
        Ok(end)
    }

    fn make_union(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        name: &SmolStr,
        span: (usize, usize),
    ) -> Result<EntityId, ErrorCode> {
        let table = self.prj.model.alloc_scope(None, name.clone(), Some(scope));
        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, name),
            access: Access::Global,
            comp: self.prj.file(self.fid).comp,
            ..Default::default()
        };
        let data = EntityData::Union(UnionData {
            table,
            host,
            def_file: Some(self.fid),
            def_span: (span.0 as u32, span.1 as u32),
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_union");
        self.prj.diags = diags;
        r.map_err(|e| {
            self.prj.diags.surface("proc_union", &self.fname.clone());
            e
        })
    }
}
