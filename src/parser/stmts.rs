//! File and namespace level statement dispatch, and the declaration
//! path shared with class bodies.

use smol_str::SmolStr;

use crate::diag::{ErrorCode, LoopGuard};
use crate::semantic::{
    Access, Atom, Attrs, EntityBase, EntityData, EntityId, EntityKind, ScopeId, Stmt, StmtKind,
    TyAttr, Typlex, VarData,
};
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    /// Statement loop over the whole active stream. Statement errors
    /// are reported and recovery resumes at the next boundary; only
    /// internal corruption aborts the file.
    pub fn parse_top_level(&mut self) -> Result<(), ErrorCode> {
        let mut guard = LoopGuard::new();
        let mut at = 0usize;
        while at < self.x.len() {
            if guard.check(at).is_err() {
                self.error("parse_top_level", at, "loop stop condition");
                return Err(ErrorCode::Corrupt);
            }
            let scope = match self.prj.cur_namespace {
                Some(ns) => self.prj.model.entity(ns).own_scope().unwrap_or(self.prj.model.root),
                None => self.prj.model.root,
            };
            match self.proc_statement(scope, at) {
                Ok(next) => at = next,
                Err(ErrorCode::Corrupt) => return Err(ErrorCode::Corrupt),
                Err(_) => {
                    self.prj.diags.surface("parse_top_level", &self.fname.clone());
                    at = self.recover_from(at);
                }
            }
        }
        Ok(())
    }

    /// Dispatch one statement at file or namespace level. `scope` is
    /// the entity table new declarations land in.
    pub fn proc_statement(&mut self, scope: ScopeId, at: usize) -> Result<usize, ErrorCode> {
        match self.kind(at) {
            TokenKind::Semicolon => Ok(at + 1),

            TokenKind::KwUsing => self.proc_using(at),
            TokenKind::KwNamespace => self.proc_namespace(at),
            TokenKind::Typedef => self.proc_typedef(None, scope, at),

            TokenKind::Template => {
                let (targs, next) = self.parse_template_prefix(at)?;
                match self.kind(next) {
                    TokenKind::Class | TokenKind::Struct => {
                        self.proc_class(None, scope, Access::Global, &targs, next)
                    }
                    _ => self.proc_declaration(None, scope, Access::Global, &targs, next, false),
                }
            }

            TokenKind::Class | TokenKind::Struct
                if self.kind(at + 2) == TokenKind::Semicolon
                    || self.kind(at + 2) == TokenKind::Colon
                    || self.kind(at + 2) == TokenKind::BraceOpen =>
            {
                self.proc_class(None, scope, Access::Global, &[], at)
            }

            TokenKind::Union
                if self.kind(at + 2) == TokenKind::Semicolon
                    || self.kind(at + 2) == TokenKind::BraceOpen =>
            {
                self.proc_union(None, scope, at)
            }

            TokenKind::Enum => match self.proc_enum(None, scope, Access::Global, at)? {
                Some(next) => Ok(next),
                None => self.proc_declaration(None, scope, Access::Global, &[], at, false),
            },

            // extern "C" linkage block or declaration
            TokenKind::KwExtern if self.kind(at + 1) == TokenKind::StrLit => {
                if self.kind(at + 2) == TokenKind::BraceOpen {
                    let close = self.mate(at + 2).ok_or(ErrorCode::Corrupt)?;
                    let mut ct = at + 3;
                    let mut guard = LoopGuard::new();
                    while ct < close {
                        if guard.check(ct).is_err() {
                            return Err(ErrorCode::Corrupt);
                        }
                        match self.proc_statement(scope, ct) {
                            Ok(next) => ct = next,
                            Err(ErrorCode::Corrupt) => return Err(ErrorCode::Corrupt),
                            Err(_) => {
                                self.prj.diags.surface("proc_statement", &self.fname.clone());
                                ct = self.recover_from(ct);
                            }
                        }
                    }
                    Ok(close + 1)
                } else {
                    self.proc_statement(scope, at + 2)
                }
            }

            _ => self.proc_declaration(None, scope, Access::Global, &[], at, false),
        }
    }

    /// `using namespace <name> ;` adds the namespace to the active
    /// using-set consulted by unqualified lookup.
    fn proc_using(&mut self, at: usize) -> Result<usize, ErrorCode> {
        if self.kind(at + 1) != TokenKind::KwNamespace || self.kind(at + 2) != TokenKind::Word {
            self.error("proc_using", at, "expected 'using namespace <name> ;'");
            return Err(ErrorCode::Syntax);
        }
        let name = SmolStr::new(self.text(at + 2));
        match self.prj.model.scope(self.prj.model.root).get(&name) {
            Some(ns) if self.prj.model.entity(ns).kind() == EntityKind::Namespace => {
                if !self.prj.model.using.contains(&ns) {
                    self.prj.model.using.push(ns);
                }
            }
            _ => {
                self.warning(
                    "proc_using",
                    at + 2,
                    format!("namespace '{name}' not known"),
                );
            }
        }
        let mut s = Stmt::new(StmtKind::Using, self.line(at), at as u32, 0);
        s.object = name;
        self.stmts.push(s);
        self.expect_stmt_end(at + 3)
    }

    /// `namespace <name> { … }` creates or reuses the namespace and
    /// parses the body with it as the current namespace.
    fn proc_namespace(&mut self, at: usize) -> Result<usize, ErrorCode> {
        if self.kind(at + 1) != TokenKind::Word {
            self.error("proc_namespace", at + 1, "expected a namespace name");
            return Err(ErrorCode::Syntax);
        }
        let name = SmolStr::new(self.text(at + 1));
        if self.kind(at + 2) != TokenKind::BraceOpen {
            self.error("proc_namespace", at + 2, "expected '{' after namespace name");
            return Err(ErrorCode::Syntax);
        }
        let close = self.mate(at + 2).ok_or(ErrorCode::Corrupt)?;

        let root = self.prj.model.root;
        let ns = match self.prj.model.scope(root).get(&name) {
            Some(id) if self.prj.model.entity(id).kind() == EntityKind::Namespace => id,
            Some(id) => {
                self.error(
                    "proc_namespace",
                    at + 1,
                    format!(
                        "'{name}' is already a {}",
                        self.prj.model.entity(id).kind().as_str()
                    ),
                );
                return Err(ErrorCode::Duplicate);
            }
            None => {
                let table = self.prj.model.alloc_scope(None, name.clone(), Some(root));
                let base = EntityBase {
                    name: name.clone(),
                    fqname: name.clone(),
                    access: Access::Global,
                    comp: self.prj.file(self.fid).comp,
                    ..Default::default()
                };
                let mut diags = std::mem::take(&mut self.prj.diags);
                let r = self.prj.model.add_entity(
                    root,
                    base,
                    EntityData::Namespace { table },
                    &mut diags,
                    &self.fname,
                    "proc_namespace",
                );
                self.prj.diags = diags;
                match r {
                    Ok(id) => id,
                    Err(e) => {
                        self.prj.diags.surface("proc_namespace", &self.fname.clone());
                        return Err(e);
                    }
                }
            }
        };

        let ns_table = self.prj.model.entity(ns).own_scope().unwrap();
        let saved = self.prj.cur_namespace.replace(ns);

        let mut ct = at + 3;
        let mut guard = LoopGuard::new();
        while ct < close {
            if guard.check(ct).is_err() {
                self.prj.cur_namespace = saved;
                return Err(ErrorCode::Corrupt);
            }
            match self.proc_statement(ns_table, ct) {
                Ok(next) => ct = next,
                Err(ErrorCode::Corrupt) => {
                    self.prj.cur_namespace = saved;
                    return Err(ErrorCode::Corrupt);
                }
                Err(_) => {
                    self.prj.diags.surface("proc_namespace", &self.fname.clone());
                    ct = self.recover_from(ct);
                }
            }
        }
        self.prj.cur_namespace = saved;

        let mut s = Stmt::new(StmtKind::Namespace, self.line(at), at as u32, 0);
        s.object = name;
        s.end = close as u32;
        self.stmts.push(s);
        Ok(close + 1)
    }

    /// `typedef <typlex> <name> ;` including the function pointer form
    /// `typedef <ret> (*<name>)(<argtypes>) ;`
    pub fn proc_typedef(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, None);
        let (mut tpx, mut end) = self.get_typlex(&ctx, at + 1)?;

        let name;
        if self.kind(end) == TokenKind::ParenOpen
            && self.kind(end + 1) == TokenKind::Mult
            && self.kind(end + 2) == TokenKind::Word
            && self.kind(end + 3) == TokenKind::ParenClose
            && self.kind(end + 4) == TokenKind::ParenOpen
        {
            name = SmolStr::new(self.text(end + 2));
            let aclose = self.mate(end + 4).ok_or(ErrorCode::Corrupt)?;
            tpx.attrs.set(TyAttr::FNPTR);
            let mut ct = end + 5;
            while ct < aclose {
                let (arg, mut aend) = self.get_typlex(&ctx, ct)?;
                tpx.args.push(arg);
                // Argument names in the prototype carry no meaning
                if self.kind(aend) == TokenKind::Word {
                    aend += 1;
                }
                if self.kind(aend) == TokenKind::Comma {
                    aend += 1;
                }
                ct = aend;
            }
            end = aclose + 1;
        } else if self.kind(end) == TokenKind::Word {
            name = SmolStr::new(self.text(end));
            end += 1;
        } else {
            self.error("proc_typedef", end, "expected a typedef name");
            return Err(ErrorCode::Syntax);
        }

        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, &name),
            access: if host.is_some() { Access::Public } else { Access::Global },
            comp: self.prj.file(self.fid).comp,
            ..Default::default()
        };
        let data = EntityData::Typedef {
            resolve: tpx,
            def_file: Some(self.fid),
        };
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_typedef");
        self.prj.diags = diags;
        if r.is_err() {
            self.prj.diags.surface("proc_typedef", &self.fname.clone());
            return Err(r.unwrap_err());
        }

        let mut s = Stmt::new(StmtKind::Typedef, self.line(at), at as u32, 0);
        s.object = name;
        s.end = end as u32;
        self.stmts.push(s);
        self.expect_stmt_end(end)
    }

    /// `template < class T, … >` parameter list. Returns the argument
    /// names and the index one past the `>`.
    pub fn parse_template_prefix(&mut self, at: usize) -> Result<(Vec<SmolStr>, usize), ErrorCode> {
        debug_assert_eq!(self.kind(at), TokenKind::Template);
        if self.kind(at + 1) != TokenKind::Less {
            self.error("parse_template_prefix", at + 1, "expected '<' after template");
            return Err(ErrorCode::Syntax);
        }
        let mut names = Vec::new();
        let mut ct = at + 2;
        loop {
            // `class T` or `typename T`
            if self.kind(ct) == TokenKind::Class
                || (self.kind(ct) == TokenKind::Word && self.text(ct) == "typename")
            {
                ct += 1;
            }
            if self.kind(ct) != TokenKind::Word {
                self.error("parse_template_prefix", ct, "expected a template argument name");
                return Err(ErrorCode::Syntax);
            }
            names.push(SmolStr::new(self.text(ct)));
            ct += 1;
            match self.kind(ct) {
                TokenKind::Comma => ct += 1,
                TokenKind::More => return Ok((names, ct + 1)),
                _ => {
                    self.error("parse_template_prefix", ct, "expected ',' or '>'");
                    return Err(ErrorCode::Syntax);
                }
            }
        }
    }

    fn expect_stmt_end(&mut self, at: usize) -> Result<usize, ErrorCode> {
        if self.kind(at) == TokenKind::Semicolon {
            Ok(at + 1)
        } else {
            self.error("proc_statement", at, "expected ';'");
            Err(ErrorCode::Syntax)
        }
    }

    /// The declaration path: `[keywords] <typlex>` followed by one of
    /// the variable, function, function-pointer or out-of-class
    /// definition forms.
    #[allow(clippy::too_many_arguments)]
    pub fn proc_declaration(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        targs: &[SmolStr],
        at: usize,
        in_class: bool,
    ) -> Result<usize, ErrorCode> {
        let (pre, ct) = self.read_prefix(at)?;

        // Out-of-class constructor or destructor: no leading typlex
        if self.kind(ct) == TokenKind::Word {
            let cname = self.text(ct).to_string();
            if self.kind(ct + 1) == TokenKind::Scope
                && self.text(ct + 2) == cname
                && self.kind(ct + 3) == TokenKind::ParenOpen
            {
                if let Some((klass, _)) = self.get_class(ct) {
                    let table = self.class_table(klass);
                    let mut attrs = pre.attrs;
                    attrs.set(Attrs::CONSTRUCTOR);
                    let ret = Typlex::of(klass);
                    let (func, end) = self.proc_func_def(
                        Some(klass),
                        table,
                        ret,
                        &cname,
                        attrs,
                        Access::Public,
                        ct + 3,
                        false,
                    )?;
                    self.push_func_stmt(func, at, end);
                    return Ok(end);
                }
            }
            if self.kind(ct + 1) == TokenKind::ScopeTilde
                && self.text(ct + 2) == cname
                && self.kind(ct + 3) == TokenKind::ParenOpen
            {
                if let Some((klass, _)) = self.get_class(ct) {
                    let table = self.class_table(klass);
                    let mut attrs = pre.attrs;
                    attrs.set(Attrs::DESTRUCTOR);
                    let name = format!("~{cname}");
                    let ret = Typlex::of(self.prj.model.std.void);
                    let (func, end) = self.proc_func_def(
                        Some(klass),
                        table,
                        ret,
                        &name,
                        attrs,
                        Access::Public,
                        ct + 3,
                        false,
                    )?;
                    self.push_func_stmt(func, at, end);
                    return Ok(end);
                }
            }
        }

        // Template arguments of a function template act as types while
        // the signature is read
        let targ_scope = if targs.is_empty() {
            None
        } else {
            let s = self.prj.model.alloc_scope(None, "template", None);
            self.make_template_args(s, targs);
            Some(s)
        };

        let ctx = crate::semantic::LookupCtx {
            host,
            func: targ_scope,
            file: self.prj.file(self.fid).table,
        };

        let (tpx, end) = match self.get_typlex(&ctx, ct) {
            Ok(r) => r,
            Err(e) => {
                self.error(
                    "proc_declaration",
                    ct,
                    format!("statement does not begin with a recognizable type ('{}')", self.text(ct)),
                );
                return Err(e);
            }
        };

        // Effective access and insertion scope
        let (access, scope) = if host.is_some() {
            (access, scope)
        } else if pre.is_static {
            (Access::FileStatic, self.file_scope())
        } else {
            (access, scope)
        };

        match self.kind(end) {
            // Function pointer variable
            TokenKind::ParenOpen
                if self.kind(end + 1) == TokenKind::Mult
                    && self.kind(end + 2) == TokenKind::Word
                    && self.kind(end + 3) == TokenKind::ParenClose
                    && self.kind(end + 4) == TokenKind::ParenOpen =>
            {
                self.proc_fnptr_var(host, scope, access, pre.attrs, tpx, end, at)
            }

            // Operator function
            TokenKind::KwOperator => {
                let (name, after) = if self.kind(end + 1) == TokenKind::BracketOpen
                    && self.kind(end + 2) == TokenKind::BracketClose
                {
                    (SmolStr::new("operator[]"), end + 3)
                } else if self.kind(end + 1).is_operator() {
                    (SmolStr::new(format!("operator{}", self.text(end + 1))), end + 2)
                } else {
                    self.error("proc_declaration", end + 1, "malformed operator function name");
                    return Err(ErrorCode::Syntax);
                };
                if self.kind(after) != TokenKind::ParenOpen {
                    self.error("proc_declaration", after, "expected '(' after operator name");
                    return Err(ErrorCode::Syntax);
                }
                let mut attrs = pre.attrs;
                attrs.set(Attrs::OPERATOR);
                let (func, fend) =
                    self.proc_func_def(host, scope, tpx, &name, attrs, access, after, in_class)?;
                self.push_func_stmt(func, at, fend);
                Ok(fend)
            }

            // Out-of-class destructor on a resolved class typlex
            TokenKind::ScopeTilde => {
                let Some(klass) = tpx.base else {
                    self.error("proc_declaration", end, "destructor outside a class");
                    return Err(ErrorCode::Syntax);
                };
                let kname = self.prj.model.entity(klass).base.name.clone();
                if self.text(end + 1) != kname.as_str()
                    || self.kind(end + 2) != TokenKind::ParenOpen
                {
                    self.error("proc_declaration", end + 1, "malformed destructor definition");
                    return Err(ErrorCode::Syntax);
                }
                let table = self.class_table(klass);
                let mut attrs = pre.attrs;
                attrs.set(Attrs::DESTRUCTOR);
                let name = format!("~{kname}");
                let ret = Typlex::of(self.prj.model.std.void);
                let (func, fend) = self.proc_func_def(
                    Some(klass),
                    table,
                    ret,
                    &name,
                    attrs,
                    Access::Public,
                    end + 2,
                    false,
                )?;
                self.push_func_stmt(func, at, fend);
                Ok(fend)
            }

            TokenKind::Word => {
                // Out-of-class member: `<typlex> Class::name(…)`
                if self.kind(end + 1) == TokenKind::Scope {
                    if let Some((klass, mend)) = self.resolve_owner(end) {
                        return self.proc_member_def(klass, tpx, pre.attrs, targs, mend, at);
                    }
                }
                self.proc_declarators(host, scope, access, pre, tpx, targs, targ_scope, end, at, in_class)
            }

            _ => {
                self.error(
                    "proc_declaration",
                    end,
                    format!("statement does not match any recognized form at {}", self.text(end)),
                );
                Err(ErrorCode::Syntax)
            }
        }
    }

    /// Walk `ns::…::Class ::` chains ahead of a member name. Returns
    /// the owning class and the index of the member name.
    fn resolve_owner(&self, at: usize) -> Option<(EntityId, usize)> {
        let mut ent = self.prj.model.scope(self.prj.model.root).get(self.text(at)).or_else(|| {
            self.prj.model.using.iter().find_map(|&ns| {
                let t = self.prj.model.entity(ns).own_scope()?;
                self.prj.model.scope(t).get(self.text(at))
            })
        })?;
        let mut ct = at;
        let mut found = None;

        loop {
            match self.prj.model.entity(ent).kind() {
                EntityKind::Namespace => {
                    if self.kind(ct + 1) != TokenKind::Scope {
                        break;
                    }
                    let table = self.prj.model.entity(ent).own_scope()?;
                    let next = self.prj.model.scope(table).get(self.text(ct + 2))?;
                    ent = next;
                    ct += 2;
                }
                EntityKind::Class => {
                    found = Some((ent, ct));
                    if self.kind(ct + 1) != TokenKind::Scope {
                        break;
                    }
                    let table = self.prj.model.entity(ent).own_scope()?;
                    match self.prj.model.scope(table).get(self.text(ct + 2)) {
                        Some(next)
                            if self.prj.model.entity(next).kind() == EntityKind::Class =>
                        {
                            ent = next;
                            ct += 2;
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }

        let (klass, kat) = found?;
        if self.kind(kat + 1) == TokenKind::Scope {
            Some((klass, kat + 2))
        } else {
            None
        }
    }

    fn class_table(&self, klass: EntityId) -> ScopeId {
        self.prj
            .model
            .entity(klass)
            .own_scope()
            .unwrap_or(self.prj.model.root)
    }

    /// Out-of-class member function or operator definition; the member
    /// name sits at `at`.
    fn proc_member_def(
        &mut self,
        klass: EntityId,
        ret: Typlex,
        mut attrs: Attrs,
        _targs: &[SmolStr],
        at: usize,
        stmt_start: usize,
    ) -> Result<usize, ErrorCode> {
        let table = self.class_table(klass);

        let (name, after) = if self.kind(at) == TokenKind::KwOperator {
            attrs.set(Attrs::OPERATOR);
            if self.kind(at + 1) == TokenKind::BracketOpen
                && self.kind(at + 2) == TokenKind::BracketClose
            {
                (SmolStr::new("operator[]"), at + 3)
            } else if self.kind(at + 1).is_operator() {
                (SmolStr::new(format!("operator{}", self.text(at + 1))), at + 2)
            } else {
                self.error("proc_declaration", at + 1, "malformed operator member");
                return Err(ErrorCode::Syntax);
            }
        } else if self.kind(at) == TokenKind::Word {
            (SmolStr::new(self.text(at)), at + 1)
        } else {
            self.error("proc_declaration", at, "expected a member name");
            return Err(ErrorCode::Syntax);
        };

        if self.kind(after) != TokenKind::ParenOpen {
            self.error("proc_declaration", after, "expected '(' after member name");
            return Err(ErrorCode::Syntax);
        }

        let (func, end) =
            self.proc_func_def(Some(klass), table, ret, &name, attrs, Access::Public, after, false)?;
        self.push_func_stmt(func, stmt_start, end);
        Ok(end)
    }

    fn push_func_stmt(&mut self, func: EntityId, start: usize, end: usize) {
        let is_def = self
            .prj
            .model
            .entity(func)
            .as_func()
            .map(|f| f.body_span.0 != 0)
            .unwrap_or(false);
        let kind = if is_def { StmtKind::FuncDef } else { StmtKind::FuncDecl };
        let mut s = Stmt::new(kind, self.line(start), start as u32, 0);
        s.end = end.saturating_sub(1) as u32;
        s.object = self.prj.model.entity(func).base.name.clone();
        self.stmts.push(s);
    }

    /// `<typlex> (*name)(argtypes) [= target] ;`
    #[allow(clippy::too_many_arguments)]
    fn proc_fnptr_var(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        _attrs: Attrs,
        mut tpx: Typlex,
        end: usize,
        stmt_start: usize,
    ) -> Result<usize, ErrorCode> {
        let name = SmolStr::new(self.text(end + 2));
        let aclose = self.mate(end + 4).ok_or(ErrorCode::Corrupt)?;
        tpx.attrs.set(TyAttr::FNPTR);

        let ctx = self.ctx(host, None);
        let mut ct = end + 5;
        while ct < aclose {
            let (arg, mut aend) = self.get_typlex(&ctx, ct)?;
            tpx.args.push(arg);
            if self.kind(aend) == TokenKind::Word {
                aend += 1;
            }
            if self.kind(aend) == TokenKind::Comma {
                aend += 1;
            }
            ct = aend;
        }

        let mut at = aclose + 1;
        let mut kind = StmtKind::VarDeclFnptr;
        if self.kind(at) == TokenKind::Assign {
            kind = StmtKind::VarDeclFnAssign;
            while at < self.x.len() && self.kind(at) != TokenKind::Semicolon {
                at += 1;
            }
        }

        self.make_variable(host, scope, access, &name, tpx, Atom::Null, at)?;

        let mut s = Stmt::new(kind, self.line(stmt_start), stmt_start as u32, 0);
        s.object = name;
        s.end = at as u32;
        self.stmts.push(s);
        self.expect_stmt_end(at)
    }

    /// Plain declarators after a typlex: simple variables, arrays,
    /// initialized and constructor-initialized variables, and function
    /// declarations/definitions.
    #[allow(clippy::too_many_arguments)]
    fn proc_declarators(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        pre: super::DeclPrefix,
        tpx: Typlex,
        targs: &[SmolStr],
        targ_scope: Option<ScopeId>,
        end: usize,
        stmt_start: usize,
        in_class: bool,
    ) -> Result<usize, ErrorCode> {
        let name = SmolStr::new(self.text(end));
        let after = end + 1;

        // Function declaration or definition
        if self.kind(after) == TokenKind::ParenOpen && self.looks_like_signature(host, targ_scope, after) {
            let mut attrs = pre.attrs;
            if !targs.is_empty() {
                attrs.set(Attrs::TEMPLATE);
            }
            let (func, fend) =
                self.proc_func_def(host, scope, tpx, &name, attrs, access, after, in_class)?;
            if !targs.is_empty() {
                let ids = match targ_scope {
                    Some(s) => self.prj.model.scope(s).entries.values().copied().collect(),
                    None => Vec::new(),
                };
                if let Some(f) = self.prj.model.entity_mut(func).as_func_mut() {
                    f.targs = ids;
                }
            }
            self.push_func_stmt(func, stmt_start, fend);
            return Ok(fend);
        }

        // Variable declarator list
        let ctx = self.ctx(host, targ_scope);
        let level = self.x.get(stmt_start).map(|t| t.level as u32).unwrap_or(0);
        let mut kind = StmtKind::VarDecl;
        let mut at = end;
        let mut made: Vec<EntityId> = Vec::new();

        loop {
            if self.kind(at) != TokenKind::Word {
                self.error("proc_declaration", at, "expected a variable name");
                return Err(ErrorCode::Syntax);
            }
            let vname = SmolStr::new(self.text(at));
            let mut vtpx = tpx.clone();
            at += 1;

            if self.kind(at) == TokenKind::BracketOpen {
                kind = StmtKind::VarDeclArray;
                let (extent, aend) = self.get_array_extent(&ctx, at)?;
                at = aend;
                match extent {
                    Some(n) => vtpx.elements = n,
                    None => {
                        // Extent must come from extern linkage or the
                        // initializer
                        vtpx.elements = 0;
                    }
                }
            }

            let mut value = Atom::Null;
            match self.kind(at) {
                TokenKind::Assign => {
                    kind = if kind == StmtKind::VarDeclArray {
                        StmtKind::VarDeclArrayAssign
                    } else {
                        StmtKind::VarDeclAssign
                    };
                    if self.kind(at + 1) == TokenKind::BraceOpen {
                        let close = self.mate(at + 1).ok_or(ErrorCode::Corrupt)?;
                        if vtpx.elements == 0 {
                            vtpx.elements = self.count_initializers(at + 1, close);
                        }
                        at = close + 1;
                    } else {
                        let stop = self.next_decl_stop(at + 1);
                        let (_, v, e2) = self.assess_expr(&ctx, at + 1, stop, level)?;
                        value = v;
                        at = e2;
                    }
                }
                TokenKind::ParenOpen => {
                    kind = StmtKind::VarDeclCons;
                    let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
                    let mut ct = at + 1;
                    while ct < close {
                        let mut xt = ct;
                        let mut nest = 0i32;
                        while xt < close {
                            match self.kind(xt) {
                                TokenKind::ParenOpen => nest += 1,
                                TokenKind::ParenClose => nest -= 1,
                                TokenKind::Comma if nest == 0 => break,
                                _ => {}
                            }
                            xt += 1;
                        }
                        let _ = self.assess_expr(&ctx, ct, xt, level);
                        ct = xt + 1;
                    }
                    at = close + 1;
                }
                _ => {
                    if vtpx.elements == 0 && !pre.is_extern {
                        self.warning(
                            "proc_declaration",
                            at,
                            format!("array {vname} has no extent and no initializer"),
                        );
                    }
                }
            }

            let var = self.make_variable(host, scope, access, &vname, vtpx, value, at)?;
            made.push(var);

            match self.kind(at) {
                TokenKind::Comma => at += 1,
                _ => break,
            }
        }

        if self.kind(at) != TokenKind::Semicolon {
            self.error("proc_declaration", at, "expected ';' after declaration");
            return Err(ErrorCode::Syntax);
        }

        // The trailing comment on the same line describes the variable
        match self.com_post(at) {
            Some(raw) if self.p[raw].line == self.line(at) => {
                let text = self.consume_comment(raw);
                for &v in &made {
                    self.prj.model.entity_mut(v).base.desc = text.clone();
                }
            }
            _ => {
                if !self.prj.model.system_mask {
                    self.warning(
                        "proc_declaration",
                        at,
                        format!("expected a trailing comment for variable {name}"),
                    );
                }
            }
        }

        let mut s = Stmt::new(kind, self.line(stmt_start), stmt_start as u32, level);
        s.object = name;
        s.end = at as u32;
        self.stmts.push(s);
        Ok(at + 1)
    }

    /// Heuristic separating a function signature from a constructor
    /// style variable initializer: an empty argument block, `void`, or
    /// a leading type token reads as a signature.
    fn looks_like_signature(
        &mut self,
        host: Option<EntityId>,
        targ_scope: Option<ScopeId>,
        open: usize,
    ) -> bool {
        let close = match self.mate(open) {
            Some(c) => c,
            None => return false,
        };
        if close == open + 1 {
            return true;
        }
        let ctx = crate::semantic::LookupCtx {
            host,
            func: targ_scope,
            file: self.prj.file(self.fid).table,
        };
        if self.kind(open + 1) == TokenKind::Ellipsis {
            return true;
        }
        self.at_type(&ctx, open + 1)
    }

    /// Number of top-level elements of a `{…}` aggregate initializer.
    fn count_initializers(&self, open: usize, close: usize) -> u32 {
        if close == open + 1 {
            return 0;
        }
        let mut n = 1u32;
        let mut nest = 0i32;
        for i in open + 1..close {
            match self.kind(i) {
                TokenKind::BraceOpen | TokenKind::ParenOpen | TokenKind::BracketOpen => nest += 1,
                TokenKind::BraceClose | TokenKind::ParenClose | TokenKind::BracketClose => {
                    nest -= 1
                }
                TokenKind::Comma if nest == 0 => n += 1,
                _ => {}
            }
        }
        n
    }

    /// Stop index of a declarator initializer at this level
    fn next_decl_stop(&self, from: usize) -> usize {
        let mut at = from;
        let mut nest = 0i32;
        while at < self.x.len() {
            match self.kind(at) {
                TokenKind::ParenOpen | TokenKind::BracketOpen | TokenKind::BraceOpen => nest += 1,
                TokenKind::ParenClose | TokenKind::BracketClose | TokenKind::BraceClose => {
                    nest -= 1
                }
                TokenKind::Comma if nest <= 0 => return at,
                TokenKind::Semicolon if nest <= 0 => return at,
                _ => {}
            }
            at += 1;
        }
        at
    }

    fn make_variable(
        &mut self,
        host: Option<EntityId>,
        scope: ScopeId,
        access: Access,
        name: &SmolStr,
        tpx: Typlex,
        value: Atom,
        _at: usize,
    ) -> Result<EntityId, ErrorCode> {
        let base = EntityBase {
            name: name.clone(),
            fqname: self.prj.model.qualify_in(scope, name),
            access,
            comp: self.prj.file(self.fid).comp,
            ..Default::default()
        };
        let data = EntityData::Variable(VarData {
            tpx,
            parent: host,
            decl_file: Some(self.fid),
            value,
        });
        let mut diags = std::mem::take(&mut self.prj.diags);
        let r = self
            .prj
            .model
            .add_entity(scope, base, data, &mut diags, &self.fname, "proc_declaration");
        self.prj.diags = diags;
        r.map_err(|e| {
            self.prj.diags.surface("proc_declaration", &self.fname.clone());
            e
        })
    }

    /// The file-static entity table, created on first use.
    pub fn file_scope(&mut self) -> ScopeId {
        if let Some(s) = self.prj.file(self.fid).table {
            return s;
        }
        let name = self.prj.file(self.fid).name.clone();
        let root = self.prj.model.root;
        let s = self.prj.model.alloc_scope(None, name, Some(root));
        self.prj.file_mut(self.fid).table = Some(s);
        s
    }
}
