//! Function body parsing: statements and blocks.

use smol_str::SmolStr;

use crate::diag::{ErrorCode, LoopGuard};
use crate::semantic::{
    Access, Atom, EntityBase, EntityData, EntityId, EntityKind, LookupCtx, ScopeId, Stmt,
    StmtKind, VarData,
};
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    /// Parse a function body. `start` sits on the opening `{`; returns
    /// the index of the matching `}`. Creates the function's entity
    /// table if absent, installs the arguments as locals, and records
    /// one statement per recognized form.
    pub fn proc_code_body(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        start: usize,
    ) -> Result<usize, ErrorCode> {
        debug_assert_eq!(self.kind(start), TokenKind::BraceOpen);
        let close = self.mate(start).ok_or(ErrorCode::Corrupt)?;

        let fscope = match self.prj.model.entity(func).as_func().and_then(|f| f.table) {
            Some(s) => s,
            None => {
                let name = self.prj.model.entity(func).base.name.clone();
                let s = self.prj.model.alloc_scope(Some(func), name, None);
                let args = self
                    .prj
                    .model
                    .entity(func)
                    .as_func()
                    .map(|f| f.args.clone())
                    .unwrap_or_default();
                for arg in args {
                    let aname = self.prj.model.entity(arg).base.name.clone();
                    if !aname.is_empty() {
                        self.prj.model.scope_mut(s).entries.insert(aname, arg);
                    }
                }
                if let Some(f) = self.prj.model.entity_mut(func).as_func_mut() {
                    f.table = Some(s);
                }
                s
            }
        };

        // Internal function comment: the first comment inside the brace
        if let Some(raw) = self.com_post(start) {
            let text = self.consume_comment(raw);
            crate::comments::proc_comment_func(self, func, &text);
        } else if !self.prj.model.system_mask && close > start + 1 {
            let name = self.prj.model.entity(func).base.name.clone();
            self.warning(
                "proc_code_body",
                start,
                format!("expected a leading comment for function {name}"),
            );
        }

        let mut guard = LoopGuard::new();
        let mut at = start + 1;
        while at < close {
            if guard.check(at).is_err() {
                self.error("proc_code_body", at, "loop stop condition");
                return Err(ErrorCode::Corrupt);
            }
            match self.proc_code_stmt(func, host, fscope, at) {
                Ok(next) => at = next,
                Err(_) => {
                    // Statement abandoned: resume at the next boundary
                    at = self.recover_from(at);
                    self.prj.diags.surface("proc_code_body", &self.fname.clone());
                }
            }
        }

        Ok(close)
    }

    /// Record one statement against a function and return it for
    /// branch bookkeeping.
    fn push_stmt(&mut self, func: EntityId, stmt: Stmt) {
        if let Some(f) = self.prj.model.entity_mut(func).as_func_mut() {
            if stmt.is_return {
                f.ret_points += 1;
            }
            f.stmts.push(stmt);
        }
    }

    /// Condition text for documentation: the raw lexemes joined.
    fn summarize(&self, start: usize, end: usize) -> SmolStr {
        let mut out = String::new();
        for t in &self.x[start.min(self.x.len())..end.min(self.x.len())] {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(t.show());
        }
        SmolStr::new(out)
    }

    /// Index of the next `;` at paren/brace balance, bounded by the
    /// enclosing body.
    fn find_semicolon(&self, from: usize) -> Option<usize> {
        let mut at = from;
        let mut nest = 0i32;
        while at < self.x.len() {
            match self.kind(at) {
                TokenKind::ParenOpen | TokenKind::BracketOpen => nest += 1,
                TokenKind::ParenClose | TokenKind::BracketClose => nest -= 1,
                TokenKind::Semicolon if nest <= 0 => return Some(at),
                TokenKind::BraceOpen | TokenKind::BraceClose => return None,
                _ => {}
            }
            at += 1;
        }
        None
    }

    /// Parse one statement or block within a function body. Returns
    /// the index one past it.
    pub fn proc_code_stmt(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, Some(fscope));
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let line = self.line(at);

        match self.kind(at) {
            TokenKind::Semicolon => Ok(at + 1),

            TokenKind::BraceOpen => {
                // Bare block with its own nested scope
                let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
                let inner = self
                    .prj
                    .model
                    .alloc_scope(Some(func), "block", Some(fscope));
                let mut ct = at + 1;
                let mut guard = LoopGuard::new();
                while ct < close {
                    if guard.check(ct).is_err() {
                        return Err(ErrorCode::Corrupt);
                    }
                    ct = self.proc_code_stmt(func, host, inner, ct)?;
                }
                Ok(close + 1)
            }

            TokenKind::Break => {
                self.push_stmt(func, Stmt::new(StmtKind::Break, line, at as u32, level));
                Ok(self.expect_semi(at + 1)?)
            }

            TokenKind::Continue => {
                self.push_stmt(func, Stmt::new(StmtKind::Continue, line, at as u32, level));
                Ok(self.expect_semi(at + 1)?)
            }

            TokenKind::Goto => {
                if self.kind(at + 1) != TokenKind::Word {
                    self.error("proc_code_stmt", at + 1, "expected a label after goto");
                    return Err(ErrorCode::Syntax);
                }
                let mut s = Stmt::new(StmtKind::Goto, line, at as u32, level);
                s.object = SmolStr::new(self.text(at + 1));
                self.push_stmt(func, s);
                Ok(self.expect_semi(at + 2)?)
            }

            TokenKind::Return => {
                let semi = self.find_semicolon(at + 1).ok_or_else(|| {
                    self.error("proc_code_stmt", at, "return without terminating ';'");
                    ErrorCode::Syntax
                })?;
                if semi > at + 1 {
                    self.assess_expr(&ctx, at + 1, semi, level)?;
                }
                let mut s = Stmt::new(StmtKind::Return, line, at as u32, level);
                s.end = semi as u32;
                s.is_return = true;
                s.object = self.summarize(at + 1, semi);
                self.push_stmt(func, s);
                Ok(semi + 1)
            }

            TokenKind::Delete => {
                let mut ct = at + 1;
                if self.kind(ct) == TokenKind::BracketOpen
                    && self.kind(ct + 1) == TokenKind::BracketClose
                {
                    ct += 2;
                }
                let semi = self.find_semicolon(ct).ok_or(ErrorCode::Syntax)?;
                self.assess_expr(&ctx, ct, semi, level)?;
                let mut s = Stmt::new(StmtKind::Delete, line, at as u32, level);
                s.end = semi as u32;
                self.push_stmt(func, s);
                Ok(semi + 1)
            }

            TokenKind::If => self.proc_branch_if(func, host, fscope, at, false),

            TokenKind::Else => {
                // An else must follow an if or an else if
                if self.kind(at + 1) == TokenKind::If {
                    return self.proc_branch_if(func, host, fscope, at + 1, true);
                }
                self.push_stmt(func, Stmt::new(StmtKind::BranchElse, line, at as u32, level));
                self.proc_branch_body(func, host, fscope, at + 1)
            }

            TokenKind::Switch => self.proc_switch(func, host, fscope, at),

            TokenKind::For => self.proc_for(func, host, fscope, at),

            TokenKind::While => {
                let open = at + 1;
                if self.kind(open) != TokenKind::ParenOpen {
                    self.error("proc_code_stmt", open, "expected '(' after while");
                    return Err(ErrorCode::Syntax);
                }
                let close = self.mate(open).ok_or(ErrorCode::Corrupt)?;
                self.assess_expr(&ctx, open + 1, close, level)?;
                let mut s = Stmt::new(StmtKind::BranchWhile, line, at as u32, level);
                s.object = self.summarize(open + 1, close);
                self.push_stmt(func, s);
                self.proc_branch_body(func, host, fscope, close + 1)
            }

            TokenKind::Do => {
                if self.kind(at + 1) != TokenKind::BraceOpen {
                    self.error("proc_code_stmt", at + 1, "expected '{' after do");
                    return Err(ErrorCode::Syntax);
                }
                let body_end = self.proc_branch_body(func, host, fscope, at + 1)?;
                if self.kind(body_end) != TokenKind::While
                    || self.kind(body_end + 1) != TokenKind::ParenOpen
                {
                    self.error("proc_code_stmt", body_end, "expected 'while (…)' after do block");
                    return Err(ErrorCode::Syntax);
                }
                let close = self.mate(body_end + 1).ok_or(ErrorCode::Corrupt)?;
                self.assess_expr(&ctx, body_end + 2, close, level)?;
                let mut s = Stmt::new(StmtKind::BranchDoWhile, line, at as u32, level);
                s.object = self.summarize(body_end + 2, close);
                s.end = close as u32;
                self.push_stmt(func, s);
                Ok(self.expect_semi(close + 1)?)
            }

            // Label
            TokenKind::Word
                if self.kind(at + 1) == TokenKind::Colon
                    && self.x.get(at + 1).map(|t| t.mate == crate::token::NO_IDX).unwrap_or(false) =>
            {
                let mut s = Stmt::new(StmtKind::Null, line, at as u32, level);
                s.object = SmolStr::new(self.text(at));
                self.push_stmt(func, s);
                Ok(at + 2)
            }

            _ => self.proc_code_simple(func, host, fscope, at),
        }
    }

    fn expect_semi(&mut self, at: usize) -> Result<usize, ErrorCode> {
        if self.kind(at) == TokenKind::Semicolon {
            Ok(at + 1)
        } else {
            self.error("proc_code_stmt", at, "expected ';'");
            Err(ErrorCode::Syntax)
        }
    }

    /// `if (cond) …` with any chain of `else if` and a final `else`.
    fn proc_branch_if(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
        as_elseif: bool,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, Some(fscope));
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let open = at + 1;
        if self.kind(open) != TokenKind::ParenOpen {
            self.error("proc_code_stmt", open, "expected '(' after if");
            return Err(ErrorCode::Syntax);
        }
        let close = self.mate(open).ok_or(ErrorCode::Corrupt)?;
        self.assess_expr(&ctx, open + 1, close, level)?;

        let kind = if as_elseif {
            StmtKind::BranchElseIf
        } else {
            StmtKind::BranchIf
        };
        let mut s = Stmt::new(kind, self.line(at), at as u32, level);
        s.object = self.summarize(open + 1, close);
        self.push_stmt(func, s);

        let mut end = self.proc_branch_body(func, host, fscope, close + 1)?;
        if self.kind(end) == TokenKind::Else {
            end = self.proc_code_stmt(func, host, fscope, end)?;
        }
        Ok(end)
    }

    /// A branch target: either a block or a single statement.
    fn proc_branch_body(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        if self.kind(at) == TokenKind::BraceOpen {
            let close = self.mate(at).ok_or(ErrorCode::Corrupt)?;
            let mut ct = at + 1;
            let mut guard = LoopGuard::new();
            while ct < close {
                if guard.check(ct).is_err() {
                    return Err(ErrorCode::Corrupt);
                }
                ct = self.proc_code_stmt(func, host, fscope, ct)?;
            }
            Ok(close + 1)
        } else {
            self.proc_code_stmt(func, host, fscope, at)
        }
    }

    /// `switch (expr) { case …: … default: … }`
    fn proc_switch(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, Some(fscope));
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let open = at + 1;
        if self.kind(open) != TokenKind::ParenOpen {
            self.error("proc_code_stmt", open, "expected '(' after switch");
            return Err(ErrorCode::Syntax);
        }
        let pclose = self.mate(open).ok_or(ErrorCode::Corrupt)?;
        self.assess_expr(&ctx, open + 1, pclose, level)?;

        let mut s = Stmt::new(StmtKind::BranchSwitch, self.line(at), at as u32, level);
        s.object = self.summarize(open + 1, pclose);
        self.push_stmt(func, s);

        if self.kind(pclose + 1) != TokenKind::BraceOpen {
            self.error("proc_code_stmt", pclose + 1, "expected '{' after switch (…)");
            return Err(ErrorCode::Syntax);
        }
        let bclose = self.mate(pclose + 1).ok_or(ErrorCode::Corrupt)?;

        let mut ct = pclose + 2;
        let mut guard = LoopGuard::new();
        while ct < bclose {
            if guard.check(ct).is_err() {
                return Err(ErrorCode::Corrupt);
            }
            match self.kind(ct) {
                TokenKind::Case => {
                    // The case value runs to the ':'
                    let mut colon = ct + 1;
                    while colon < bclose && self.kind(colon) != TokenKind::Colon {
                        colon += 1;
                    }
                    let mut s =
                        Stmt::new(StmtKind::BranchCase, self.line(ct), ct as u32, level);
                    s.object = self.summarize(ct + 1, colon);
                    self.push_stmt(func, s);
                    ct = colon + 1;
                }
                TokenKind::Default => {
                    if self.kind(ct + 1) != TokenKind::Colon {
                        self.error("proc_code_stmt", ct + 1, "expected ':' after default");
                        return Err(ErrorCode::Syntax);
                    }
                    let mut s =
                        Stmt::new(StmtKind::BranchCase, self.line(ct), ct as u32, level);
                    s.object = SmolStr::new("default");
                    self.push_stmt(func, s);
                    ct += 2;
                }
                _ => ct = self.proc_code_stmt(func, host, fscope, ct)?,
            }
        }

        Ok(bclose + 1)
    }

    /// `for (init; cond; step) …`
    fn proc_for(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let open = at + 1;
        if self.kind(open) != TokenKind::ParenOpen {
            self.error("proc_code_stmt", open, "expected '(' after for");
            return Err(ErrorCode::Syntax);
        }
        let close = self.mate(open).ok_or(ErrorCode::Corrupt)?;

        let mut s = Stmt::new(StmtKind::BranchFor, self.line(at), at as u32, level);
        s.object = self.summarize(open + 1, close);
        self.push_stmt(func, s);

        // Init may declare the loop variable; parse its parts loosely
        let mut ct = open + 1;
        let mut guard = LoopGuard::new();
        while ct < close {
            if guard.check(ct).is_err() {
                return Err(ErrorCode::Corrupt);
            }
            if self.kind(ct) == TokenKind::Semicolon {
                ct += 1;
                continue;
            }
            let ctx = self.ctx(host, Some(fscope));
            if self.at_type(&ctx, ct) && self.kind_after_type(&ctx, ct) == TokenKind::Word {
                ct = self.proc_local_decl(func, host, fscope, ct, close)?;
            } else {
                let mut end = ct;
                let mut nest = 0i32;
                while end < close {
                    match self.kind(end) {
                        TokenKind::ParenOpen => nest += 1,
                        TokenKind::ParenClose => nest -= 1,
                        TokenKind::Semicolon if nest <= 0 => break,
                        _ => {}
                    }
                    end += 1;
                }
                if end > ct {
                    let _ = self.assess_expr(&ctx, ct, end, level);
                }
                ct = end + 1;
            }
        }

        self.proc_branch_body(func, host, fscope, close + 1)
    }

    /// Kind of the token directly after the typlex starting at `at`, a
    /// cheap two-token lookahead for declaration detection.
    fn kind_after_type(&mut self, ctx: &LookupCtx, at: usize) -> TokenKind {
        let mark = self.prj.diags.depth();
        let r = self.get_typlex(ctx, at);
        self.prj.diags.absorb(mark);
        match r {
            Ok((_, end)) => self.kind(end),
            Err(_) => TokenKind::Unknown,
        }
    }

    /// Local declarations, assignments, increments, decrements and
    /// calls: the expression statements.
    fn proc_code_simple(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, Some(fscope));
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let line = self.line(at);

        // A declaration begins with a type followed by a name
        if self.at_type(&ctx, at) && self.kind_after_type(&ctx, at) == TokenKind::Word {
            let semi = self.find_semicolon(at).ok_or(ErrorCode::Syntax)?;
            let end = self.proc_local_decl(func, host, fscope, at, semi + 1)?;
            return Ok(end);
        }

        let semi = self.find_semicolon(at).ok_or_else(|| {
            self.error("proc_code_stmt", at, "statement does not match any recognized form");
            ErrorCode::Syntax
        })?;

        // Classify for the statement record
        let kind = match self.kind(at) {
            TokenKind::Incr => StmtKind::VarIncB,
            TokenKind::Decr => StmtKind::VarDecB,
            _ => {
                let mut k = StmtKind::FuncCall;
                let mut nest = 0i32;
                for i in at..semi {
                    match self.kind(i) {
                        TokenKind::ParenOpen | TokenKind::BracketOpen => nest += 1,
                        TokenKind::ParenClose | TokenKind::BracketClose => nest -= 1,
                        TokenKind::Assign if nest == 0 => {
                            k = StmtKind::VarAssign;
                            break;
                        }
                        kk if kk.is_assign_op() && nest == 0 => {
                            k = StmtKind::VarMath;
                            break;
                        }
                        TokenKind::Incr if nest == 0 => k = StmtKind::VarIncA,
                        TokenKind::Decr if nest == 0 => k = StmtKind::VarDecA,
                        _ => {}
                    }
                }
                k
            }
        };

        if semi > at {
            self.assess_expr(&ctx, at, semi, level)?;
        }

        let mut s = Stmt::new(kind, line, at as u32, level);
        s.end = semi as u32;
        s.object = self.summarize(at, semi.min(at + 8));
        if let Some(raw) = self.com_post(semi) {
            if self.p[raw].line == self.line(semi) {
                s.comment = self.consume_comment(raw);
            }
        }
        self.push_stmt(func, s);
        Ok(semi + 1)
    }

    /// A local variable declaration inside a body or a for-init.
    /// `bound` is the first index the declaration may not reach.
    fn proc_local_decl(
        &mut self,
        func: EntityId,
        host: Option<EntityId>,
        fscope: ScopeId,
        at: usize,
        bound: usize,
    ) -> Result<usize, ErrorCode> {
        let ctx = self.ctx(host, Some(fscope));
        let level = self.x.get(at).map(|t| t.level as u32).unwrap_or(0);
        let line = self.line(at);
        let (tpx, mut end) = self.get_typlex(&ctx, at)?;

        let mut kind = StmtKind::VarDecl;
        loop {
            if self.kind(end) != TokenKind::Word {
                self.error("proc_code_stmt", end, "expected a variable name");
                return Err(ErrorCode::Syntax);
            }
            let name = SmolStr::new(self.text(end));
            let mut vtpx = tpx.clone();
            end += 1;

            if self.kind(end) == TokenKind::BracketOpen {
                let (extent, after) = self.get_array_extent(&ctx, end)?;
                vtpx.elements = extent.unwrap_or(0);
                end = after;
                kind = StmtKind::VarDeclArray;
            }

            let mut value = Atom::Null;
            match self.kind(end) {
                TokenKind::Assign => {
                    kind = if kind == StmtKind::VarDeclArray {
                        StmtKind::VarDeclArrayAssign
                    } else {
                        StmtKind::VarDeclAssign
                    };
                    let stop = self.decl_init_end(end + 1, bound);
                    if self.kind(end + 1) == TokenKind::BraceOpen {
                        // Aggregate initializer supplies the extent
                        end = self.mate(end + 1).ok_or(ErrorCode::Corrupt)? + 1;
                    } else {
                        let (_, v, e2) = self.assess_expr(&ctx, end + 1, stop, level)?;
                        value = v;
                        end = e2;
                    }
                }
                TokenKind::ParenOpen => {
                    // Constructor-initialized declaration
                    kind = StmtKind::VarDeclCons;
                    let close = self.mate(end).ok_or(ErrorCode::Corrupt)?;
                    if let Some(base) = vtpx.base {
                        if self.prj.model.entity(base).kind() == EntityKind::Class {
                            // Arguments assess for cross references only
                            let mut ct = end + 1;
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
                        }
                    }
                    end = close + 1;
                }
                _ => {}
            }

            let var = self.prj.model.alloc_entity(
                EntityBase {
                    fqname: name.clone(),
                    name: name.clone(),
                    access: Access::FuncLocal,
                    comp: self.prj.file(self.fid).comp,
                    ..Default::default()
                },
                EntityData::Variable(VarData {
                    tpx: vtpx,
                    parent: host,
                    decl_file: Some(self.fid),
                    value,
                }),
            );
            self.prj.model.scope_mut(fscope).entries.insert(name, var);

            match self.kind(end) {
                TokenKind::Comma => end += 1,
                _ => break,
            }
        }

        let mut s = Stmt::new(kind, line, at as u32, level);
        s.end = end as u32;
        self.push_stmt(func, s);

        match self.kind(end) {
            TokenKind::Semicolon => Ok(end + 1),
            _ if end >= bound => Ok(end),
            _ => {
                self.error("proc_code_stmt", end, "expected ';' after declaration");
                Err(ErrorCode::Syntax)
            }
        }
    }

    /// End of a declarator initializer: the next `,` or `;` at paren
    /// balance, bounded.
    fn decl_init_end(&self, from: usize, bound: usize) -> usize {
        let mut at = from;
        let mut nest = 0i32;
        while at < bound && at < self.x.len() {
            match self.kind(at) {
                TokenKind::ParenOpen | TokenKind::BracketOpen => nest += 1,
                TokenKind::ParenClose | TokenKind::BracketClose => nest -= 1,
                TokenKind::Comma if nest <= 0 => return at,
                TokenKind::Semicolon if nest <= 0 => return at,
                _ => {}
            }
            at += 1;
        }
        at
    }

    /// Entry used by the deferred-body drain inside a live parser.
    pub fn drain_class_deferred(&mut self, class: EntityId) -> Result<(), ErrorCode> {
        let mut rest = std::collections::VecDeque::new();
        while let Some(d) = self.prj.deferred.pop_front() {
            if d.host == Some(class) && d.file == self.fid {
                self.proc_code_body(d.func, d.host, d.start as usize)?;
            } else {
                rest.push_back(d);
            }
        }
        self.prj.deferred = rest;
        Ok(())
    }
}
