//! The preprocessor: raw stream `P` in, active stream `X` out.
//!
//! Pre-processing applies compiler directives so that parsing operates
//! on pure code in which all #defines are fully expanded and no code
//! exclusion clauses remain. Includes are followed recursively, each
//! file exactly once; the recursion is hard-capped at 10 levels.
//!
//! Comments are never placed in `X`; they stay in `P` and are linked
//! to active tokens by the comment associator once `X` is matched.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::base::FileId;
use crate::diag::{ErrorCode, LoopGuard};
use crate::project::Project;
use crate::semantic::{
    Access, Atom, Basis, DefineData, EntityBase, EntityData, EntityKind, LiteralData, LookupCtx,
    MacroData, lookup_token,
};
use crate::token::{COM_FLAG_PROC, NO_IDX, Token, TokenKind, kind_at, matcher};

/// Index one past the last token of the directive statement at `ct`:
/// the end of the line, extended across `\` line extenders, stopped by
/// a comment.
fn directive_limit(p: &[Token], ct: usize) -> usize {
    let mut eff_line = p[ct].line;
    let mut at = ct + 1;
    while at < p.len() && p[at].line == eff_line {
        if p[at].kind == TokenKind::Comment {
            break;
        }
        if p[at].kind == TokenKind::Escape {
            eff_line += 1;
        }
        at += 1;
    }
    at
}

/// Basis and value of a literal token, for promoting a #define to a
/// named literal.
fn literal_value(tok: &Token) -> (Basis, Atom) {
    match tok.kind {
        TokenKind::Integer => {
            let v = tok.text.parse::<i64>().unwrap_or(0);
            (Basis::Int32, Atom::Int(v))
        }
        TokenKind::Hex => {
            let v = i64::from_str_radix(tok.text.trim_start_matches("0x").trim_start_matches("0X"), 16)
                .unwrap_or(0);
            (Basis::Unt32, Atom::Int(v))
        }
        TokenKind::Octal => {
            let v = i64::from_str_radix(&tok.text[1..], 8).unwrap_or(0);
            (Basis::Unt32, Atom::Int(v))
        }
        TokenKind::StdForm => {
            let v = tok.text.parse::<f64>().unwrap_or(0.0);
            (Basis::Double, Atom::Double(v))
        }
        TokenKind::Boolean => (Basis::Bool, Atom::Bool(tok.text == "true")),
        TokenKind::CharLit => (Basis::Int8, Atom::Char(tok.text.chars().next().unwrap_or('\0'))),
        TokenKind::StrLit => (Basis::String, Atom::Str(tok.text.clone())),
        _ => (Basis::Null, Atom::Null),
    }
}

/// Reconstruct a literal token from a named literal entity.
fn literal_token(lit: &LiteralData, line: u32) -> Token {
    let kind = match lit.basis {
        Basis::Double => TokenKind::StdForm,
        Basis::Bool => TokenKind::Boolean,
        Basis::Int8 => TokenKind::CharLit,
        Basis::String => TokenKind::StrLit,
        _ => TokenKind::Integer,
    };
    let mut t = Token::new(kind, lit.text.clone(), line, 0);
    t.orig = NO_IDX;
    t
}

/// Verify that what appears to have the format of a macro is actually a
/// viable one. `at` sits on the opening `(` of the formal list; `limit`
/// is one past the directive. A proposal is a macro only if it has at
/// least one formal and at least one ersatz token referencing a formal;
/// otherwise it is demoted to a plain #define.
fn try_macro(
    prj: &Project,
    p: &[Token],
    at: usize,
    limit: usize,
    fid: FileId,
    def_start: u32,
) -> Option<MacroData> {
    let mut formals: indexmap::IndexMap<SmolStr, u16> = indexmap::IndexMap::new();
    let mut i = at + 1;
    loop {
        if kind_at(p, i) != TokenKind::Word {
            return None;
        }
        let ord = (formals.len() + 1) as u16;
        formals.insert(p[i].text.clone(), ord);
        i += 1;
        match kind_at(p, i) {
            TokenKind::ParenClose => break,
            TokenKind::Comma => i += 1,
            _ => return None,
        }
    }
    if formals.is_empty() {
        return None;
    }

    let mut ersatz: Vec<Token> = Vec::new();
    let mut uses_formal = false;
    let mut col = 1u32;
    let mut j = i + 1;
    while j < limit {
        let src = &p[j];
        if src.kind == TokenKind::Escape {
            j += 1;
            continue;
        }

        // Already-defined names expand out at definition time
        if src.kind == TokenKind::Word && !formals.contains_key(&src.text) {
            if let Some(&eid) = prj.defines.get(&src.text) {
                match &prj.model.entity(eid).data {
                    EntityData::Define(d) => {
                        for e in &d.ersatz {
                            let mut t = e.clone();
                            t.col = col;
                            col += 1;
                            ersatz.push(t);
                        }
                        j += 1;
                        continue;
                    }
                    EntityData::Macro(m) => {
                        for e in &m.ersatz {
                            let mut t = e.clone();
                            t.col = col;
                            col += 1;
                            ersatz.push(t);
                        }
                        j += 1;
                        continue;
                    }
                    EntityData::Literal(l) => {
                        let mut t = literal_token(l, src.line);
                        t.col = col;
                        col += 1;
                        ersatz.push(t);
                        j += 1;
                        continue;
                    }
                    _ => {}
                }
            }
        }

        let mut t = src.clone();
        t.orig = NO_IDX;
        if let Some(&ord) = formals.get(&t.text) {
            t.arg_no = ord;
            uses_formal = true;
        }
        t.col = col;
        col += 1;
        ersatz.push(t);
        j += 1;
    }

    if !uses_formal {
        return None;
    }
    Some(MacroData {
        formals,
        ersatz,
        def_file: Some(fid),
        def_span: (def_start, (limit - 1) as u32),
    })
}

/// Collect the comma-separated actual arguments of a macro call.
/// `at` sits on the opening `(`. Returns the arguments and the index
/// one past the closing `)`.
fn collect_actuals(p: &[Token], at: usize) -> Option<(Vec<Vec<Token>>, usize)> {
    if kind_at(p, at) != TokenKind::ParenOpen {
        return None;
    }
    let mut actuals: Vec<Vec<Token>> = vec![Vec::new()];
    let mut nest = 1u32;
    let mut j = at + 1;
    while j < p.len() {
        match p[j].kind {
            TokenKind::ParenOpen => {
                nest += 1;
                actuals.last_mut().unwrap().push(p[j].clone());
            }
            TokenKind::ParenClose => {
                nest -= 1;
                if nest == 0 {
                    return Some((actuals, j + 1));
                }
                actuals.last_mut().unwrap().push(p[j].clone());
            }
            TokenKind::Comma if nest == 1 => actuals.push(Vec::new()),
            TokenKind::Comment => {}
            _ => actuals.last_mut().unwrap().push(p[j].clone()),
        }
        j += 1;
    }
    None
}

/// Expand a token sequence, replacing every name that resolves to a
/// #define, literal or macro. The seen-set guards against expansion
/// cycles; a name already on the stack passes through verbatim.
fn expand_tokens(
    prj: &Project,
    toks: &[Token],
    seen: &mut FxHashSet<SmolStr>,
    out: &mut Vec<Token>,
    line: u32,
) {
    let mut i = 0usize;
    while i < toks.len() {
        let t = &toks[i];
        if t.kind == TokenKind::Word && !seen.contains(&t.text) {
            if let Some(&eid) = prj.defines.get(&t.text) {
                match &prj.model.entity(eid).data {
                    EntityData::Define(d) => {
                        seen.insert(t.text.clone());
                        let ersatz = d.ersatz.clone();
                        expand_tokens(prj, &ersatz, seen, out, line);
                        seen.remove(&t.text);
                        i += 1;
                        continue;
                    }
                    EntityData::Literal(l) => {
                        out.push(literal_token(l, line));
                        i += 1;
                        continue;
                    }
                    EntityData::Macro(m) => {
                        if let Some((actuals, after)) = collect_actuals(toks, i + 1) {
                            seen.insert(t.text.clone());
                            let m = m.clone();
                            splice_macro(prj, &m, &actuals, seen, out, line);
                            seen.remove(&t.text);
                            i = after;
                            continue;
                        }
                    }
                    _ => {}
                }
            }
        }
        let mut c = t.clone();
        c.line = line;
        c.col = 0;
        out.push(c);
        i += 1;
    }
}

/// Emit the ersatz of a macro with the actual arguments spliced in at
/// each formal-ordinal placeholder. Actuals are themselves expanded
/// recursively first.
fn splice_macro(
    prj: &Project,
    mac: &MacroData,
    actuals: &[Vec<Token>],
    seen: &mut FxHashSet<SmolStr>,
    out: &mut Vec<Token>,
    line: u32,
) {
    let expanded: Vec<Vec<Token>> = actuals
        .iter()
        .map(|a| {
            let mut v = Vec::new();
            expand_tokens(prj, a, seen, &mut v, line);
            v
        })
        .collect();

    for e in &mac.ersatz {
        if e.arg_no == 0 {
            let mut t = e.clone();
            t.line = line;
            t.col = 0;
            out.push(t);
        } else if let Some(arg) = expanded.get((e.arg_no - 1) as usize) {
            for a in arg {
                let mut t = a.clone();
                t.line = line;
                t.col = 0;
                out.push(t);
            }
        }
    }
}

/// Merge an included file into the including file's include set:
/// the direct edge plus the transitive closure.
fn incorporate(prj: &mut Project, fid: FileId, inc: FileId) {
    let inc_name = prj.file(inc).name.clone();
    let transitive: Vec<(SmolStr, FileId)> = prj
        .file(inc)
        .includes
        .iter()
        .map(|(n, &i)| (n.clone(), i))
        .collect();
    let f = prj.file_mut(fid);
    f.direct_inc.push(inc);
    if f.includes.contains_key(&inc_name) {
        tracing::debug!("already have {} in {}", inc_name, f.name);
    } else {
        f.includes.insert(inc_name, inc);
    }
    for (n, i) in transitive {
        f.includes.entry(n).or_insert(i);
    }
}

/// Link raw-stream comments to the active tokens adjacent to them.
/// Each comment belongs to at most one active token: a comment already
/// claimed as a following comment is never also claimed as a preceding
/// one.
fn associate_comments(p: &mut [Token], x: &mut [Token]) {
    for ct in 0..x.len() {
        if x[ct].col == 0 {
            continue;
        }
        let orig = x[ct].orig as usize;
        if orig + 1 < p.len() && p[orig + 1].is_comment() && p[orig + 1].com_post == NO_IDX {
            x[ct].com_post = (orig + 1) as u32;
            p[orig + 1].com_post = orig as u32;
        }
        if orig > 0
            && p[orig - 1].is_comment()
            && p[orig - 1].com_post == NO_IDX
            && p[orig - 1].com_pre == NO_IDX
        {
            x[ct].com_pre = (orig - 1) as u32;
            p[orig - 1].com_pre = orig as u32;
        }
    }
}

/// Pre-process the tokens of a file: evaluate directives, create
/// #define/literal/macro entities, expand their uses, and emit the
/// active stream. Recursively pre-processes every included file first.
pub fn preprocess(prj: &mut Project, fid: FileId, depth: u32) -> Result<(), ErrorCode> {
    if prj.file(fid).stage1 {
        return Ok(());
    }
    prj.file_mut(fid).stage1 = true;

    let fname = prj.file(fid).name.clone();
    if depth > 10 {
        prj.diags.fatal(
            "preprocess",
            ErrorCode::Corrupt,
            &fname,
            0,
            0,
            "include recursion limit reached",
        );
        return Err(ErrorCode::Corrupt);
    }
    tracing::debug!("preprocessing {} (level {})", fname, depth);

    let mut p = std::mem::take(&mut prj.file_mut(fid).raw);
    let mut x: Vec<Token> = Vec::with_capacity(p.len());
    let mut cd: Vec<bool> = vec![false];
    let mut guard = LoopGuard::new();
    let mut rc: Result<(), ErrorCode> = Ok(());

    let mut ct = 0usize;
    while ct < p.len() {
        if guard.check(ct).is_err() {
            prj.diags.fatal(
                "preprocess",
                ErrorCode::Corrupt,
                &fname,
                p[ct].line,
                p[ct].col,
                "loop stop condition",
            );
            rc = Err(ErrorCode::Corrupt);
            break;
        }

        if p[ct].kind == TokenKind::Comment {
            ct += 1;
            continue;
        }

        if p[ct].kind.is_directive() {
            let limit = directive_limit(&p, ct);
            let line = p[ct].line;
            let col = p[ct].col;

            if *cd.last().unwrap() {
                // Inside excluded code only the nesting directives matter
                for t in p[ct..limit].iter_mut() {
                    t.excl = cd.len() as u16;
                }
                match p[ct].kind {
                    TokenKind::HashIf | TokenKind::HashIfdef | TokenKind::HashIfndef => {
                        cd.push(true)
                    }
                    TokenKind::HashEndif => {
                        if cd.len() > 1 {
                            cd.pop();
                        }
                    }
                    TokenKind::HashElse | TokenKind::HashElseIf => {
                        let parent = cd.len() >= 2 && cd[cd.len() - 2];
                        let last = cd.last_mut().unwrap();
                        *last = parent;
                    }
                    _ => {}
                }
                ct = limit;
                continue;
            }

            match p[ct].kind {
                TokenKind::HashInclude => {
                    if kind_at(&p, ct + 1) == TokenKind::StrLit {
                        let name = p[ct + 1].text.clone();
                        if name.is_empty() {
                            prj.diags.fatal(
                                "preprocess",
                                ErrorCode::Syntax,
                                &fname,
                                line,
                                col,
                                "#include but no filename",
                            );
                            rc = Err(ErrorCode::Syntax);
                            break;
                        }
                        match prj.locate_file(&name) {
                            Some(inc) => {
                                if let Err(e) = prj.activate(inc).and_then(|_| preprocess(prj, inc, depth + 1)) {
                                    prj.diags.fatal(
                                        "preprocess",
                                        e,
                                        &fname,
                                        line,
                                        col,
                                        format!("failed to preprocess include {name}"),
                                    );
                                    rc = Err(e);
                                    break;
                                }
                                incorporate(prj, fid, inc);
                            }
                            None => {
                                prj.diags.fatal(
                                    "preprocess",
                                    ErrorCode::NotFound,
                                    &fname,
                                    line,
                                    col,
                                    format!("no such file as '{name}'"),
                                );
                                rc = Err(ErrorCode::NotFound);
                                break;
                            }
                        }
                    }
                    // Angle-bracket system includes are not followed
                    ct = limit;
                }

                TokenKind::HashIfdef | TokenKind::HashIfndef => {
                    if kind_at(&p, ct + 1) != TokenKind::Word {
                        prj.diags.error(
                            "preprocess",
                            ErrorCode::Syntax,
                            &fname,
                            line,
                            col,
                            format!(
                                "directive {} must be followed by a word",
                                p[ct].kind.name()
                            ),
                        );
                        rc = Err(ErrorCode::Syntax);
                        break;
                    }
                    let defined =
                        lookup_token(&prj.model, &p, &LookupCtx::default(), ct + 1, false).is_some();
                    let excl = if p[ct].kind == TokenKind::HashIfdef {
                        !defined
                    } else {
                        defined
                    };
                    cd.push(excl);
                    ct = limit;
                }

                TokenKind::HashIf => {
                    // Only the trivial forms: `#if 0` or `#if <name>`
                    match kind_at(&p, ct + 1) {
                        TokenKind::Integer if p[ct + 1].text == "0" => {
                            cd.push(true);
                            ct = limit;
                        }
                        TokenKind::Word => {
                            cd.push(false);
                            ct = limit;
                        }
                        _ => {
                            prj.diags.fatal(
                                "preprocess",
                                ErrorCode::Syntax,
                                &fname,
                                line,
                                col,
                                "#if must be followed by a trivial expression",
                            );
                            rc = Err(ErrorCode::Syntax);
                            break;
                        }
                    }
                }

                TokenKind::HashElse => {
                    let parent = cd.len() >= 2 && cd[cd.len() - 2];
                    let last = cd.last_mut().unwrap();
                    *last = parent || !*last;
                    ct = limit;
                }

                TokenKind::HashElseIf => {
                    if kind_at(&p, ct + 1) != TokenKind::Word {
                        prj.diags.error(
                            "preprocess",
                            ErrorCode::Syntax,
                            &fname,
                            line,
                            col,
                            "#elseif must be followed by an expression",
                        );
                        rc = Err(ErrorCode::Syntax);
                        break;
                    }
                    ct = limit;
                }

                TokenKind::HashEndif => {
                    if cd.len() > 1 {
                        cd.pop();
                    }
                    ct = limit;
                }

                TokenKind::HashDefine => {
                    match proc_define(prj, &mut p, ct, limit, fid, &fname) {
                        Ok(()) => ct = limit,
                        Err(e) => {
                            rc = Err(e);
                            break;
                        }
                    }
                }

                TokenKind::HashUndef => {
                    if kind_at(&p, ct + 1) == TokenKind::Word {
                        prj.defines.remove(&p[ct + 1].text);
                    }
                    ct = limit;
                }

                _ => {
                    prj.diags.warning(
                        "preprocess",
                        &fname,
                        line,
                        col,
                        format!("unknown compiler directive {}", p[ct].show()),
                    );
                    ct = limit;
                }
            }
            continue;
        }

        if *cd.last().unwrap() {
            p[ct].excl = cd.len() as u16;
            ct += 1;
            continue;
        }

        // Included code, not a directive: expand names that resolve to
        // a #define entity, copy everything else.
        if p[ct].kind == TokenKind::Word {
            if let Some(&eid) = prj.defines.get(&p[ct].text) {
                let cur_line = p[ct].line;
                match prj.model.entity(eid).kind() {
                    EntityKind::Define => {
                        let EntityData::Define(d) = &prj.model.entity(eid).data else {
                            unreachable!()
                        };
                        let ersatz = d.ersatz.clone();
                        let mut seen = FxHashSet::default();
                        seen.insert(p[ct].text.clone());
                        expand_tokens(prj, &ersatz, &mut seen, &mut x, cur_line);
                        ct += 1;
                        continue;
                    }
                    EntityKind::Literal => {
                        let EntityData::Literal(l) = &prj.model.entity(eid).data else {
                            unreachable!()
                        };
                        x.push(literal_token(l, cur_line));
                        ct += 1;
                        continue;
                    }
                    EntityKind::Macro => {
                        if kind_at(&p, ct + 1) != TokenKind::ParenOpen {
                            prj.diags.error(
                                "preprocess",
                                ErrorCode::Syntax,
                                &fname,
                                cur_line,
                                p[ct].col,
                                "expected start of macro (arg) block",
                            );
                            rc = Err(ErrorCode::Syntax);
                            break;
                        }
                        let Some((actuals, after)) = collect_actuals(&p, ct + 1) else {
                            prj.diags.error(
                                "preprocess",
                                ErrorCode::Syntax,
                                &fname,
                                cur_line,
                                p[ct].col,
                                "unterminated macro argument block",
                            );
                            rc = Err(ErrorCode::Syntax);
                            break;
                        };
                        if actuals.iter().all(|a| a.is_empty()) {
                            prj.diags.error(
                                "preprocess",
                                ErrorCode::Syntax,
                                &fname,
                                cur_line,
                                p[ct].col,
                                "empty macro argument",
                            );
                            rc = Err(ErrorCode::Syntax);
                            break;
                        }
                        let EntityData::Macro(m) = &prj.model.entity(eid).data else {
                            unreachable!()
                        };
                        let m = m.clone();
                        let mut seen = FxHashSet::default();
                        seen.insert(p[ct].text.clone());
                        splice_macro(prj, &m, &actuals, &mut seen, &mut x, cur_line);
                        ct = after;
                        continue;
                    }
                    _ => {}
                }
            }
        }

        x.push(p[ct].clone());
        ct += 1;
    }

    if rc.is_ok() {
        rc = matcher::match_tokens(&mut x, &fname, &mut prj.diags);
    }
    if rc.is_ok() {
        associate_comments(&mut p, &mut x);
        tracing::debug!(
            "completed {}: had {} tokens, now {} tokens",
            fname,
            p.len(),
            x.len()
        );
    } else {
        tracing::error!("preprocess failed for {}", fname);
        x.clear();
    }

    let f = prj.file_mut(fid);
    f.raw = p;
    f.active = x;
    rc
}

/// Classify and create the entity a #define statement declares: a
/// plain definition, a named literal, or a macro.
fn proc_define(
    prj: &mut Project,
    p: &mut [Token],
    ct: usize,
    limit: usize,
    fid: FileId,
    fname: &str,
) -> Result<(), ErrorCode> {
    let mut at = ct + 1;
    let nk = kind_at(p, at);
    if !(nk == TokenKind::Word || nk.is_keyword() || nk.is_command()) {
        prj.diags.error(
            "proc_define",
            ErrorCode::Syntax,
            fname,
            p[ct].line,
            p[ct].col,
            "a #define must be followed by an alphanumeric name",
        );
        return Err(ErrorCode::Syntax);
    }
    let name = p[at].text.clone();

    if prj.defines.contains_key(&name) {
        prj.diags.warning(
            "proc_define",
            fname,
            p[at].line,
            p[at].col,
            format!("we already have {name} defined"),
        );
    }

    let comp = prj.file(fid).comp;
    let base = EntityBase {
        name: name.clone(),
        fqname: name.clone(),
        access: Access::Global,
        comp,
        ..Default::default()
    };
    at += 1;

    // Trailing comment on the directive line becomes the description
    let desc = if limit < p.len()
        && p[limit].kind == TokenKind::Comment
        && p[limit].line == p[limit - 1].line
    {
        p[limit].flags |= COM_FLAG_PROC;
        Some(p[limit].text.to_string())
    } else {
        None
    };

    let data = if at >= limit {
        // No ersatz: exists only to be tested by #ifdef
        EntityData::Define(DefineData {
            ersatz: Vec::new(),
            def_file: Some(fid),
            def_span: (ct as u32, (limit - 1) as u32),
        })
    } else if kind_at(p, at) == TokenKind::ParenOpen && kind_at(p, at + 1) != TokenKind::ParenClose
    {
        match try_macro(prj, p, at, limit, fid, ct as u32) {
            Some(mac) => EntityData::Macro(mac),
            None => EntityData::Define(define_body(p, at, limit, fid, ct)),
        }
    } else if at + 1 == limit && p[at].kind.is_literal() {
        let (basis, value) = literal_value(&p[at]);
        EntityData::Literal(LiteralData {
            basis,
            text: p[at].text.clone(),
            value,
            def_file: Some(fid),
        })
    } else {
        EntityData::Define(define_body(p, at, limit, fid, ct))
    };

    let kind_str = match &data {
        EntityData::Macro(m) => format!("macro ({} args)", m.formals.len()),
        EntityData::Literal(_) => "literal".to_string(),
        _ => "#define".to_string(),
    };

    let mut diags = std::mem::take(&mut prj.diags);
    let added = prj
        .model
        .add_entity(prj.model.root, base, data, &mut diags, fname, "proc_define");
    prj.diags = diags;

    match added {
        Ok(id) => {
            if let Some(d) = desc {
                prj.model.entity_mut(id).base.desc = d;
            }
            prj.defines.insert(name.clone(), id);
            tracing::debug!("added {kind_str} of {name}");
        }
        Err(_) => {
            // Name taken by a different kind of entity: report and move on
            prj.diags.surface("proc_define", fname);
        }
    }
    Ok(())
}

fn define_body(p: &[Token], at: usize, limit: usize, fid: FileId, ct: usize) -> DefineData {
    let ersatz: Vec<Token> = p[at..limit]
        .iter()
        .filter(|t| t.kind != TokenKind::Escape && t.kind != TokenKind::Comment)
        .map(|t| {
            let mut t = t.clone();
            t.orig = NO_IDX;
            t
        })
        .collect();
    DefineData {
        ersatz,
        def_file: Some(fid),
        def_span: (ct as u32, (limit - 1) as u32),
    }
}

