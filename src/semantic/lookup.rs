//! The lookup engine.
//!
//! Resolves an identifier token series to an entity by walking scopes
//! in precedence order: function-local (with parent chain), file
//! static, host class (own table, then parent-nesting class, then base
//! class chain), each namespace made visible by `using`, and finally
//! the root. The first match wins.
//!
//! Multi-word fundamental types (`unsigned long long int` and friends)
//! are recognized inline before any table is consulted, and operator
//! function names (`operator[]`, `operator==`) are assembled into a
//! single name.

use smol_str::SmolStr;

use crate::token::{Token, TokenKind, kind_at, text_at};

use super::entity::{EntityData, EntityId, EntityKind};
use super::model::Model;
use super::table::ScopeId;

/// The scopes a lookup may consult besides the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupCtx {
    /// Host class or union
    pub host: Option<EntityId>,
    /// Function body scope (innermost block)
    pub func: Option<ScopeId>,
    /// File-static scope
    pub file: Option<ScopeId>,
}

/// Recognize the multi-word fundamental C++ types. Returns the type id
/// and the index one past the series.
fn lookup_primitive(model: &Model, toks: &[Token], start: usize) -> Option<(EntityId, usize)> {
    let std = &model.std;
    let mut ct = start;

    if kind_at(toks, ct) == TokenKind::Void {
        return Some((std.void, ct + 1));
    }

    let unsigned = kind_at(toks, ct) == TokenKind::Unsigned;
    if unsigned {
        ct += 1;
    }

    let found = match kind_at(toks, ct) {
        TokenKind::Char => {
            ct += 1;
            if unsigned { std.uchar } else { std.char_ }
        }
        TokenKind::Short => {
            ct += 1;
            if kind_at(toks, ct) == TokenKind::Int {
                ct += 1;
            }
            if unsigned { std.ushort } else { std.short_ }
        }
        TokenKind::Int => {
            ct += 1;
            if unsigned { std.uint } else { std.int_ }
        }
        TokenKind::Long => {
            // long long int, long long, long int, or just long
            if kind_at(toks, ct + 1) == TokenKind::Long {
                ct += 2;
                if kind_at(toks, ct) == TokenKind::Int {
                    ct += 1;
                }
                if unsigned { std.ulonglong } else { std.longlong }
            } else if kind_at(toks, ct + 1) == TokenKind::Int {
                ct += 2;
                if unsigned { std.ulong } else { std.long_ }
            } else {
                ct += 1;
                if unsigned { std.ulong } else { std.long_ }
            }
        }
        _ => {
            if unsigned {
                // Bare `unsigned` is unsigned int
                return Some((std.uint, ct));
            }
            return None;
        }
    };
    Some((found, ct))
}

/// Assemble the entity name at `start`: an identifier, or an operator
/// function name.
fn entity_name(toks: &[Token], start: usize) -> Option<(SmolStr, usize)> {
    match kind_at(toks, start) {
        TokenKind::KwOperator => {
            if kind_at(toks, start + 1) == TokenKind::BracketOpen
                && kind_at(toks, start + 2) == TokenKind::BracketClose
            {
                return Some((SmolStr::new("operator[]"), start + 3));
            }
            let next = kind_at(toks, start + 1);
            if next.is_operator() {
                let name = format!("operator{}", text_at(toks, start + 1));
                return Some((SmolStr::new(name), start + 2));
            }
            None
        }
        TokenKind::Word => {
            let text = text_at(toks, start);
            if text.is_empty() {
                None
            } else {
                Some((SmolStr::new(text), start + 1))
            }
        }
        _ => None,
    }
}

fn search_scope_chain(model: &Model, mut scope: Option<ScopeId>, name: &str) -> Option<EntityId> {
    while let Some(s) = scope {
        if let Some(id) = model.scope(s).get(name) {
            return Some(id);
        }
        scope = model.scope(s).parent;
    }
    None
}

/// Search the host class: its own table, then the parent-nesting class,
/// then the base class chain. The class's own name resolves to the
/// class itself.
fn search_host(model: &Model, host: EntityId, name: &str) -> Option<EntityId> {
    let mut klass = Some(host);
    let mut scope = model.entity(host).own_scope();

    while let Some(s) = scope {
        if model.scope(s).name == name {
            if let Some(h) = model.scope(s).host {
                return Some(h);
            }
        }
        if let Some(id) = model.scope(s).get(name) {
            return Some(id);
        }

        klass = klass.and_then(|k| match &model.entity(k).data {
            EntityData::Class(c) => c.parent.or(c.base),
            EntityData::Union(u) => u.host,
            _ => None,
        });
        scope = match klass {
            Some(k) => model.entity(k).own_scope(),
            None => model.scope(s).parent,
        };
    }
    None
}

/// Resolve a member name against a class: its own table, the
/// parent-nesting chain and the base class chain.
pub fn lookup_member(model: &Model, host: EntityId, name: &str) -> Option<EntityId> {
    search_host(model, host, name)
}

/// Resolve the token series at `start` to an entity.
///
/// With `series` set, a found namespace or class followed by `::`
/// descends into that entity's table and continues. Returns the entity
/// and the index one past the consumed series.
pub fn lookup_token(
    model: &Model,
    toks: &[Token],
    ctx: &LookupCtx,
    start: usize,
    series: bool,
) -> Option<(EntityId, usize)> {
    if kind_at(toks, start).is_vtype() {
        return lookup_primitive(model, toks, start);
    }

    let (name, mut end) = entity_name(toks, start)?;

    let mut found = search_scope_chain(model, ctx.func, &name);

    if found.is_none() {
        if let Some(ft) = ctx.file {
            found = model.scope(ft).get(&name);
        }
    }

    if found.is_none() {
        if let Some(host) = ctx.host {
            found = search_host(model, host, &name);
        }
    }

    if found.is_none() {
        for &ns in &model.using {
            if let Some(t) = model.entity(ns).own_scope() {
                if let Some(id) = model.scope(t).get(&name) {
                    found = Some(id);
                    break;
                }
            }
        }
    }

    if found.is_none() {
        found = model.scope(model.root).get(&name);
    }

    let mut found = found?;

    if series {
        while kind_at(toks, end) == TokenKind::Scope {
            let table = match model.entity(found).kind() {
                EntityKind::Namespace | EntityKind::Class => model.entity(found).own_scope(),
                _ => None,
            };
            let Some(table) = table else { break };
            let next = text_at(toks, end + 1);
            if next.is_empty() {
                break;
            }
            match model.scope(table).get(next) {
                Some(id) => {
                    found = id;
                    end += 2;
                }
                None => break,
            }
        }
    }

    Some((found, end))
}

/// Look up an entity named as a string, with `::` scoping operators
/// allowed. Used by the comment processors, where a whole comment is a
/// single token.
pub fn lookup_string(model: &Model, name: &str, host: Option<EntityId>) -> Option<EntityId> {
    let parts: Vec<&str> = name.split("::").collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let mut toks: Vec<Token> = Vec::with_capacity(parts.len() * 2);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            toks.push(Token::new(TokenKind::Scope, "::", 0, 0));
        }
        toks.push(Token::new(TokenKind::Word, *part, 0, 0));
    }

    let ctx = LookupCtx {
        host,
        ..Default::default()
    };
    lookup_token(model, &toks, &ctx, 0, true).map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::DiagSink;
    use crate::semantic::entity::{Access, EntityBase};

    fn word(s: &str) -> Token {
        Token::new(TokenKind::Word, s, 1, 1)
    }

    fn kw(kind: TokenKind, s: &str) -> Token {
        Token::new(kind, s, 1, 1)
    }

    #[test]
    fn test_multiword_primitives() {
        let model = Model::new();
        let ctx = LookupCtx::default();

        let toks = vec![
            kw(TokenKind::Unsigned, "unsigned"),
            kw(TokenKind::Long, "long"),
            kw(TokenKind::Long, "long"),
            kw(TokenKind::Int, "int"),
            word("x"),
        ];
        let (id, end) = lookup_token(&model, &toks, &ctx, 0, false).unwrap();
        assert_eq!(id, model.std.ulonglong);
        assert_eq!(end, 4);

        let toks = vec![kw(TokenKind::Long, "long"), kw(TokenKind::Int, "int")];
        let (id, end) = lookup_token(&model, &toks, &ctx, 0, false).unwrap();
        assert_eq!(id, model.std.long_);
        assert_eq!(end, 2);
    }

    #[test]
    fn test_root_lookup_by_word() {
        let model = Model::new();
        let ctx = LookupCtx::default();
        let toks = vec![word("double")];
        let (id, end) = lookup_token(&model, &toks, &ctx, 0, false).unwrap();
        assert_eq!(id, model.std.double_);
        assert_eq!(end, 1);
    }

    #[test]
    fn test_scope_series_descends_namespace() {
        let mut model = Model::new();
        let mut diags = DiagSink::new();
        let table = model.alloc_scope(None, "net", Some(model.root));
        let ns = model
            .add_entity(
                model.root,
                EntityBase {
                    name: "net".into(),
                    fqname: "net".into(),
                    access: Access::Global,
                    ..Default::default()
                },
                EntityData::Namespace { table },
                &mut diags,
                "t.h",
                "test",
            )
            .unwrap();
        let table2 = model.alloc_scope(None, "Socket", None);
        let class = model
            .add_entity(
                table,
                EntityBase {
                    name: "Socket".into(),
                    fqname: "net::Socket".into(),
                    access: Access::Global,
                    ..Default::default()
                },
                EntityData::Class(crate::semantic::ClassData {
                    table: table2,
                    ..Default::default()
                }),
                &mut diags,
                "t.h",
                "test",
            )
            .unwrap();

        let toks = vec![word("net"), kw(TokenKind::Scope, "::"), word("Socket")];
        let ctx = LookupCtx::default();
        let (id, end) = lookup_token(&model, &toks, &ctx, 0, true).unwrap();
        assert_eq!(id, class);
        assert_eq!(end, 3);

        // Without series, only the namespace resolves
        let (id, end) = lookup_token(&model, &toks, &ctx, 0, false).unwrap();
        assert_eq!(id, ns);
        assert_eq!(end, 1);

        assert_eq!(lookup_string(&model, "net::Socket", None), Some(class));
    }

    #[test]
    fn test_operator_name_assembly() {
        let model = Model::new();
        let toks = vec![
            kw(TokenKind::KwOperator, "operator"),
            kw(TokenKind::TestEq, "=="),
        ];
        let (name, end) = super::entity_name(&toks, 0).unwrap();
        assert_eq!(name, "operator==");
        assert_eq!(end, 2);

        let toks = vec![
            kw(TokenKind::KwOperator, "operator"),
            kw(TokenKind::BracketOpen, "["),
            kw(TokenKind::BracketClose, "]"),
        ];
        let (name, end) = super::entity_name(&toks, 0).unwrap();
        assert_eq!(name, "operator[]");
        assert_eq!(end, 3);
        let _ = model;
    }
}
