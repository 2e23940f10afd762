//! Structured comment processors.
//!
//! Comments written to the documentation convention carry sections:
//! `Category:` on its own line, an `Argument:`/`Arguments:` block with
//! one `n)` entry per argument, a `Returns:` block whose entries must
//! follow a rule table keyed to the function's return type, and free
//! description text. External comments (standalone, outside any entity
//! body) name their subject with a leading directive such as
//! `Function:` or `Synopsis:`.
//!
//! Convention violations are warnings; they never halt the parse.

use smol_str::SmolStr;

use crate::base::FileId;
use crate::parser::Parser;
use crate::project::{Project, Synopsis};
use crate::semantic::{
    Basis, EntityData, EntityId, EntityKind, SetData, TyAttr, lookup_string,
};
use crate::token::COM_FLAG_PROC;

/// The sections recognized in a structured comment
#[derive(Debug, Default)]
struct Sections {
    category: Option<String>,
    args: Option<Vec<(SmolStr, String)>>,
    rets: Option<Vec<(SmolStr, String)>>,
    desc: String,
    /// `Func:` membership lines of a function set
    funcs: Vec<String>,
}

/// Take the leading `n)` ordinal off an argument entry line
fn split_ordinal(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(')').map(|r| r.trim_start())
}

/// Split an entry into its keyed first word and the remaining text
fn split_entry(line: &str) -> (SmolStr, String) {
    // Multi-word and symbolic keys come first
    for key in ["Const reference", "<0", "0+", "+1", "-1", ">0"] {
        if let Some(rest) = line.strip_prefix(key) {
            return (SmolStr::new(key), rest.trim().to_string());
        }
    }
    match line.split_once(char::is_whitespace) {
        Some((k, rest)) => (SmolStr::new(k.trim_end_matches(':')), rest.trim().to_string()),
        None => (SmolStr::new(line.trim_end_matches(':')), String::new()),
    }
}

/// Parse the structured sections out of a comment body.
fn parse_sections(text: &str) -> Sections {
    let mut out = Sections::default();
    let lines: Vec<&str> = text.lines().collect();
    let mut desc: Vec<&str> = Vec::new();

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i].trim();

        if let Some(rest) = line.strip_prefix("Category:") {
            out.category = Some(rest.trim().to_string());
            i += 1;
            continue;
        }

        if let Some(rest) = line
            .strip_prefix("Arguments:")
            .or_else(|| line.strip_prefix("Argument:"))
        {
            let mut entries: Vec<(SmolStr, String)> = Vec::new();
            let rest = rest.trim();
            if rest.eq_ignore_ascii_case("none") || rest.starts_with("None") {
                out.args = Some(entries);
                i += 1;
                continue;
            }
            if !rest.is_empty() {
                // Singular form: `Argument: argname description`
                entries.push(split_entry(rest));
            }
            i += 1;
            while i < lines.len() {
                let l = lines[i].trim();
                if l.is_empty() || l.starts_with("Returns:") || l.starts_with("Category:") {
                    break;
                }
                match split_ordinal(l) {
                    Some(entry) => entries.push(split_entry(entry)),
                    None => {
                        // Continuation belongs to the current argument
                        if let Some(last) = entries.last_mut() {
                            if !last.1.is_empty() {
                                last.1.push(' ');
                            }
                            last.1.push_str(l);
                        }
                    }
                }
                i += 1;
            }
            out.args = Some(entries);
            continue;
        }

        if let Some(rest) = line.strip_prefix("Returns:") {
            let mut entries: Vec<(SmolStr, String)> = Vec::new();
            let rest = rest.trim();
            if rest.starts_with("None") {
                out.rets = Some(entries);
                i += 1;
                continue;
            }
            if !rest.is_empty() {
                entries.push(split_entry(rest));
            }
            i += 1;
            while i < lines.len() {
                let l = lines[i].trim();
                if l.is_empty() || l.starts_with("Category:") || l.starts_with("Argument") {
                    break;
                }
                entries.push(split_entry(l));
                i += 1;
            }
            out.rets = Some(entries);
            continue;
        }

        if let Some(rest) = line.strip_prefix("Func:") {
            out.funcs.push(rest.trim().to_string());
            i += 1;
            continue;
        }

        desc.push(lines[i]);
        i += 1;
    }

    out.desc = desc.join("\n").trim().to_string();
    out
}

/// Classification of a return typlex against the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetClass {
    Void,
    Bool,
    Pointer,
    Reference,
    Numeric,
    ErrorEnum,
    Class,
    Other,
}

fn classify_return(prj: &Project, func: EntityId) -> RetClass {
    let Some(f) = prj.model.entity(func).as_func() else {
        return RetClass::Other;
    };
    let tpx = &f.tpx;
    if tpx.indir > 0 {
        return RetClass::Pointer;
    }
    if tpx.is_reference() || tpx.attrs.has(TyAttr::REFERENCE) {
        return RetClass::Reference;
    }
    match tpx.basis(&prj.model) {
        Basis::Void => RetClass::Void,
        Basis::Bool => RetClass::Bool,
        Basis::Enum => RetClass::ErrorEnum,
        Basis::Class | Basis::Union => RetClass::Class,
        b if b.is_numeric() => RetClass::Numeric,
        _ => RetClass::Other,
    }
}

/// Enforce the rule table over the parsed returns entries. Violations
/// are warnings.
fn validate_returns(prj: &mut Project, fid: FileId, func: EntityId, entries: &[(SmolStr, String)]) {
    let class = classify_return(prj, func);
    let func_name = prj.model.entity(func).base.fqname.clone();
    let fname = prj.file(fid).name.clone();

    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    let need: Option<&str> = match class {
        RetClass::Void => {
            (!keys.is_empty()).then_some("be a single entry starting with 'None' for void")
        }
        RetClass::Bool => (!keys.contains(&"True") || !keys.contains(&"False"))
            .then_some("include entries starting with 'True' and 'False'"),
        RetClass::Pointer => (!keys.contains(&"Pointer") || !keys.contains(&"NULL"))
            .then_some("include entries starting with 'Pointer' and 'NULL'"),
        RetClass::Reference => {
            let ok = !keys.is_empty()
                && keys
                    .iter()
                    .all(|k| *k == "Reference" || *k == "Const reference");
            (!ok).then_some("be a single entry starting with 'Reference' or 'Const reference'")
        }
        RetClass::Numeric => {
            let single_ok = keys.len() == 1
                && matches!(keys[0], "Number" | "Total" | "Value" | "Length" | "Address");
            let multi_ok = !keys.is_empty()
                && keys
                    .iter()
                    .all(|k| matches!(*k, "<0" | "-1" | ">0" | "0+" | "+1" | "1" | "0"));
            (!single_ok && !multi_ok).then_some(
                "start with <0, -1, >0, 0+, +1, 1 or 0, or be a single Number/Total/Value/Length/Address entry",
            )
        }
        RetClass::ErrorEnum => {
            let ok = !keys.is_empty() && keys.iter().all(|k| k.starts_with("E_") || *k == "Enum");
            (!ok).then_some("start with 'E_' or 'Enum' for an error enum")
        }
        RetClass::Class => {
            let ok = keys.len() == 1 && keys[0] == "Instance";
            (!ok).then_some("be a single entry starting with 'Instance'")
        }
        RetClass::Other => None,
    };

    if let Some(need) = need {
        prj.diags.warning(
            "proc_ret_desc",
            &fname,
            0,
            0,
            format!("function {func_name}: returns entries must {need}"),
        );
    }
}

fn apply_func_sections(prj: &mut Project, fid: FileId, func: EntityId, s: Sections) {
    let fname = prj.file(fid).name.clone();

    if let Some(cat) = &s.category {
        if prj.model.entity(func).base.category.is_empty() {
            prj.model.entity_mut(func).base.category = SmolStr::new(cat.as_str());
        } else {
            let name = prj.model.entity(func).base.name.clone();
            prj.diags.warning(
                "proc_comment_func",
                &fname,
                0,
                0,
                format!("function {name} already has a category"),
            );
        }
    }
    if !s.desc.is_empty() {
        prj.model.entity_mut(func).base.desc = s.desc.clone();
    }

    if let Some(args) = s.args {
        let argc = prj
            .model
            .entity(func)
            .as_func()
            .map(|f| f.args.len())
            .unwrap_or(0);
        if !args.is_empty() && args.len() != argc {
            let name = prj.model.entity(func).base.fqname.clone();
            prj.diags.warning(
                "proc_arg_desc",
                &fname,
                0,
                0,
                format!(
                    "function {name}: {} argument descriptions for {argc} arguments",
                    args.len()
                ),
            );
        }
        if let Some(f) = prj.model.entity_mut(func).as_func_mut() {
            f.arg_desc = args;
        }
    }

    if let Some(rets) = s.rets {
        validate_returns(prj, fid, func, &rets);
        if let Some(f) = prj.model.entity_mut(func).as_func_mut() {
            f.ret_desc = rets;
        }
    }
}

/// Internal function comment: the first comment inside the `{` of a
/// function body.
pub fn proc_comment_func(p: &mut Parser<'_>, func: EntityId, text: &str) {
    let s = parse_sections(text);
    let fid = p.fid;
    apply_func_sections(p.prj, fid, func, s);
}

/// Internal class comment: `Category:` plus the class description.
pub fn proc_comment_class(p: &mut Parser<'_>, class: EntityId, text: &str) {
    let s = parse_sections(text);
    let ent = p.prj.model.entity_mut(class);
    if let Some(cat) = s.category {
        ent.base.category = SmolStr::new(cat);
    }
    if !s.desc.is_empty() {
        ent.base.desc = s.desc;
    }
}

/// Internal enum comment, same sections as a class comment.
pub fn proc_comment_enum(p: &mut Parser<'_>, enum_id: EntityId, text: &str) {
    proc_comment_class(p, enum_id, text)
}

// ---------------------------------------------------------------------
// External comments
// ---------------------------------------------------------------------

/// Offer every unconsumed top-level comment of a file to the external
/// comment processor, in order.
pub fn process_unattached(prj: &mut Project, fid: FileId) {
    let count = prj.file(fid).raw.len();
    for i in 0..count {
        let candidate = {
            let t = &prj.file(fid).raw[i];
            t.is_comment() && t.level == 0 && !t.comment_processed()
        };
        if !candidate {
            continue;
        }
        let text = prj.file(fid).raw[i].text.to_string();
        if proc_ext_comment(prj, fid, &text) {
            prj.file_mut(fid).raw[i].flags |= COM_FLAG_PROC;
        }
    }
}

/// Subjects an external comment may address
const DIRECTIVES: &[&str] = &[
    "Class:",
    "Struct:",
    "Union:",
    "Function:",
    "FnGrp:",
    "FnSet:",
    "Enum:",
    "Synopsis:",
    "ClassGroup:",
];

/// Process one standalone comment. The first non-blank line must start
/// with a subject directive; the following tokens name the entity and
/// the body supplies its description. Returns whether the comment was
/// consumed.
pub fn proc_ext_comment(prj: &mut Project, fid: FileId, text: &str) -> bool {
    let mut lines = text.lines();
    let first = loop {
        match lines.next() {
            Some(l) if l.trim().is_empty() => continue,
            Some(l) => break l.trim().to_string(),
            None => return false,
        }
    };

    let Some(directive) = DIRECTIVES.iter().find(|d| first.starts_with(**d)) else {
        return false;
    };
    let subject = first[directive.len()..].trim().to_string();
    let body: String = lines.collect::<Vec<&str>>().join("\n");
    let s = parse_sections(&body);

    match *directive {
        "Class:" | "Struct:" | "Union:" | "Enum:" => {
            let Some(ent) = lookup_string(&prj.model, &subject, None) else {
                let fname = prj.file(fid).name.clone();
                prj.diags.warning(
                    "proc_ext_comment",
                    &fname,
                    0,
                    0,
                    format!("comment subject '{subject}' not found"),
                );
                return true;
            };
            let e = prj.model.entity_mut(ent);
            if let Some(cat) = s.category {
                e.base.category = SmolStr::new(cat);
            }
            if !s.desc.is_empty() {
                e.base.desc = s.desc;
            }
            true
        }

        "Function:" | "FnGrp:" => {
            apply_group_comment(prj, fid, &subject, s);
            true
        }


        "FnSet:" => {
            proc_fnset(prj, fid, &subject, s);
            true
        }

        "Synopsis:" => {
            proc_synopsis(prj, fid, &subject, &body);
            true
        }

        "ClassGroup:" => {
            // Each Func:-style `Class:` line was captured as desc text;
            // the group name becomes the category of the named classes
            for line in body.lines() {
                if let Some(rest) = line.trim().strip_prefix("Class:") {
                    if let Some(c) = lookup_string(&prj.model, rest.trim(), None) {
                        prj.model.entity_mut(c).base.category = SmolStr::new(subject.as_str());
                    }
                }
            }
            true
        }

        _ => false,
    }
}

/// Apply an external function comment to the named group: the group
/// carries the descriptions as defaults for members lacking their own.
fn apply_group_comment(prj: &mut Project, fid: FileId, subject: &str, s: Sections) {
    // The subject may be a bare name or name(args)
    let name = subject.split('(').next().unwrap_or(subject).trim();
    let Some(ent) = lookup_string(&prj.model, name, None) else {
        let fname = prj.file(fid).name.clone();
        prj.diags.warning(
            "proc_ext_comment",
            &fname,
            0,
            0,
            format!("function '{name}' not found"),
        );
        return;
    };

    let (group, members): (Option<EntityId>, Vec<EntityId>) =
        match prj.model.entity(ent).kind() {
            EntityKind::FuncGroup => {
                let EntityData::FuncGroup(g) = &prj.model.entity(ent).data else {
                    unreachable!()
                };
                (Some(ent), g.funcs.clone())
            }
            EntityKind::Function => (None, vec![ent]),
            _ => (None, Vec::new()),
        };

    if let Some(g) = group {
        let e = prj.model.entity_mut(g);
        if let Some(cat) = &s.category {
            e.base.category = SmolStr::new(cat.as_str());
        }
        if !s.desc.is_empty() {
            e.base.desc = s.desc.clone();
        }
        if let EntityData::FuncGroup(gd) = &mut e.data {
            if let Some(args) = &s.args {
                gd.arg_desc = args.clone();
            }
            if let Some(rets) = &s.rets {
                gd.ret_desc = rets.clone();
            }
        }
    }

    for m in members {
        if let Some(rets) = &s.rets {
            validate_returns(prj, fid, m, rets);
        }
        let e = prj.model.entity_mut(m);
        if let Some(cat) = &s.category {
            if e.base.category.is_empty() {
                e.base.category = SmolStr::new(cat.as_str());
            }
        }
        if !s.desc.is_empty() && e.base.desc.is_empty() {
            e.base.desc = s.desc.clone();
        }
        if let EntityData::Function(f) = &mut prj.model.entity_mut(m).data {
            if let Some(args) = &s.args {
                if f.arg_desc.is_empty() {
                    f.arg_desc = args.clone();
                }
            }
            if let Some(rets) = &s.rets {
                if f.ret_desc.is_empty() {
                    f.ret_desc = rets.clone();
                }
            }
        }
    }
}

/// `FnSet:` groups semantically related non-overloaded functions into
/// one article. Members are declared by `Func: name(args)` lines, each
/// looked up and linked into the set.
fn proc_fnset(prj: &mut Project, fid: FileId, title: &str, s: Sections) {
    let base = crate::semantic::EntityBase {
        name: SmolStr::new(title),
        fqname: SmolStr::new(title),
        comp: prj.file(fid).comp,
        ..Default::default()
    };
    let data = EntityData::FuncSet(SetData {
        title: SmolStr::new(title),
        arg_desc: s.args.clone().unwrap_or_default(),
        ret_desc: s.rets.clone().unwrap_or_default(),
        ..Default::default()
    });
    let fname = prj.file(fid).name.clone();
    let root = prj.model.root;
    let mut diags = std::mem::take(&mut prj.diags);
    let set = prj
        .model
        .add_entity(root, base, data, &mut diags, &fname, "proc_fnset");
    prj.diags = diags;
    let Ok(set) = set else {
        prj.diags.surface("proc_fnset", &fname);
        return;
    };

    if let Some(cat) = &s.category {
        prj.model.entity_mut(set).base.category = SmolStr::new(cat.as_str());
    }
    if !s.desc.is_empty() {
        prj.model.entity_mut(set).base.desc = s.desc.clone();
    }

    for member_line in &s.funcs {
        let name = member_line.split('(').next().unwrap_or(member_line).trim();
        let Some(ent) = lookup_string(&prj.model, name, None) else {
            prj.diags.warning(
                "proc_fnset",
                &fname,
                0,
                0,
                format!("set member '{name}' not found"),
            );
            continue;
        };
        let members: Vec<EntityId> = match &prj.model.entity(ent).data {
            EntityData::FuncGroup(g) => {
                // Match on the extended name where the line gives one
                let wanted = member_line.trim();
                let exact: Vec<EntityId> = g
                    .funcs
                    .iter()
                    .copied()
                    .filter(|&f| {
                        prj.model
                            .entity(f)
                            .as_func()
                            .map(|fd| fd.ext_name.as_str() == wanted)
                            .unwrap_or(false)
                    })
                    .collect();
                if exact.is_empty() {
                    g.funcs.clone()
                } else {
                    exact
                }
            }
            EntityData::Function(_) => vec![ent],
            _ => Vec::new(),
        };
        for m in members {
            if let EntityData::FuncSet(sd) = &mut prj.model.entity_mut(set).data {
                if !sd.funcs.contains(&m) {
                    sd.funcs.push(m);
                }
            }
            if let Some(f) = prj.model.entity_mut(m).as_func_mut() {
                f.set = Some(set);
            }
        }
    }
}

/// Escape synopsis content: `<b>` and `<i>` pass through, all other
/// angle brackets are escaped; `$:`/`@:` prefixes open sub-sections.
fn render_synopsis(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("$:").or_else(|| trimmed.strip_prefix("@:")) {
            out.push_str("<b>");
            out.push_str(rest.trim());
            out.push_str("</b>\n");
            continue;
        }
        let mut rest = line;
        while let Some(pos) = rest.find(['<', '>']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let passed = ["<b>", "</b>", "<i>", "</i>"]
                .iter()
                .find(|t| tail.starts_with(**t));
            match passed {
                Some(t) => {
                    out.push_str(t);
                    rest = &tail[t.len()..];
                }
                None => {
                    out.push_str(if tail.starts_with('<') { "&lt;" } else { "&gt;" });
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out.push('\n');
    }
    out
}

/// `Synopsis: <order> <name>` creates a synopsis article carrying
/// HTML-ish content.
fn proc_synopsis(prj: &mut Project, fid: FileId, subject: &str, body: &str) {
    let (order, name) = match subject.split_once(char::is_whitespace) {
        Some((o, n)) if o.chars().all(|c| c.is_ascii_digit() || c == '.') => {
            (o.to_string(), n.trim().to_string())
        }
        _ => (String::new(), subject.to_string()),
    };
    if name.is_empty() {
        return;
    }
    let docname = SmolStr::new(format!("sy{}", name.replace(' ', "_")));
    let syn = Synopsis {
        name: SmolStr::new(name.as_str()),
        docname: docname.clone(),
        order: SmolStr::new(order),
        content: render_synopsis(body),
        file: fid,
    };
    if prj.synopses.contains_key(&docname) {
        let fname = prj.file(fid).name.clone();
        prj.diags.warning(
            "proc_synopsis",
            &fname,
            0,
            0,
            format!("synopsis '{name}' already exists"),
        );
        return;
    }
    prj.synopses.insert(docname, syn);
}
