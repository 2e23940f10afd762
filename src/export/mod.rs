//! Entity model export.
//!
//! The populated model serializes as an indented XML document of
//! nested `<EntityTable>` elements, each carrying its #defines,
//! macros, typedefs, variables, enums (with `<eVal>` children),
//! unions, classes (recursively carrying their own entity tables) and
//! functions (with argument and description children).

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use rustc_hash::FxHashMap;

use crate::diag::ErrorCode;
use crate::project::Project;
use crate::semantic::{EntityData, EntityId, EntityKind, ScopeId};

type XmlWriter<W> = Writer<W>;

fn start<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut el = BytesStart::new(name);
    for &(k, v) in attrs {
        el.push_attribute((k, v));
    }
    el
}

fn write_simple<W: Write>(
    w: &mut XmlWriter<W>,
    name: &str,
    attrs: &[(&str, &str)],
    text: Option<&str>,
) -> Result<(), ErrorCode> {
    let el = start(name, attrs);
    match text {
        Some(t) if !t.is_empty() => {
            w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;
            w.write_event(Event::Text(BytesText::new(t)))
                .map_err(|_| ErrorCode::WriteFail)?;
            w.write_event(Event::End(BytesEnd::new(name)))
                .map_err(|_| ErrorCode::WriteFail)?;
        }
        _ => {
            w.write_event(Event::Empty(el)).map_err(|_| ErrorCode::WriteFail)?;
        }
    }
    Ok(())
}

fn ersatz_text(prj: &Project, id: EntityId) -> String {
    let toks = match &prj.model.entity(id).data {
        EntityData::Define(d) => &d.ersatz,
        EntityData::Macro(m) => &m.ersatz,
        _ => return String::new(),
    };
    let mut out = String::new();
    for t in toks {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(t.show());
    }
    out
}

fn export_function<W: Write>(
    prj: &Project,
    w: &mut XmlWriter<W>,
    id: EntityId,
) -> Result<(), ErrorCode> {
    let ent = prj.model.entity(id);
    let Some(f) = ent.as_func() else { return Ok(()) };
    let ret = f.tpx.render(&prj.model);
    let el = start(
        "function",
        &[
            ("name", ent.base.name.as_str()),
            ("extname", f.ext_name.as_str()),
            ("return", ret.as_str()),
            ("scope", ent.base.access.as_str()),
        ],
    );
    w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;

    for &arg in &f.args {
        let a = prj.model.entity(arg);
        if let EntityData::Variable(v) = &a.data {
            let ty = v.tpx.render(&prj.model);
            write_simple(
                w,
                "arg",
                &[("name", a.base.name.as_str()), ("type", ty.as_str())],
                None,
            )?;
        }
    }
    for (k, t) in &f.arg_desc {
        write_simple(w, "argdesc", &[("arg", k.as_str())], Some(t))?;
    }
    for (k, t) in &f.ret_desc {
        write_simple(w, "retdesc", &[("key", k.as_str())], Some(t))?;
    }
    if !ent.base.desc.is_empty() {
        write_simple(w, "desc", &[], Some(&ent.base.desc))?;
    }

    w.write_event(Event::End(BytesEnd::new("function")))
        .map_err(|_| ErrorCode::WriteFail)?;
    Ok(())
}

fn export_enum<W: Write>(
    prj: &Project,
    w: &mut XmlWriter<W>,
    id: EntityId,
) -> Result<(), ErrorCode> {
    let ent = prj.model.entity(id);
    let EntityData::Enum(e) = &ent.data else { return Ok(()) };
    let el = start("enum", &[("name", ent.base.name.as_str())]);
    w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;
    for (name, &val) in &e.by_name {
        if let EntityData::EnumVal(ev) = &prj.model.entity(val).data {
            let num = ev.num.to_string();
            write_simple(
                w,
                "eVal",
                &[("name", name.as_str()), ("number", num.as_str())],
                None,
            )?;
        }
    }
    w.write_event(Event::End(BytesEnd::new("enum")))
        .map_err(|_| ErrorCode::WriteFail)?;
    Ok(())
}

/// Entities of a table bucketed into export order
#[derive(Default)]
struct Buckets {
    defines: Vec<EntityId>,
    macros: Vec<EntityId>,
    typedefs: Vec<EntityId>,
    variables: Vec<EntityId>,
    enums: Vec<EntityId>,
    unions: Vec<EntityId>,
    classes: Vec<EntityId>,
    functions: Vec<EntityId>,
}

fn bucket(prj: &Project, scope: ScopeId) -> Buckets {
    let mut b = Buckets::default();
    for &id in prj.model.scope(scope).entries.values() {
        match prj.model.entity(id).kind() {
            EntityKind::Define => b.defines.push(id),
            EntityKind::Literal => b.defines.push(id),
            EntityKind::Macro => b.macros.push(id),
            EntityKind::Typedef => b.typedefs.push(id),
            EntityKind::Variable => b.variables.push(id),
            EntityKind::Enum => b.enums.push(id),
            EntityKind::Union => b.unions.push(id),
            EntityKind::Class => b.classes.push(id),
            EntityKind::Function => b.functions.push(id),
            _ => {}
        }
    }
    b
}

fn export_group<W: Write, F>(
    w: &mut XmlWriter<W>,
    tag: &str,
    ids: &[EntityId],
    mut each: F,
) -> Result<(), ErrorCode>
where
    F: FnMut(&mut XmlWriter<W>, EntityId) -> Result<(), ErrorCode>,
{
    if ids.is_empty() {
        return Ok(());
    }
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|_| ErrorCode::WriteFail)?;
    for &id in ids {
        each(w, id)?;
    }
    w.write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|_| ErrorCode::WriteFail)?;
    Ok(())
}

fn export_table<W: Write>(
    prj: &Project,
    w: &mut XmlWriter<W>,
    scope: ScopeId,
) -> Result<(), ErrorCode> {
    let name = prj.model.scope(scope).name.clone();
    let el = start("EntityTable", &[("name", name.as_str())]);

    if prj.model.scope(scope).is_empty() {
        w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;
        w.write_event(Event::Text(BytesText::new("0 Items")))
            .map_err(|_| ErrorCode::WriteFail)?;
        w.write_event(Event::End(BytesEnd::new("EntityTable")))
            .map_err(|_| ErrorCode::WriteFail)?;
        return Ok(());
    }

    w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;

    let b = bucket(prj, scope);

    export_group(w, "HashDefines", &b.defines, |w, id| {
        let ent = prj.model.entity(id);
        match &ent.data {
            EntityData::Literal(l) => write_simple(
                w,
                "hashdef",
                &[("name", ent.base.name.as_str()), ("value", l.text.as_str())],
                None,
            ),
            _ => {
                let text = ersatz_text(prj, id);
                write_simple(w, "hashdef", &[("name", ent.base.name.as_str())], Some(&text))
            }
        }
    })?;

    export_group(w, "Macros", &b.macros, |w, id| {
        let ent = prj.model.entity(id);
        write_simple(w, "macro", &[("name", ent.base.name.as_str())], None)
    })?;

    export_group(w, "Typedefs", &b.typedefs, |w, id| {
        let ent = prj.model.entity(id);
        let ty = match &ent.data {
            EntityData::Typedef { resolve, .. } => resolve.render(&prj.model),
            _ => String::new(),
        };
        write_simple(
            w,
            "typedef",
            &[("name", ent.base.name.as_str()), ("type", ty.as_str())],
            None,
        )
    })?;

    export_group(w, "Variables", &b.variables, |w, id| {
        let ent = prj.model.entity(id);
        let ty = match &ent.data {
            EntityData::Variable(v) => v.tpx.render(&prj.model),
            _ => String::new(),
        };
        write_simple(
            w,
            "variable",
            &[
                ("name", ent.base.name.as_str()),
                ("type", ty.as_str()),
                ("scope", ent.base.access.as_str()),
            ],
            if ent.base.desc.is_empty() { None } else { Some(&ent.base.desc) },
        )
    })?;

    export_group(w, "Enums", &b.enums, |w, id| export_enum(prj, w, id))?;

    export_group(w, "Unions", &b.unions, |w, id| {
        let ent = prj.model.entity(id);
        let el = start("union", &[("name", ent.base.name.as_str())]);
        w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;
        if let EntityData::Union(u) = &ent.data {
            export_table(prj, w, u.table)?;
        }
        w.write_event(Event::End(BytesEnd::new("union")))
            .map_err(|_| ErrorCode::WriteFail)?;
        Ok(())
    })?;

    export_group(w, "Classes", &b.classes, |w, id| {
        let ent = prj.model.entity(id);
        let el = start(
            "class",
            &[
                ("name", ent.base.name.as_str()),
                ("fqname", ent.base.fqname.as_str()),
            ],
        );
        w.write_event(Event::Start(el)).map_err(|_| ErrorCode::WriteFail)?;
        if !ent.base.desc.is_empty() {
            write_simple(w, "desc", &[], Some(&ent.base.desc))?;
        }
        if let EntityData::Class(c) = &ent.data {
            export_table(prj, w, c.table)?;
        }
        w.write_event(Event::End(BytesEnd::new("class")))
            .map_err(|_| ErrorCode::WriteFail)?;
        Ok(())
    })?;

    export_group(w, "Functions", &b.functions, |w, id| export_function(prj, w, id))?;

    w.write_event(Event::End(BytesEnd::new("EntityTable")))
        .map_err(|_| ErrorCode::WriteFail)?;
    Ok(())
}

/// Serialize the entity model to a writer.
pub fn export_entities<W: Write>(prj: &Project, out: W) -> Result<(), ErrorCode> {
    let mut w = Writer::new_with_indent(out, b'\t', 1);
    export_table(prj, &mut w, prj.model.root)
}

/// Count element occurrences in a previously exported document. The
/// structural round-trip check compares these counts against the live
/// model.
pub fn import_counts(xml: &str) -> Result<FxHashMap<String, usize>, ErrorCode> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                *counts.entry(name).or_default() += 1;
            }
            Ok(Event::Eof) => break,
            Err(_) => return Err(ErrorCode::Format),
            _ => {}
        }
    }
    Ok(counts)
}

/// Live-model counts in the same terms as [`import_counts`].
pub fn model_counts(prj: &Project) -> FxHashMap<String, usize> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    fn visit(prj: &Project, scope: ScopeId, counts: &mut FxHashMap<String, usize>) {
        let b = bucket(prj, scope);
        *counts.entry("hashdef".into()).or_default() += b.defines.len();
        *counts.entry("macro".into()).or_default() += b.macros.len();
        *counts.entry("typedef".into()).or_default() += b.typedefs.len();
        *counts.entry("variable".into()).or_default() += b.variables.len();
        *counts.entry("enum".into()).or_default() += b.enums.len();
        *counts.entry("union".into()).or_default() += b.unions.len();
        *counts.entry("class".into()).or_default() += b.classes.len();
        *counts.entry("function".into()).or_default() += b.functions.len();
        for &id in &b.classes {
            if let EntityData::Class(c) = &prj.model.entity(id).data {
                visit(prj, c.table, counts);
            }
        }
        for &id in &b.unions {
            if let EntityData::Union(u) = &prj.model.entity(id).data {
                visit(prj, u.table, counts);
            }
        }
    }
    visit(prj, prj.model.root, &mut counts);
    counts.retain(|_, v| *v > 0);
    counts
}
