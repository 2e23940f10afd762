//! End-to-end scenarios: one source fragment in, entity model out.

mod helpers;

use cppdoc::semantic::{Atom, EntityData, EntityKind, StmtKind};
use helpers::{build, build_clean, find_kind, func_by_ext};

#[test]
fn s1_simple_variable_with_trailing_comment() {
    let prj = build_clean(&[("s1.cpp", "int x = 1 + 2 ; // a counter\n")]);

    let x = find_kind(&prj, "x", EntityKind::Variable);
    let ent = prj.model.entity(x);
    let EntityData::Variable(v) = &ent.data else { unreachable!() };
    assert_eq!(v.tpx.base, Some(prj.model.std.int_));
    assert_eq!(v.tpx.indir, 0);
    assert_eq!(v.value, Atom::Int(3));
    assert_eq!(ent.base.desc, "a counter");
    assert_eq!(prj.diags.summary("s1.cpp").1, 0);
}

#[test]
fn s2_member_function_declared_in_header_defined_in_source() {
    let prj = build_clean(&[
        (
            "a.h",
            "class A\n{\npublic:\n\tint f(int a);\n};\n",
        ),
        ("a.cpp", "#include \"a.h\"\n\nint A::f(int a)\n{\n\treturn a + 1;\n}\n"),
    ]);

    let class = find_kind(&prj, "A", EntityKind::Class);
    let f = func_by_ext(&prj, "A::f", "f(int)");
    let fd = prj.model.entity(f).as_func().unwrap();

    let header = prj.file_by_path("a.h").unwrap();
    let source = prj.file_by_path("a.cpp").unwrap();
    assert_eq!(fd.decl_file, Some(header));
    assert_eq!(fd.def_file, Some(source));
    assert_eq!(fd.tpx.base, Some(prj.model.std.int_));
    assert_eq!(fd.args.len(), 1);
    assert_eq!(prj.model.entity(fd.args[0]).base.name, "a");

    let returns: Vec<_> = fd
        .stmts
        .iter()
        .filter(|s| s.kind == StmtKind::Return)
        .collect();
    assert_eq!(returns.len(), 1);
    assert_eq!(fd.ret_points, 1);

    // The member list of A carries f
    let EntityData::Class(c) = &prj.model.entity(class).data else { unreachable!() };
    assert!(c.funcs.contains(&f));
}

#[test]
fn s3_macro_expansion_into_active_stream() {
    let mut prj = cppdoc::Project::new("s3");
    let comp = prj.add_component("s3", cppdoc::project::CompKind::Library);
    let fid = prj.register_file(
        comp,
        "s3.cpp",
        cppdoc::project::FileKind::Source,
        Some("#define MAX(a,b) a>b?a:b\nint m = MAX(x,3);\n".to_string()),
    );
    prj.activate(fid).unwrap();
    cppdoc::preproc::preprocess(&mut prj, fid, 0).unwrap();

    let mac = find_kind(&prj, "MAX", EntityKind::Macro);
    let EntityData::Macro(m) = &prj.model.entity(mac).data else { unreachable!() };
    assert_eq!(m.formals.len(), 2);
    assert_eq!(m.formals.get("a").copied(), Some(1));
    assert_eq!(m.formals.get("b").copied(), Some(2));
    assert_eq!(m.ersatz.len(), 7);

    // The call site stands as `x > 3 ? x : 3` in X
    let texts: Vec<&str> = prj.file(fid).active.iter().map(|t| t.text.as_str()).collect();
    let eq = texts.iter().position(|&t| t == "=").unwrap();
    assert_eq!(&texts[eq + 1..eq + 8], &["x", ">", "3", "?", "x", ":", "3"]);

    // Expansion output is marked generated
    for t in &prj.file(fid).active[eq + 1..eq + 8] {
        assert_eq!(t.col, 0);
    }
}

#[test]
fn s4_enum_values_explicit_and_ordinal() {
    let prj = build(&[(
        "s4.cpp",
        "enum E\n{\n\t// Values of E\n\tA,\n\tB=5,\n\tC\n} ;\n",
    )]);

    let e = find_kind(&prj, "E", EntityKind::Enum);
    let EntityData::Enum(ed) = &prj.model.entity(e).data else { unreachable!() };

    let num = |name: &str| {
        let id = ed.by_name.get(name).copied().unwrap();
        match &prj.model.entity(id).data {
            EntityData::EnumVal(v) => v.num,
            _ => panic!("not an enum value"),
        }
    };
    assert_eq!(num("A"), 0);
    assert_eq!(num("B"), 5);
    assert_eq!(num("C"), 6);

    let by5 = ed.by_num.get(&5).copied().unwrap();
    assert_eq!(prj.model.entity(by5).base.name, "B");
}

#[test]
fn s5_external_function_comment_sets_category() {
    let src = "\
/*
**\tFunction: foo
**\tCategory: util
**\tArguments: None
**\tReturns: None
*/

void foo() {}
";
    let prj = build_clean(&[("s5.cpp", src)]);

    let f = func_by_ext(&prj, "foo", "foo()");
    let ent = prj.model.entity(f);
    assert_eq!(ent.base.category, "util");
    let fd = ent.as_func().unwrap();
    assert!(fd.arg_desc.is_empty());
    assert!(fd.ret_desc.is_empty());
    assert_eq!(prj.diags.summary("s5.cpp"), (0, 0));
}

#[test]
fn s6_external_returns_block_for_bool() {
    let src = "\
/* Function: bar
Returns:
\tTrue\tsucceeded
\tFalse\tfailed
*/
bool bar();
";
    let prj = build_clean(&[("s6.cpp", src)]);

    let f = func_by_ext(&prj, "bar", "bar()");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert_eq!(fd.ret_desc.len(), 2);
    assert_eq!(fd.ret_desc[0].0, "True");
    assert_eq!(fd.ret_desc[0].1, "succeeded");
    assert_eq!(fd.ret_desc[1].0, "False");
    assert_eq!(prj.diags.summary("s6.cpp").0, 0);
}
