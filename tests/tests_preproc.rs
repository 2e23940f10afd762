//! Preprocessor behavior: directive evaluation, #define classification,
//! expansion, the include graph and the comment associator.

mod helpers;

use cppdoc::Project;
use cppdoc::project::{CompKind, FileKind};
use cppdoc::semantic::{Atom, EntityData, EntityKind};
use cppdoc::token::NO_IDX;
use helpers::{build, find, find_kind};

fn preproc_one(src: &str) -> (Project, cppdoc::FileId) {
    let mut prj = Project::new("t");
    let comp = prj.add_component("t", CompKind::Library);
    let fid = prj.register_file(comp, "t.cpp", FileKind::Source, Some(src.to_string()));
    prj.activate(fid).unwrap();
    cppdoc::preproc::preprocess(&mut prj, fid, 0).unwrap();
    (prj, fid)
}

#[test]
fn test_plain_define_without_ersatz() {
    let (prj, _) = preproc_one("#define GUARD_H\nint a;\n");
    let d = find_kind(&prj, "GUARD_H", EntityKind::Define);
    let EntityData::Define(dd) = &prj.model.entity(d).data else { unreachable!() };
    assert!(dd.ersatz.is_empty());
}

#[test]
fn test_define_literal_promotion() {
    let prj = build(&[("t.cpp", "#define BLKSIZE 4096\nint x = BLKSIZE; // block\n")]);
    let l = find_kind(&prj, "BLKSIZE", EntityKind::Literal);
    let EntityData::Literal(ld) = &prj.model.entity(l).data else { unreachable!() };
    assert_eq!(ld.value, Atom::Int(4096));

    // The use site expanded to the literal value
    let x = find_kind(&prj, "x", EntityKind::Variable);
    let EntityData::Variable(v) = &prj.model.entity(x).data else { unreachable!() };
    assert_eq!(v.value, Atom::Int(4096));
}

#[test]
fn test_define_with_token_sequence() {
    let (prj, fid) = preproc_one("#define PAIR 1 , 2\nint a[] = { PAIR };\n");
    let d = find_kind(&prj, "PAIR", EntityKind::Define);
    let EntityData::Define(dd) = &prj.model.entity(d).data else { unreachable!() };
    assert_eq!(dd.ersatz.len(), 3);

    let texts: Vec<&str> = prj.file(fid).active.iter().map(|t| t.text.as_str()).collect();
    assert!(texts.windows(3).any(|w| w == ["1", ",", "2"]));
}

#[test]
fn test_macro_without_formal_reference_demoted() {
    // Parenthesized but no ersatz token references a formal
    let (prj, _) = preproc_one("#define WEIRD(a) 1 + 2\n");
    assert_eq!(
        prj.model.entity(find(&prj, "WEIRD").unwrap()).kind(),
        EntityKind::Define
    );
}

#[test]
fn test_define_trailing_comment_is_description() {
    let (prj, _) = preproc_one("#define LIMIT 64 // upper bound\n");
    let l = find(&prj, "LIMIT").unwrap();
    assert_eq!(prj.model.entity(l).base.desc, "upper bound");
}

#[test]
fn test_ifdef_includes_when_defined() {
    let prj = build(&[(
        "t.cpp",
        "#define HAVE\n#ifdef HAVE\nint a; // a\n#endif\n#ifdef MISSING\nint b; // b\n#endif\nint c; // c\n",
    )]);
    assert!(find(&prj, "a").is_some());
    assert!(find(&prj, "b").is_none());
    assert!(find(&prj, "c").is_some());
}

#[test]
fn test_ifndef_inverse() {
    let prj = build(&[(
        "t.cpp",
        "#ifndef MISSING\nint a; // a\n#endif\n#ifndef __FILE_H\n#define __FILE_H\nint b; // b\n#endif\n",
    )]);
    assert!(find(&prj, "a").is_some());
    assert!(find(&prj, "b").is_some());
}

#[test]
fn test_else_toggles_exclusion() {
    let prj = build(&[(
        "t.cpp",
        "#ifdef MISSING\nint a; // a\n#else\nint b; // b\n#endif\n",
    )]);
    assert!(find(&prj, "a").is_none());
    assert!(find(&prj, "b").is_some());
}

#[test]
fn test_nested_exclusion_preserved() {
    let prj = build(&[(
        "t.cpp",
        "#ifdef MISSING\n#ifdef ALSO_MISSING\nint a; // a\n#endif\nint b; // b\n#endif\nint c; // c\n",
    )]);
    assert!(find(&prj, "a").is_none());
    assert!(find(&prj, "b").is_none());
    assert!(find(&prj, "c").is_some());
}

#[test]
fn test_if_name_form_is_included() {
    let prj = build(&[("t.cpp", "#if SOMETHING\nint a; // a\n#endif\n")]);
    assert!(find(&prj, "a").is_some());
}

#[test]
fn test_undef_removes_from_expansion() {
    let prj = build(&[(
        "t.cpp",
        "#define FLAG\n#undef FLAG\n#ifdef FLAG\nint a; // a\n#endif\nint b; // b\n",
    )]);
    // The entity survives (entities are never destroyed) but the
    // registry no longer answers for it
    assert!(find(&prj, "FLAG").is_some());
    assert!(find(&prj, "b").is_some());
}

#[test]
fn test_include_graph_recorded() {
    let prj = build(&[
        ("inner.h", "#define INNER 1\n"),
        ("outer.h", "#include \"inner.h\"\nclass Widget\n{\n\t// A widget\n};\n"),
        ("main.cpp", "#include \"outer.h\"\nWidget w; // the widget\n"),
    ]);
    let main = prj.file_by_path("main.cpp").unwrap();
    let outer = prj.file_by_path("outer.h").unwrap();
    let inner = prj.file_by_path("inner.h").unwrap();

    assert_eq!(prj.file(main).direct_inc, vec![outer]);
    // Transitive includes merge into the including file's set
    assert!(prj.file(main).includes.values().any(|&f| f == outer));
    assert!(prj.file(main).includes.values().any(|&f| f == inner));
    assert!(find(&prj, "w").is_some());
}

#[test]
fn test_include_not_found_is_fatal_to_file() {
    let prj = build(&[("t.cpp", "#include \"nope.h\"\nint a;\n")]);
    assert!(prj.diags.summary("t.cpp").1 > 0);
    assert!(find(&prj, "a").is_none());
}

#[test]
fn test_each_file_preprocessed_once() {
    let prj = build(&[
        ("shared.h", "#define SHARED 1\n"),
        ("a.cpp", "#include \"shared.h\"\nint a; // a\n"),
        ("b.cpp", "#include \"shared.h\"\nint b; // b\n"),
    ]);
    // A second #define of SHARED would have produced a warning pair;
    // the stage guard means the header ran once
    assert!(find(&prj, "a").is_some());
    assert!(find(&prj, "b").is_some());
    assert_eq!(helpers::warnings_containing(&prj, "already have SHARED"), 0);
}

#[test]
fn test_include_depth_ten_succeeds_eleven_fatal() {
    // Chain: main -> h1 -> … -> h10 (depth 10)
    let mut ok_files: Vec<(String, String)> = Vec::new();
    for n in 1..=10 {
        let body = if n == 10 {
            "int deep; // deepest\n".to_string()
        } else {
            format!("#include \"h{}.h\"\n", n + 1)
        };
        ok_files.push((format!("h{n}.h"), body));
    }
    ok_files.push(("main.cpp".to_string(), "#include \"h1.h\"\n".to_string()));
    let refs: Vec<(&str, &str)> = ok_files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let prj = build(&refs);
    assert!(find(&prj, "deep").is_some());
    assert_eq!(prj.diags.files_with_errors(), 0);

    // One deeper is fatal
    let mut bad_files: Vec<(String, String)> = Vec::new();
    for n in 1..=11 {
        let body = if n == 11 {
            "int deeper;\n".to_string()
        } else {
            format!("#include \"h{}.h\"\n", n + 1)
        };
        bad_files.push((format!("h{n}.h"), body));
    }
    bad_files.push(("main.cpp".to_string(), "#include \"h1.h\"\n".to_string()));
    let refs: Vec<(&str, &str)> = bad_files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let prj = build(&refs);
    assert!(prj.diags.files_with_errors() > 0);
}

#[test]
fn test_comment_associator_links_and_single_ownership() {
    let (prj, fid) = preproc_one("int a ; // about a\nint b ;\n");
    let p = &prj.file(fid).raw;
    let x = &prj.file(fid).active;

    let comment_idx = p.iter().position(|t| t.is_comment()).unwrap();
    // The semicolon before the comment claims it as a following comment
    let semi = x
        .iter()
        .position(|t| t.orig as usize + 1 == comment_idx)
        .unwrap();
    assert_eq!(x[semi].com_post as usize, comment_idx);
    assert_ne!(p[comment_idx].com_post, NO_IDX);

    // The token after the comment must not also claim it
    let after = x
        .iter()
        .position(|t| t.orig as usize == comment_idx + 1)
        .unwrap();
    assert_eq!(x[after].com_pre, NO_IDX);
}

#[test]
fn test_active_tokens_raw_links() {
    // Invariant: every active token either points at a non-comment raw
    // token or is generated (column 0)
    let (prj, fid) = preproc_one("#define TWO 1 + 1\nint a = TWO ;\n");
    let p = &prj.file(fid).raw;
    for t in &prj.file(fid).active {
        if t.col == 0 {
            continue;
        }
        let orig = t.orig as usize;
        assert!(orig < p.len());
        assert!(!p[orig].is_comment());
    }
}

#[test]
fn test_macro_in_macro_definition_expands() {
    let (prj, fid) = preproc_one("#define BASE 10\n#define SCALE(n) n * BASE\nint v = SCALE(3);\n");
    let texts: Vec<&str> = prj.file(fid).active.iter().map(|t| t.text.as_str()).collect();
    assert!(texts.windows(3).any(|w| w == ["3", "*", "10"]));
}

#[test]
fn test_macro_argument_expansion_recurses() {
    let (prj, fid) = preproc_one("#define ONE 1\n#define ID(x) x + 0\nint v = ID(ONE);\n");
    let texts: Vec<&str> = prj.file(fid).active.iter().map(|t| t.text.as_str()).collect();
    assert!(texts.windows(3).any(|w| w == ["1", "+", "0"]));
}
