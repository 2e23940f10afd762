//! Project driver: configuration loading, the component pipeline,
//! system includes and the exit-code contract.

mod helpers;

use cppdoc::Project;
use cppdoc::project::{CompKind, FileKind};
use cppdoc::semantic::{Attrs, EntityKind};
use helpers::{build, find, find_kind};

#[test]
fn test_init_project_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("inc")).unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(
        root.join("inc/counter.h"),
        "class Counter\n{\n\t// Counts things\npublic:\n\tint bump(int by);\n\tint value; // running value\n};\n",
    )
    .unwrap();
    std::fs::write(
        root.join("src/counter.cpp"),
        "#include \"counter.h\"\n\nint Counter::bump(int by)\n{\n\t// Adds to the value\n\t// Arguments:\t1) by the increment\n\t// Returns:\tValue after the bump\n\tvalue = value + by;\n\treturn value;\n}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("project.xml"),
        "<project name=\"demo\" tabwidth=\"4\">\n\
         \t<component name=\"demo\" type=\"Library\" title=\"Demo\">\n\
         \t\t<header>inc/counter.h</header>\n\
         \t\t<source>src/counter.cpp</source>\n\
         \t</component>\n\
         </project>\n",
    )
    .unwrap();

    let mut prj = Project::init_project(root.join("project.xml").to_str().unwrap()).unwrap();
    assert_eq!(prj.name, "demo");
    let failed = prj.process();
    assert_eq!(failed, 0, "diags: {:#?}", prj.diags.all());

    let class = find_kind(&prj, "Counter", EntityKind::Class);
    assert_eq!(prj.model.entity(class).base.desc, "Counts things");
    let f = helpers::func_by_ext(&prj, "Counter::bump", "bump(int)");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert!(fd.def_file.is_some());
    assert_eq!(fd.ret_points, 1);

    // Export lands on disk without complaint
    let mut out = Vec::new();
    prj.export_entities(&mut out).unwrap();
    std::fs::write(root.join("entities.xml"), &out).unwrap();
    assert!(root.join("entities.xml").exists());
}

#[test]
fn test_sys_include_marks_entities_internal() {
    let mut prj = Project::new("t");
    let comp = prj.add_component("t", CompKind::Library);
    prj.register_file(
        comp,
        "std.sys",
        FileKind::SysInc,
        Some("class hzString\n{\npublic:\n\tint length();\n};\nint errno_like;\n".to_string()),
    );
    prj.register_file(
        comp,
        "use.cpp",
        FileKind::Source,
        Some("hzString name; // the name\n".to_string()),
    );
    let failed = prj.process();
    assert_eq!(failed, 0);

    let class = find_kind(&prj, "hzString", EntityKind::Class);
    assert!(prj.model.entity(class).base.attrs.has(Attrs::INTERNAL));
    let v = find_kind(&prj, "errno_like", EntityKind::Variable);
    assert!(prj.model.entity(v).base.attrs.has(Attrs::INTERNAL));

    // Comment-standards warnings are suppressed under the system mask
    assert_eq!(helpers::warnings_containing(&prj, "leading comment for class hzString"), 0);

    // Project entities parsed afterwards are not masked
    let n = find_kind(&prj, "name", EntityKind::Variable);
    assert!(!prj.model.entity(n).base.attrs.has(Attrs::INTERNAL));
}

#[test]
fn test_exit_code_counts_files_with_errors() {
    let prj = build(&[
        ("bad.cpp", "int ;\n"),
        ("good.cpp", "int fine = 1; // fine\n"),
    ]);
    assert_eq!(prj.diags.files_with_errors(), 1);
    assert!(find(&prj, "fine").is_some());
}

#[test]
fn test_missing_file_is_openfail_not_panic() {
    let mut prj = Project::new("t");
    let comp = prj.add_component("t", CompKind::Library);
    prj.register_file(comp, "/no/such/file.cpp", FileKind::Source, None);
    let failed = prj.process();
    assert!(failed >= 1);
}

#[test]
fn test_document_files_are_not_parsed() {
    let mut prj = Project::new("t");
    let comp = prj.add_component("t", CompKind::Library);
    prj.register_file(
        comp,
        "notes.txt",
        FileKind::Document,
        Some("this is not C++ at all @@@@".to_string()),
    );
    let failed = prj.process();
    assert_eq!(failed, 0);
}
