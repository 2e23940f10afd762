//! Comment processors: internal comments, the returns rule table,
//! external comments, function sets and synopses.

mod helpers;

use cppdoc::semantic::EntityKind;
use helpers::{build, build_clean, find, find_kind, func_by_ext, warnings_containing};

#[test]
fn test_internal_function_comment_sections() {
    let src = "\
int measure(int span, int unit)
{
\t// Category:\tgeometry
\t//
\t// Measures a span in the given unit.
\t//
\t// Arguments:\t1) span the distance to measure
\t//\t\t\t\t2) unit the unit to report in
\t//
\t// Returns:\tNumber of units
\treturn span / unit;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "measure", "measure(int,int)");
    let ent = prj.model.entity(f);
    assert_eq!(ent.base.category, "geometry");
    assert!(ent.base.desc.contains("Measures a span"));

    let fd = ent.as_func().unwrap();
    assert_eq!(fd.arg_desc.len(), 2);
    assert_eq!(fd.arg_desc[0].0, "span");
    assert_eq!(fd.arg_desc[1].0, "unit");
    assert_eq!(fd.ret_desc.len(), 1);
    assert_eq!(fd.ret_desc[0].0, "Number");
    assert_eq!(warnings_containing(&prj, "returns entries"), 0);
}

#[test]
fn test_argument_count_mismatch_warns() {
    let src = "\
int one_arg(int only)
{
\t// Arguments:\t1) only the only argument
\t//\t\t\t\t2) ghost does not exist
\t// Returns:\tNumber of things
\treturn only;
}
";
    let prj = build(&[("t.cpp", src)]);
    assert!(warnings_containing(&prj, "argument descriptions") > 0);
}

#[test]
fn test_bool_return_rule_violation_warns() {
    let src = "\
bool check(int v)
{
\t// Checks a value
\t// Returns:\tNumber of hits
\treturn v == 1;
}
";
    let prj = build(&[("t.cpp", src)]);
    assert!(warnings_containing(&prj, "'True' and 'False'") > 0);
}

#[test]
fn test_pointer_return_rule() {
    let src = "\
char* fetch(int n)
{
\t// Fetches a buffer
\t// Returns:
\t//\tPointer to the buffer
\t//\tNULL if n is out of range
\treturn 0;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "fetch", "fetch(int)");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert_eq!(fd.ret_desc.len(), 2);
    assert_eq!(warnings_containing(&prj, "returns entries"), 0);
}

#[test]
fn test_numeric_signed_entries_accepted() {
    let src = "\
int compare(int a, int b)
{
\t// Compares two values
\t// Arguments:\t1) a left side
\t//\t\t\t\t2) b right side
\t// Returns:
\t//\t<0\tif a sorts first
\t//\t0\tif equal
\t//\t>0\tif b sorts first
\treturn a - b;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    assert_eq!(warnings_containing(&prj, "returns entries"), 0);
    let f = func_by_ext(&prj, "compare", "compare(int,int)");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert_eq!(fd.ret_desc.len(), 3);
    assert_eq!(fd.ret_desc[0].0, "<0");
}

#[test]
fn test_enum_return_requires_error_entries() {
    let src = "\
enum Rc
{
\t// Result codes
\tE_OK,
\tE_FAIL
} ;
Rc attempt(int n)
{
\t// Attempts the thing
\t// Returns:
\t//\tE_OK on success
\t//\tE_FAIL on failure
\treturn E_OK;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    assert_eq!(warnings_containing(&prj, "returns entries"), 0);
}

#[test]
fn test_missing_function_comment_warns() {
    let src = "\
int bare(int v)
{
\treturn v;
}
";
    let prj = build(&[("t.cpp", src)]);
    assert!(warnings_containing(&prj, "leading comment for function") > 0);
}

#[test]
fn test_missing_variable_comment_warns() {
    let prj = build(&[("t.cpp", "int quiet;\n")]);
    assert!(warnings_containing(&prj, "trailing comment") > 0);
}

#[test]
fn test_external_class_comment() {
    let src = "\
/*
**\tClass:\tLedger
**\tCategory:\taccounts
**
**\tHolds the running balance.
*/

class Ledger
{
public:
\tint balance; // current balance
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find_kind(&prj, "Ledger", EntityKind::Class);
    let ent = prj.model.entity(class);
    assert_eq!(ent.base.category, "accounts");
    assert!(ent.base.desc.contains("running balance"));
}

#[test]
fn test_fnset_links_members() {
    let src = "\
/*
**\tFnSet:\tStringOps
**\tCategory:\tstrings
**
**\tOperations over strings.
**
**\tFunc:\tupper()
**\tFunc:\tlower()
*/

int upper()
{
\t// Uppercases
\t// Returns:\tNumber of chars changed
\treturn 0;
}
int lower()
{
\t// Lowercases
\t// Returns:\tNumber of chars changed
\treturn 0;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    let set = find_kind(&prj, "StringOps", EntityKind::FuncSet);
    let cppdoc::semantic::EntityData::FuncSet(sd) = &prj.model.entity(set).data else {
        unreachable!()
    };
    assert_eq!(sd.funcs.len(), 2);

    let up = func_by_ext(&prj, "upper", "upper()");
    assert_eq!(prj.model.entity(up).as_func().unwrap().set, Some(set));
}

#[test]
fn test_synopsis_article() {
    let src = "\
/*
Synopsis:\t1.2 Treatment of Widgets

$:\tOverview

Widgets are <b>grouped</b> by kind. A kind is written as <kind>.
*/

int placeholder; // keeps the file non-empty
";
    let prj = build(&[("t.cpp", src)]);
    let syn = prj
        .synopses
        .values()
        .find(|s| s.name == "Treatment of Widgets")
        .expect("synopsis created");
    assert_eq!(syn.order, "1.2");
    assert!(syn.content.contains("<b>grouped</b>"));
    assert!(syn.content.contains("&lt;kind&gt;"));
    assert!(syn.content.contains("<b>Overview</b>"));
}

#[test]
fn test_unknown_subject_warns() {
    let src = "\
/*
**\tFunction:\tno_such_function
**
**\tOrphan description.
*/

int anchor; // anchor
";
    let prj = build(&[("t.cpp", src)]);
    assert!(warnings_containing(&prj, "not found") > 0);
}

#[test]
fn test_group_comment_defaults_for_members() {
    let src = "\
/*
**\tFnGrp:\tscale
**\tCategory:\tmath
**
**\tScales values.
*/

int scale(int v)
{
\t// Returns:\tNumber scaled
\treturn v * 2;
}
int scale(int v, int by)
{
\t// Returns:\tNumber scaled
\treturn v * by;
}
";
    let prj = build(&[("t.cpp", src)]);
    let group = find_kind(&prj, "scale", EntityKind::FuncGroup);
    assert_eq!(prj.model.entity(group).base.category, "math");
    for ext in ["scale(int)", "scale(int,int)"] {
        let f = func_by_ext(&prj, "scale", ext);
        assert_eq!(prj.model.entity(f).base.category, "math");
    }
}

#[test]
fn test_comment_consumed_only_once() {
    let src = "\
/*
**\tClass:\tSolo
**
**\tThe description.
*/

class Solo
{
public:
\tint v; // value
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find(&prj, "Solo").unwrap();
    assert!(prj.model.entity(class).base.desc.contains("The description"));

    // The external comment is consumed exactly once: the first raw
    // comment carries the processed flag and stays attached nowhere
    // else
    let fid = prj.file_by_path("t.cpp").unwrap();
    let first = prj.file(fid).raw.iter().find(|t| t.is_comment()).unwrap();
    assert!(first.comment_processed());
}
