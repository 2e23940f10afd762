//! Parser coverage over the declared entity forms.

mod helpers;

use cppdoc::semantic::{Access, Atom, Basis, EntityData, EntityKind};
use helpers::{build, find, find_kind};
use rstest::rstest;

#[rstest]
#[case("int n; // n", "n", Basis::Int32, 0)]
#[case("unsigned int u; // u", "u", Basis::Unt32, 0)]
#[case("unsigned long long big; // big", "big", Basis::Unt64, 0)]
#[case("double d; // d", "d", Basis::Double, 0)]
#[case("char* s; // s", "s", Basis::Int8, 1)]
#[case("char** argv; // argv", "argv", Basis::Int8, 2)]
#[case("bool flag; // flag", "flag", Basis::Bool, 0)]
fn test_variable_typlexes(
    #[case] src: &str,
    #[case] name: &str,
    #[case] basis: Basis,
    #[case] indir: i16,
) {
    let prj = build(&[("t.cpp", src)]);
    let v = find_kind(&prj, name, EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.basis(&prj.model), basis);
    assert_eq!(vd.tpx.indir, indir);
}

#[test]
fn test_variable_comma_list() {
    let prj = build(&[("t.cpp", "int a, b, c; // three counters\n")]);
    for name in ["a", "b", "c"] {
        let v = find_kind(&prj, name, EntityKind::Variable);
        assert_eq!(prj.model.entity(v).base.desc, "three counters");
    }
}

#[test]
fn test_array_variable_with_extent() {
    let prj = build(&[("t.cpp", "char buf[64]; // scratch\n")]);
    let v = find_kind(&prj, "buf", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.elements, 64);
}

#[test]
fn test_array_extent_from_initializer() {
    let prj = build(&[("t.cpp", "int primes[] = { 2, 3, 5, 7 }; // first four\n")]);
    let v = find_kind(&prj, "primes", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.elements, 4);
}

#[test]
fn test_array_extent_from_named_literal() {
    let prj = build(&[("t.cpp", "#define SIZE 8\nint ring[SIZE]; // ring buffer\n")]);
    let v = find_kind(&prj, "ring", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.elements, 8);
}

#[test]
fn test_static_variable_is_file_scoped() {
    let prj = build(&[("t.cpp", "static int counter; // uses\nint open_count; // opens\n")]);
    // File statics do not land in the root table
    assert!(find(&prj, "counter").is_none());
    let g = find_kind(&prj, "open_count", EntityKind::Variable);
    assert_eq!(prj.model.entity(g).base.access, Access::Global);

    let fid = prj.file_by_path("t.cpp").unwrap();
    let table = prj.file(fid).table.expect("file-static table");
    let c = prj.model.scope(table).get("counter").expect("counter in file table");
    assert_eq!(prj.model.entity(c).base.access, Access::FileStatic);
}

#[test]
fn test_class_definition_and_members() {
    let src = "\
class Point
{
\t// A 2D point
public:
\tint x; // abscissa
\tint y; // ordinate
private:
\tint pad; // alignment filler
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find_kind(&prj, "Point", EntityKind::Class);
    let ent = prj.model.entity(class);
    assert_eq!(ent.base.desc, "A 2D point");

    let EntityData::Class(c) = &ent.data else { unreachable!() };
    let access = |name: &str| {
        let id = prj.model.scope(c.table).get(name).unwrap();
        prj.model.entity(id).base.access
    };
    assert_eq!(access("x"), Access::Public);
    assert_eq!(access("y"), Access::Public);
    assert_eq!(access("pad"), Access::Private);
    assert_eq!(prj.model.entity(prj.model.scope(c.table).get("x").unwrap()).base.fqname, "Point::x");
}

#[test]
fn test_struct_default_access_is_public() {
    let prj = build(&[("t.cpp", "struct Pair\n{\n\t// A pair\n\tint first; // first\n};\n")]);
    let s = find_kind(&prj, "Pair", EntityKind::Class);
    let EntityData::Class(c) = &prj.model.entity(s).data else { unreachable!() };
    let f = prj.model.scope(c.table).get("first").unwrap();
    assert_eq!(prj.model.entity(f).base.access, Access::Public);
    assert!(prj.model.entity(s).base.attrs.has(cppdoc::semantic::Attrs::STRUCT));
}

#[test]
fn test_forward_declaration_then_definition() {
    let prj = build(&[(
        "t.cpp",
        "class Later;\nclass Later\n{\n\t// Defined later\npublic:\n\tint v; // value\n};\n",
    )]);
    let class = find_kind(&prj, "Later", EntityKind::Class);
    let EntityData::Class(c) = &prj.model.entity(class).data else { unreachable!() };
    assert!(prj.model.scope(c.table).get("v").is_some());
}

#[test]
fn test_base_class_clause() {
    let src = "\
class Base
{
\t// Base
public:
\tint held; // held value
};
class Derived : public Base
{
\t// Derived
public:
\tint extra; // extra value
};
";
    let prj = build(&[("t.cpp", src)]);
    let base = find_kind(&prj, "Base", EntityKind::Class);
    let derived = find_kind(&prj, "Derived", EntityKind::Class);
    let EntityData::Class(c) = &prj.model.entity(derived).data else { unreachable!() };
    assert_eq!(c.base, Some(base));
}

#[test]
fn test_nested_class() {
    let src = "\
class Outer
{
\t// Outer
public:
\tclass Inner
\t{
\t\t// Inner
\tpublic:
\t\tint depth; // nesting depth
\t};
\tint own; // own member
};
";
    let prj = build(&[("t.cpp", src)]);
    let inner = find(&prj, "Outer::Inner").expect("nested class");
    assert_eq!(prj.model.entity(inner).kind(), EntityKind::Class);
    let EntityData::Class(c) = &prj.model.entity(inner).data else { unreachable!() };
    assert_eq!(c.parent, find(&prj, "Outer"));
    assert_eq!(prj.model.entity(inner).base.fqname, "Outer::Inner");
}

#[test]
fn test_union_with_host() {
    let src = "\
union Value
{
\tint as_int; // integer view
\tdouble as_real; // real view
};
";
    let prj = build(&[("t.cpp", src)]);
    let u = find_kind(&prj, "Value", EntityKind::Union);
    let EntityData::Union(ud) = &prj.model.entity(u).data else { unreachable!() };
    assert!(prj.model.scope(ud.table).get("as_int").is_some());
    assert!(prj.model.scope(ud.table).get("as_real").is_some());
}

#[test]
fn test_typedef_resolution() {
    let prj = build(&[("t.cpp", "typedef unsigned int uint32;\nuint32 v = 7; // v\n")]);
    let td = find_kind(&prj, "uint32", EntityKind::Typedef);
    assert_eq!(prj.model.basis_of(td), Basis::Unt32);

    let v = find_kind(&prj, "v", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.base, Some(td));
    assert_eq!(vd.tpx.basis(&prj.model), Basis::Unt32);
    assert_eq!(vd.value, Atom::Int(7));
}

#[test]
fn test_function_pointer_typedef() {
    let prj = build(&[("t.cpp", "typedef int (*Handler)(int, char*);\n")]);
    let td = find_kind(&prj, "Handler", EntityKind::Typedef);
    let EntityData::Typedef { resolve, .. } = &prj.model.entity(td).data else { unreachable!() };
    assert!(resolve.attrs.has(cppdoc::semantic::TyAttr::FNPTR));
    assert_eq!(resolve.args.len(), 2);
}

#[test]
fn test_function_pointer_variable() {
    let prj = build(&[("t.cpp", "int (*handler)(int);\n")]);
    let v = find_kind(&prj, "handler", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert!(vd.tpx.attrs.has(cppdoc::semantic::TyAttr::FNPTR));
    assert_eq!(vd.tpx.args.len(), 1);
}

#[test]
fn test_namespace_and_qualified_lookup() {
    let src = "\
namespace net
{
\tclass Socket
\t{
\t\t// A socket
\tpublic:
\t\tint fd; // descriptor
\t};
}
";
    let prj = build(&[("t.cpp", src)]);
    let ns = find_kind(&prj, "net", EntityKind::Namespace);
    let class = find(&prj, "net::Socket").expect("qualified lookup");
    assert_eq!(prj.model.entity(class).kind(), EntityKind::Class);
    assert_eq!(prj.model.entity(class).base.fqname, "net::Socket");

    // The class is not visible unqualified from the root
    assert!(
        find(&prj, "Socket").is_none(),
        "Socket should live only inside net"
    );
    let _ = ns;
}

#[test]
fn test_using_namespace_opens_lookup() {
    let src = "\
namespace geo
{
\tclass Shape
\t{
\t\t// A shape
\t};
}
using namespace geo;
Shape held; // the held shape
";
    let prj = build(&[("t.cpp", src)]);
    let v = find_kind(&prj, "held", EntityKind::Variable);
    let EntityData::Variable(vd) = &prj.model.entity(v).data else { unreachable!() };
    assert_eq!(vd.tpx.base, find(&prj, "geo::Shape"));
}

#[test]
fn test_class_template_with_arguments() {
    let src = "\
template <class OBJ, class KEY>
class Map
{
\t// An ordered map
public:
\tint count; // population
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find_kind(&prj, "Map", EntityKind::Class);
    let ent = prj.model.entity(class);
    assert!(ent.base.attrs.has(cppdoc::semantic::Attrs::TEMPLATE));
    let EntityData::Class(c) = &ent.data else { unreachable!() };
    assert_eq!(c.targs.len(), 2);
    assert_eq!(prj.model.entity(c.targs[0]).kind(), EntityKind::TemplateArg);
    // The arguments act as types inside the class table
    assert!(prj.model.scope(c.table).get("OBJ").is_some());
}

#[test]
fn test_enum_forward_declaration() {
    let prj = build(&[("t.cpp", "enum Color ;\n")]);
    assert_eq!(
        prj.model.entity(find(&prj, "Color").unwrap()).kind(),
        EntityKind::Enum
    );
}

#[test]
fn test_enum_duplicate_number_warns() {
    let prj = build(&[(
        "t.cpp",
        "enum Dup\n{\n\t// Duplicates\n\tA = 1,\n\tB = 1\n} ;\n",
    )]);
    assert!(helpers::warnings_containing(&prj, "duplicates the number") > 0);
}

#[test]
fn test_unparseable_statement_recovers() {
    let prj = build(&[(
        "t.cpp",
        "int ;\nint after = 1; // still parsed\n",
    )]);
    assert!(prj.diags.summary("t.cpp").1 > 0);
    assert!(find(&prj, "after").is_some());
}

#[test]
fn test_empty_source_is_ok() {
    let prj = build(&[("t.cpp", "")]);
    assert_eq!(prj.diags.files_with_errors(), 0);
}

#[test]
fn test_underscore_names_marked_internal() {
    let prj = build(&[("t.cpp", "int _hidden; // internal support\n")]);
    let v = find_kind(&prj, "_hidden", EntityKind::Variable);
    assert!(prj.model.entity(v).base.attrs.has(cppdoc::semantic::Attrs::INTERNAL));
}
