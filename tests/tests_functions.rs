//! Function declarations, groups, overload resolution and deferred
//! member bodies.

mod helpers;

use cppdoc::semantic::{Atom, EntityData, EntityKind, StmtKind};
use helpers::{build, build_clean, find, find_kind, func_by_ext, warnings_containing};

#[test]
fn test_function_group_collects_overloads() {
    let src = "\
int area(int side);
int area(int w, int h);
";
    let prj = build(&[("t.cpp", src)]);
    let group = find_kind(&prj, "area", EntityKind::FuncGroup);
    let EntityData::FuncGroup(g) = &prj.model.entity(group).data else { unreachable!() };
    assert_eq!(g.funcs.len(), 2);

    let one = func_by_ext(&prj, "area", "area(int)");
    let two = func_by_ext(&prj, "area", "area(int,int)");
    assert_ne!(one, two);
    assert_eq!(prj.model.entity(one).as_func().unwrap().group, Some(group));
}

#[test]
fn test_duplicate_declaration_is_idempotent() {
    let src = "\
int twice(int v);
int twice(int v);
";
    let prj = build(&[("t.cpp", src)]);
    let group = find_kind(&prj, "twice", EntityKind::FuncGroup);
    let EntityData::FuncGroup(g) = &prj.model.entity(group).data else { unreachable!() };
    assert_eq!(g.funcs.len(), 1);
    assert!(warnings_containing(&prj, "already defined") > 0);
}

#[test]
fn test_default_arguments_set_min_args() {
    let prj = build(&[("t.cpp", "int clamp(int v, int lo = 0, int hi = 100);\n")]);
    let f = func_by_ext(&prj, "clamp", "clamp(int,int,int)");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert_eq!(fd.args.len(), 3);
    assert_eq!(fd.min_args, 1);

    let EntityData::Variable(lo) = &prj.model.entity(fd.args[1]).data else { unreachable!() };
    assert_eq!(lo.value, Atom::Int(0));
}

#[test]
fn test_variadic_flag() {
    let prj = build(&[("t.cpp", "int report(const char* fmt, ...);\n")]);
    let f = func_by_ext(&prj, "report", "report(const char*)");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert!(fd.variadic);
    assert_eq!(fd.args.len(), 1);
}

#[test]
fn test_void_sole_argument_is_empty_list() {
    let prj = build(&[("t.cpp", "int ready(void);\n")]);
    let f = func_by_ext(&prj, "ready", "ready()");
    assert!(prj.model.entity(f).as_func().unwrap().args.is_empty());
}

#[test]
fn test_pure_virtual_declaration() {
    let src = "\
class Stream
{
\t// A stream
public:
\tvirtual int read() = 0;
};
";
    let prj = build(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "Stream::read", "read()");
    let attrs = prj.model.entity(f).base.attrs;
    assert!(attrs.has(cppdoc::semantic::Attrs::PURE_VIRTUAL));
    assert!(attrs.has(cppdoc::semantic::Attrs::VIRTUAL));
}

#[test]
fn test_const_member_flag() {
    let src = "\
class Box
{
\t// A box
public:
\tint size() const;
};
";
    let prj = build(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "Box::size", "size()");
    assert!(prj.model.entity(f).base.attrs.has(cppdoc::semantic::Attrs::CONST_MEMBER));
}

#[test]
fn test_constructor_and_destructor() {
    let src = "\
class Conn
{
\t// A connection
public:
\tConn(int port);
\t~Conn();
};
Conn::Conn(int port)
{
\t// Opens the connection
}
Conn::~Conn()
{
\t// Closes the connection
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    let ctor = func_by_ext(&prj, "Conn::Conn", "Conn(int)");
    assert!(prj.model.entity(ctor).base.attrs.has(cppdoc::semantic::Attrs::CONSTRUCTOR));
    let dtor = func_by_ext(&prj, "Conn::~Conn", "~Conn()");
    assert!(prj.model.entity(dtor).base.attrs.has(cppdoc::semantic::Attrs::DESTRUCTOR));
    // Both gained definition files from the out-of-class bodies
    assert!(prj.model.entity(ctor).as_func().unwrap().def_file.is_some());
    assert!(prj.model.entity(dtor).as_func().unwrap().def_file.is_some());
}

#[test]
fn test_deferred_member_body_sees_later_members() {
    // calc() references limit, declared after it: the body parse
    // defers until the class entity table is fully populated
    let src = "\
class Budget
{
\t// A budget
public:
\tint calc()  { return limit + 1; }
\tint limit; // upper limit
};
";
    let prj = build_clean(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "Budget::calc", "calc()");
    let fd = prj.model.entity(f).as_func().unwrap();
    assert_eq!(fd.ret_points, 1);
    assert_eq!(fd.stmts.iter().filter(|s| s.kind == StmtKind::Return).count(), 1);
}

#[test]
fn test_member_body_parsed_exactly_once() {
    let src = "\
class Once
{
\t// Parsed once
public:
\tint go()  { return 1; }
};
";
    let prj = build_clean(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "Once::go", "go()");
    let fd = prj.model.entity(f).as_func().unwrap();
    // A second parse would double the statement list
    assert_eq!(fd.stmts.len(), 1);
    assert!(prj.deferred.is_empty());
}

#[test]
fn test_ambiguous_overload_reported() {
    let src = "\
int pick(int a)  { return a; }
int pick(long b) { return 2; }
int use_pick()   { return pick('c'); }
";
    let prj = build(&[("t.cpp", src)]);
    assert!(warnings_containing(&prj, "ambiguous") > 0);
}

#[test]
fn test_exact_match_beats_conversion() {
    let src = "\
int pick(int a)    { return a; }
int pick(double b) { return 2; }
int use_pick()     { return pick(7); }
";
    let prj = build(&[("t.cpp", src)]);
    // Exact int match rates 5 against the double conversion's 1
    assert_eq!(warnings_containing(&prj, "ambiguous"), 0);
}

#[test]
fn test_operator_member_function() {
    let src = "\
class Vec
{
\t// A vector
public:
\tbool operator==(int other);
};
";
    let prj = build(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "Vec::operator==", "operator==(int)");
    assert!(prj.model.entity(f).base.attrs.has(cppdoc::semantic::Attrs::OPERATOR));
}

#[test]
fn test_casting_operator_recorded_on_class() {
    let src = "\
class Cents
{
\t// Money
public:
\toperator int(void);
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find_kind(&prj, "Cents", EntityKind::Class);
    let EntityData::Class(c) = &prj.model.entity(class).data else { unreachable!() };
    assert_eq!(c.ops.len(), 1);
    let op = c.ops[0];
    assert_eq!(prj.model.entity(op).as_func().unwrap().tpx.base, Some(prj.model.std.int_));
}

#[test]
fn test_cast_operator_scores_four() {
    use cppdoc::parser::match_arg;
    use cppdoc::semantic::Typlex;

    let src = "\
class Cents
{
\t// Money
public:
\toperator int(void);
};
";
    let prj = build(&[("t.cpp", src)]);
    let class = find(&prj, "Cents").unwrap();

    let expected = Typlex::of(prj.model.std.int_);
    let supplied = Typlex::of(class);
    assert_eq!(match_arg(&prj.model, &expected, &supplied), 4);

    // Exact and conversion scores for contrast
    let int_t = Typlex::of(prj.model.std.int_);
    assert_eq!(match_arg(&prj.model, &int_t, &int_t), 5);
    let long_t = Typlex::of(prj.model.std.long_);
    assert_eq!(match_arg(&prj.model, &int_t, &long_t), 1);
}

#[test]
fn test_body_statement_kinds() {
    let src = "\
int walk(int n)
{
\t// Walks the span
\tint total = 0;
\tfor (int i = 0; i < n; i += 1)
\t{
\t\ttotal += i;
\t}
\twhile (total > 100)
\t\ttotal -= 10;
\tif (total == 0)
\t\treturn 0;
\telse
\t\ttotal += 1;
\tswitch (n)
\t{
\tcase 1:
\t\tbreak;
\tdefault:
\t\tbreak;
\t}
\treturn total;
}
";
    let prj = build_clean(&[("t.cpp", src)]);
    let f = func_by_ext(&prj, "walk", "walk(int)");
    let fd = prj.model.entity(f).as_func().unwrap();
    let count = |k: StmtKind| fd.stmts.iter().filter(|s| s.kind == k).count();

    assert_eq!(count(StmtKind::BranchFor), 1);
    assert_eq!(count(StmtKind::BranchWhile), 1);
    assert_eq!(count(StmtKind::BranchIf), 1);
    assert_eq!(count(StmtKind::BranchSwitch), 1);
    assert_eq!(count(StmtKind::BranchCase), 2);
    assert_eq!(count(StmtKind::Break), 2);
    assert_eq!(count(StmtKind::Return), 2);
    assert_eq!(fd.ret_points, 2);
}

#[test]
fn test_main_detected_for_integrity() {
    let mut prj = cppdoc::Project::new("t");
    let comp = prj.add_component("app", cppdoc::project::CompKind::Program);
    prj.register_file(
        comp,
        "m1.cpp",
        cppdoc::project::FileKind::Source,
        Some("int main()\n{\n\t// entry\n\treturn 0;\n}\n".to_string()),
    );
    prj.register_file(
        comp,
        "m2.cpp",
        cppdoc::project::FileKind::Source,
        Some("int main()\n{\n\t// entry again\n\treturn 0;\n}\n".to_string()),
    );
    prj.process();
    assert!(
        prj.diags
            .all()
            .iter()
            .any(|d| d.message.contains("multiple main()"))
    );
}
