//! Entity model export and the structural round trip.

mod helpers;

use helpers::{build, build_clean};

const SAMPLE: &str = "\
#define LIMIT 64 // upper bound
#define SQUARE(x) x * x

typedef unsigned int uint32;

enum Mode
{
\t// Operating modes
\tMODE_OFF,
\tMODE_ON
} ;

class Meter
{
\t// A meter
public:
\tint reading; // current reading
\tint sample(int window);
};

int total; // running total

int add(int v)
{
\t// Adds to the total
\t// Arguments:\t1) v the value to add
\t// Returns:\tTotal after adding
\ttotal = total + v;
\treturn total;
}
";

#[test]
fn test_export_shape() {
    let prj = build_clean(&[("m.cpp", SAMPLE)]);
    let mut out: Vec<u8> = Vec::new();
    prj.export_entities(&mut out).unwrap();
    let xml = String::from_utf8(out).unwrap();

    assert!(xml.contains("<EntityTable name=\"root\">"));
    assert!(xml.contains("<HashDefines>"));
    assert!(xml.contains("hashdef name=\"LIMIT\""));
    assert!(xml.contains("<Macros>"));
    assert!(xml.contains("macro name=\"SQUARE\""));
    assert!(xml.contains("typedef name=\"uint32\""));
    assert!(xml.contains("<enum name=\"Mode\">"));
    assert!(xml.contains("eVal name=\"MODE_OFF\" number=\"0\""));
    assert!(xml.contains("eVal name=\"MODE_ON\" number=\"1\""));
    assert!(xml.contains("<class name=\"Meter\""));
    assert!(xml.contains("variable name=\"total\""));
    assert!(xml.contains("extname=\"add(int)\""));
    // The class carries its own entity table with the member function
    assert!(xml.contains("<EntityTable name=\"Meter\">"));
    assert!(xml.contains("extname=\"sample(int)\""));
}

#[test]
fn test_structural_round_trip() {
    let prj = build_clean(&[("m.cpp", SAMPLE)]);
    let mut out: Vec<u8> = Vec::new();
    prj.export_entities(&mut out).unwrap();
    let xml = String::from_utf8(out).unwrap();

    let imported = cppdoc::export::import_counts(&xml).unwrap();
    let live = cppdoc::export::model_counts(&prj);

    for (kind, count) in &live {
        assert_eq!(
            imported.get(kind),
            Some(count),
            "count of <{kind}> diverged after round trip"
        );
    }
}

#[test]
fn test_export_empty_table_text() {
    let prj = build(&[("e.cpp", "")]);
    // A project with nothing but the predeclared standard types still
    // exports a root table (standard types are not project entities)
    let mut out: Vec<u8> = Vec::new();
    prj.export_entities(&mut out).unwrap();
    let xml = String::from_utf8(out).unwrap();
    assert!(xml.starts_with("<EntityTable name=\"root\">"));
}
