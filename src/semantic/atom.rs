//! Compile-time constant values.

use smol_str::SmolStr;

/// A statically derivable value: the evaluation of a literal, an enum
/// value, or a constant expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Atom {
    #[default]
    Null,
    Int(i64),
    Uint(u64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(SmolStr),
}

impl Atom {
    pub fn is_null(&self) -> bool {
        matches!(self, Atom::Null)
    }

    /// Numeric view for arithmetic; strings and null have none.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Atom::Int(v) => Some(*v),
            Atom::Uint(v) => Some(*v as i64),
            Atom::Bool(b) => Some(*b as i64),
            Atom::Char(c) => Some(*c as i64),
            Atom::Double(d) => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Atom::Int(v) => Some(*v as f64),
            Atom::Uint(v) => Some(*v as f64),
            Atom::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// True for the literal zero, which is usable as any numeric or
    /// pointer value.
    pub fn is_zero(&self) -> bool {
        matches!(self, Atom::Int(0) | Atom::Uint(0))
    }

    pub fn render(&self) -> String {
        match self {
            Atom::Null => String::new(),
            Atom::Int(v) => v.to_string(),
            Atom::Uint(v) => v.to_string(),
            Atom::Double(d) => d.to_string(),
            Atom::Bool(b) => b.to_string(),
            Atom::Char(c) => c.to_string(),
            Atom::Str(s) => s.to_string(),
        }
    }
}
