//! The typlex: a fully qualified C++ type expression.
//!
//! A typlex combines the base data type with its operational context:
//! indirection level (negative for reference-to, zero for instance,
//! positive for pointer depth), array extent, attribute bits, and sub
//! typlexes (template arguments, or argument types when the typlex is
//! a function pointer).

use super::entity::{Basis, EntityId};
use super::model::Model;
use crate::diag::ErrorCode;

/// Typlex attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TyAttr(pub u16);

impl TyAttr {
    pub const NONE: TyAttr = TyAttr(0);
    pub const TEMPLATE: TyAttr = TyAttr(0x0001);
    pub const TMPLARG: TyAttr = TyAttr(0x0002);
    pub const VARARG: TyAttr = TyAttr(0x0004);
    pub const STATIC: TyAttr = TyAttr(0x0008);
    pub const CONST: TyAttr = TyAttr(0x0010);
    /// C++ standard type outside the examined code base
    pub const SYSTEM: TyAttr = TyAttr(0x0020);
    pub const LITERAL: TyAttr = TyAttr(0x0040);
    /// Literal zero: usable as any numeric or pointer value
    pub const ZERO: TyAttr = TyAttr(0x0080);
    pub const LVALUE: TyAttr = TyAttr(0x0100);
    pub const REFERENCE: TyAttr = TyAttr(0x0200);
    pub const FNPTR: TyAttr = TyAttr(0x0400);

    #[inline]
    pub fn has(self, a: TyAttr) -> bool {
        self.0 & a.0 != 0
    }

    #[inline]
    pub fn set(&mut self, a: TyAttr) {
        self.0 |= a.0;
    }
}

/// Fully qualified type expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Typlex {
    pub base: Option<EntityId>,
    /// 0 instance, -1 reference, 1 `*`, 2 `**` …
    pub indir: i16,
    /// Number of elements; 1 = not an array
    pub elements: u32,
    pub attrs: TyAttr,
    /// Template arguments, or argument types for function pointers
    pub args: Vec<Typlex>,
}

impl Typlex {
    pub fn of(base: EntityId) -> Self {
        Self {
            base: Some(base),
            elements: 1,
            ..Default::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.base.is_none()
    }

    pub fn is_reference(&self) -> bool {
        self.indir < 0 || self.attrs.has(TyAttr::REFERENCE)
    }

    pub fn is_pointer(&self) -> bool {
        self.indir > 0
    }

    pub fn basis(&self, model: &Model) -> Basis {
        match self.base {
            Some(id) => model.basis_of(id),
            None => Basis::Null,
        }
    }

    /// Exact type identity: same base, same indirection, same template
    /// arguments.
    pub fn same(&self, other: &Typlex) -> bool {
        self.base == other.base && self.indir == other.indir && self.args == other.args
    }

    /// Would a value of typlex `supp` be accepted where `self` is
    /// expected? This is the implicit-conversion acceptability rule:
    /// literal zero fits any numeric or pointer, numerics interconvert,
    /// enums decay to integers, and bool accepts numerics.
    pub fn test_set(&self, model: &Model, supp: &Typlex) -> Result<(), ErrorCode> {
        if self.base == supp.base && self.indir.unsigned_abs() == supp.indir.unsigned_abs() {
            return Ok(());
        }
        if supp.attrs.has(TyAttr::ZERO) && (self.is_pointer() || self.basis(model).is_numeric()) {
            return Ok(());
        }

        let eb = self.basis(model);
        let sb = supp.basis(model);
        if self.indir == 0 && supp.indir == 0 {
            if eb.is_numeric() && (sb.is_numeric() || sb == Basis::Enum || sb == Basis::Bool) {
                return Ok(());
            }
            if eb == Basis::Bool && (sb.is_numeric() || sb == Basis::Bool) {
                return Ok(());
            }
            if eb == Basis::Enum && sb.is_integer() {
                return Ok(());
            }
        }
        Err(ErrorCode::Type)
    }

    /// Compact rendering used in extended names and diagnostics, e.g.
    /// `const char*` or `hzMapS<hzString,ceEntity*>&`.
    pub fn render(&self, model: &Model) -> String {
        let mut out = String::new();
        if self.attrs.has(TyAttr::CONST) {
            out.push_str("const ");
        }
        match self.base {
            Some(id) => out.push_str(&model.entity(id).base.name),
            None => out.push_str("?"),
        }
        if !self.args.is_empty() && !self.attrs.has(TyAttr::FNPTR) {
            out.push('<');
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&a.render(model));
            }
            out.push('>');
        }
        for _ in 0..self.indir.max(0) {
            out.push('*');
        }
        if self.is_reference() {
            out.push('&');
        }
        if self.attrs.has(TyAttr::FNPTR) {
            out.push_str("(*)(");
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&a.render(model));
            }
            out.push(')');
        }
        out
    }
}
