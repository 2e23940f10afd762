//! The semantic model: every declared C++ thing the documentation
//! compiler tracks.
//!
//! Entities live in an arena addressed by stable 32-bit ids; cross
//! references between entities are id fields, never pointers, so the
//! cyclic reference graphs that arise naturally in C++ (a class whose
//! members reference the class) are harmless. Entity tables (scopes)
//! form a second arena, parent-chained for lookup.

mod atom;
mod entity;
mod lookup;
mod model;
mod stmt;
mod table;
mod typlex;

pub use atom::Atom;
pub use entity::{
    Access, Attrs, Basis, ClassData, CompId, DefineData, Entity, EntityBase, EntityData,
    EntityId, EntityKind, EnumData, EnumValData, FuncData, GroupData, LiteralData, MacroData,
    SetData, UnionData, VarData,
};
pub use lookup::{LookupCtx, lookup_member, lookup_string, lookup_token};
pub use model::{Model, StdTypes};
pub use stmt::{Stmt, StmtKind};
pub use table::{EntityTable, ScopeId};
pub use typlex::{TyAttr, Typlex};
