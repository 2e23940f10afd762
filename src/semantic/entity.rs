//! The entity model.
//!
//! Any entity either IS a data type (class, union, enum, typedef,
//! standard type, template argument), HAS a data type (variable, enum
//! value, function), or is one of the preprocessor and grouping forms
//! (namespace, #define, literal, macro, function group, function set).
//! The tagged variant flattens that hierarchy; `kind()` is the
//! discriminant every former virtual dispatch becomes a match over.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::FileId;
use crate::token::Token;

use super::atom::Atom;
use super::stmt::Stmt;
use super::table::ScopeId;
use super::typlex::Typlex;

/// Stable identifier of an entity in the arena. Ids are monotonic
/// across the process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a project component (library, program, suite)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompId(pub u32);

impl CompId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scope classifier: where an entity is visible from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Unknown,
    Global,
    FileStatic,
    FuncLocal,
    Private,
    Protected,
    Public,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Unknown => "unknown",
            Access::Global => "global",
            Access::FileStatic => "file-static",
            Access::FuncLocal => "function-local",
            Access::Private => "private",
            Access::Protected => "protected",
            Access::Public => "public",
        }
    }
}

/// Entity attribute bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrs(pub u32);

impl Attrs {
    pub const NONE: Attrs = Attrs(0);
    /// Class was declared with `struct`
    pub const STRUCT: Attrs = Attrs(0x0000_0001);
    pub const TEMPLATE: Attrs = Attrs(0x0000_0002);
    pub const ABSTRACT: Attrs = Attrs(0x0000_0004);
    /// Function is global, not a class member
    pub const GLOBAL_FN: Attrs = Attrs(0x0000_0010);
    pub const CONSTRUCTOR: Attrs = Attrs(0x0000_0020);
    pub const DESTRUCTOR: Attrs = Attrs(0x0000_0040);
    pub const OPERATOR: Attrs = Attrs(0x0000_0080);
    pub const STATIC: Attrs = Attrs(0x0000_0200);
    pub const FRIEND: Attrs = Attrs(0x0000_0400);
    pub const INLINE: Attrs = Attrs(0x0000_0800);
    /// `const` after the argument block
    pub const CONST_MEMBER: Attrs = Attrs(0x0000_1000);
    pub const VIRTUAL: Attrs = Attrs(0x0000_2000);
    pub const PURE_VIRTUAL: Attrs = Attrs(0x0000_4000);
    pub const EXTERN: Attrs = Attrs(0x0000_8000);
    /// Name begins with underscore: internal support, excluded from
    /// output navigation
    pub const INTERNAL: Attrs = Attrs(0x0001_0000);
    /// Function group has only one printable function
    pub const GRP_SOLO: Attrs = Attrs(0x0002_0000);
    pub const PRINTABLE: Attrs = Attrs(0x0004_0000);
    pub const REGISTER: Attrs = Attrs(0x0008_0000);
    pub const MUTABLE: Attrs = Attrs(0x0010_0000);

    #[inline]
    pub fn has(self, a: Attrs) -> bool {
        self.0 & a.0 != 0
    }

    #[inline]
    pub fn set(&mut self, a: Attrs) {
        self.0 |= a.0;
    }
}

impl std::ops::BitOr for Attrs {
    type Output = Attrs;
    fn bitor(self, rhs: Attrs) -> Attrs {
        Attrs(self.0 | rhs.0)
    }
}

/// Fundamental basis of a data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Basis {
    #[default]
    Null,
    Void,
    Enum,
    Bool,
    String,
    Double,
    Int64,
    Int32,
    Int16,
    Int8,
    Unt64,
    Unt32,
    Unt16,
    Unt8,
    Class,
    TmplArg,
    Union,
    VarArg,
}

impl Basis {
    pub fn is_signed_int(self) -> bool {
        matches!(self, Basis::Int64 | Basis::Int32 | Basis::Int16 | Basis::Int8)
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(self, Basis::Unt64 | Basis::Unt32 | Basis::Unt16 | Basis::Unt8)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self == Basis::Double
    }
}

/// Discriminant of the entity variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Namespace,
    Class,
    Union,
    Enum,
    EnumVal,
    StdType,
    Typedef,
    TemplateArg,
    Variable,
    Function,
    FuncGroup,
    FuncSet,
    Define,
    Literal,
    Macro,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Namespace => "namespace",
            EntityKind::Class => "class",
            EntityKind::Union => "union",
            EntityKind::Enum => "enum",
            EntityKind::EnumVal => "enum value",
            EntityKind::StdType => "standard type",
            EntityKind::Typedef => "typedef",
            EntityKind::TemplateArg => "template argument",
            EntityKind::Variable => "variable",
            EntityKind::Function => "function",
            EntityKind::FuncGroup => "function group",
            EntityKind::FuncSet => "function set",
            EntityKind::Define => "#define",
            EntityKind::Literal => "literal",
            EntityKind::Macro => "macro",
        }
    }
}

/// Fields common to every entity
#[derive(Debug, Clone, Default)]
pub struct EntityBase {
    pub name: SmolStr,
    pub fqname: SmolStr,
    pub access: Access,
    pub comp: Option<CompId>,
    pub attrs: Attrs,
    pub desc: String,
    pub category: SmolStr,
}

#[derive(Debug, Clone, Default)]
pub struct ClassData {
    pub table: ScopeId,
    pub base: Option<EntityId>,
    /// Host class when this class is nested
    pub parent: Option<EntityId>,
    /// Member functions in declaration order
    pub funcs: Vec<EntityId>,
    /// Operator functions, consulted for cast scoring
    pub ops: Vec<EntityId>,
    /// Template arguments when templated
    pub targs: Vec<EntityId>,
    pub friends: Vec<EntityId>,
    pub def_file: Option<FileId>,
    pub def_span: (u32, u32),
    /// Statements of the definition body
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Default)]
pub struct UnionData {
    pub table: ScopeId,
    pub host: Option<EntityId>,
    pub def_file: Option<FileId>,
    pub def_span: (u32, u32),
}

#[derive(Debug, Clone, Default)]
pub struct EnumData {
    pub by_name: IndexMap<SmolStr, EntityId>,
    pub by_num: IndexMap<i64, EntityId>,
    pub def_file: Option<FileId>,
    pub def_span: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct EnumValData {
    pub parent: EntityId,
    pub num: i64,
    pub text: SmolStr,
}

#[derive(Debug, Clone, Default)]
pub struct VarData {
    pub tpx: Typlex,
    pub parent: Option<EntityId>,
    pub decl_file: Option<FileId>,
    /// Literal value for extern constants and argument defaults
    pub value: Atom,
}

#[derive(Debug, Clone, Default)]
pub struct FuncData {
    /// Return type
    pub tpx: Typlex,
    /// Full name with argument typlexes, the unique key
    pub ext_name: SmolStr,
    pub args: Vec<EntityId>,
    pub targs: Vec<EntityId>,
    pub arg_desc: Vec<(SmolStr, String)>,
    pub ret_desc: Vec<(SmolStr, String)>,
    pub stmts: Vec<Stmt>,
    pub parent: Option<EntityId>,
    pub table: Option<ScopeId>,
    pub group: Option<EntityId>,
    pub set: Option<EntityId>,
    pub decl_file: Option<FileId>,
    pub def_file: Option<FileId>,
    pub body_span: (u32, u32),
    /// args.len() minus trailing defaults
    pub min_args: u16,
    pub variadic: bool,
    /// Return points counted during body parse
    pub ret_points: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GroupData {
    pub funcs: Vec<EntityId>,
    pub arg_desc: Vec<(SmolStr, String)>,
    pub ret_desc: Vec<(SmolStr, String)>,
    pub title: SmolStr,
}

#[derive(Debug, Clone, Default)]
pub struct SetData {
    pub funcs: Vec<EntityId>,
    pub arg_desc: Vec<(SmolStr, String)>,
    pub ret_desc: Vec<(SmolStr, String)>,
    pub title: SmolStr,
}

#[derive(Debug, Clone, Default)]
pub struct DefineData {
    pub ersatz: Vec<Token>,
    pub def_file: Option<FileId>,
    pub def_span: (u32, u32),
}

#[derive(Debug, Clone)]
pub struct LiteralData {
    pub basis: Basis,
    pub text: SmolStr,
    pub value: Atom,
    pub def_file: Option<FileId>,
}

#[derive(Debug, Clone, Default)]
pub struct MacroData {
    /// Formal argument name → 1-based ordinal
    pub formals: IndexMap<SmolStr, u16>,
    pub ersatz: Vec<Token>,
    pub def_file: Option<FileId>,
    pub def_span: (u32, u32),
}

/// Per-variant payload
#[derive(Debug, Clone)]
pub enum EntityData {
    Namespace { table: ScopeId },
    StdType { basis: Basis },
    Class(ClassData),
    Union(UnionData),
    Enum(EnumData),
    EnumVal(EnumValData),
    Typedef { resolve: Typlex, def_file: Option<FileId> },
    TemplateArg { order: u16 },
    Variable(VarData),
    Function(FuncData),
    FuncGroup(GroupData),
    FuncSet(SetData),
    Define(DefineData),
    Literal(LiteralData),
    Macro(MacroData),
}

/// A declared thing: uniform base fields plus the variant payload.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub base: EntityBase,
    pub data: EntityData,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match &self.data {
            EntityData::Namespace { .. } => EntityKind::Namespace,
            EntityData::StdType { .. } => EntityKind::StdType,
            EntityData::Class(_) => EntityKind::Class,
            EntityData::Union(_) => EntityKind::Union,
            EntityData::Enum(_) => EntityKind::Enum,
            EntityData::EnumVal(_) => EntityKind::EnumVal,
            EntityData::Typedef { .. } => EntityKind::Typedef,
            EntityData::TemplateArg { .. } => EntityKind::TemplateArg,
            EntityData::Variable(_) => EntityKind::Variable,
            EntityData::Function(_) => EntityKind::Function,
            EntityData::FuncGroup(_) => EntityKind::FuncGroup,
            EntityData::FuncSet(_) => EntityKind::FuncSet,
            EntityData::Define(_) => EntityKind::Define,
            EntityData::Literal(_) => EntityKind::Literal,
            EntityData::Macro(_) => EntityKind::Macro,
        }
    }

    /// True for entities that ARE a data type
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind(),
            EntityKind::Class
                | EntityKind::Union
                | EntityKind::Enum
                | EntityKind::StdType
                | EntityKind::Typedef
                | EntityKind::TemplateArg
        )
    }

    /// True for entities that HAVE a data type
    pub fn is_real(&self) -> bool {
        matches!(
            self.kind(),
            EntityKind::Variable
                | EntityKind::EnumVal
                | EntityKind::Function
                | EntityKind::FuncGroup
                | EntityKind::Define
                | EntityKind::Literal
                | EntityKind::Macro
        )
    }

    /// Basis of the data type this entity is, Null for non-types.
    /// Typedef resolution requires the arena, so the caller resolves
    /// through [`super::Model::basis_of`] instead where that matters.
    pub fn own_basis(&self) -> Basis {
        match &self.data {
            EntityData::StdType { basis } => *basis,
            EntityData::Class(_) => Basis::Class,
            EntityData::Union(_) => Basis::Union,
            EntityData::Enum(_) => Basis::Enum,
            EntityData::TemplateArg { .. } => Basis::TmplArg,
            _ => Basis::Null,
        }
    }

    /// Owned entity table where the variant has one
    pub fn own_scope(&self) -> Option<ScopeId> {
        match &self.data {
            EntityData::Namespace { table } => Some(*table),
            EntityData::Class(c) => Some(c.table),
            EntityData::Union(u) => Some(u.table),
            EntityData::Function(f) => f.table,
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncData> {
        match &self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_func_mut(&mut self) -> Option<&mut FuncData> {
        match &mut self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.data {
            EntityData::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.data {
            EntityData::Class(c) => Some(c),
            _ => None,
        }
    }
}
