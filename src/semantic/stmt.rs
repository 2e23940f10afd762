//! Statement records.
//!
//! Parsing classifies every statement it recognizes and appends a
//! record to the owning frame (file, class body, or function body).
//! The records drive documentation output and the return-description
//! validator; they are not an executable representation.

use smol_str::SmolStr;

/// Statement classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StmtKind {
    #[default]
    Null,

    // File level
    Using,
    Namespace,
    Typedef,
    ClassDecl,
    ClassDef,
    ClassTmplDef,
    UnionDecl,
    UnionDef,
    EnumDecl,
    EnumDef,
    FuncDecl,
    FuncDef,
    FuncTmplDef,

    // Variable declarations
    VarDeclFnptr,
    VarDeclFnAssign,
    VarDecl,
    VarDeclAssign,
    VarDeclArray,
    VarDeclArrayAssign,
    VarDeclCons,

    // Branches
    BranchIf,
    BranchElse,
    BranchElseIf,
    BranchFor,
    BranchDoWhile,
    BranchWhile,
    BranchSwitch,
    BranchCase,

    // Operations
    VarIncA,
    VarIncB,
    VarDecA,
    VarDecB,
    VarAssign,
    VarMath,
    FuncCall,
    Delete,

    // Jumps and exits
    Continue,
    Break,
    Goto,
    Return,
}

impl StmtKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StmtKind::Null => "null",
            StmtKind::Using => "using",
            StmtKind::Namespace => "namespace",
            StmtKind::Typedef => "typedef",
            StmtKind::ClassDecl => "class declaration",
            StmtKind::ClassDef => "class definition",
            StmtKind::ClassTmplDef => "class template definition",
            StmtKind::UnionDecl => "union declaration",
            StmtKind::UnionDef => "union definition",
            StmtKind::EnumDecl => "enum declaration",
            StmtKind::EnumDef => "enum definition",
            StmtKind::FuncDecl => "function declaration",
            StmtKind::FuncDef => "function definition",
            StmtKind::FuncTmplDef => "function template definition",
            StmtKind::VarDeclFnptr => "function pointer declaration",
            StmtKind::VarDeclFnAssign => "function pointer assignment",
            StmtKind::VarDecl => "variable declaration",
            StmtKind::VarDeclAssign => "variable declaration with assignment",
            StmtKind::VarDeclArray => "array declaration",
            StmtKind::VarDeclArrayAssign => "array declaration with initializer",
            StmtKind::VarDeclCons => "constructed variable declaration",
            StmtKind::BranchIf => "if",
            StmtKind::BranchElse => "else",
            StmtKind::BranchElseIf => "else if",
            StmtKind::BranchFor => "for",
            StmtKind::BranchDoWhile => "do while",
            StmtKind::BranchWhile => "while",
            StmtKind::BranchSwitch => "switch",
            StmtKind::BranchCase => "case",
            StmtKind::VarIncA => "post-increment",
            StmtKind::VarIncB => "pre-increment",
            StmtKind::VarDecA => "post-decrement",
            StmtKind::VarDecB => "pre-decrement",
            StmtKind::VarAssign => "assignment",
            StmtKind::VarMath => "compound assignment",
            StmtKind::FuncCall => "function call",
            StmtKind::Delete => "delete",
            StmtKind::Continue => "continue",
            StmtKind::Break => "break",
            StmtKind::Goto => "goto",
            StmtKind::Return => "return",
        }
    }
}

/// One recognized statement
#[derive(Debug, Clone, Default)]
pub struct Stmt {
    pub kind: StmtKind,
    /// Comment preceding the statement
    pub pretext: String,
    /// Comment attached to the statement
    pub comment: String,
    /// Object, operation description or condition
    pub object: SmolStr,
    pub line: u32,
    /// Token span in the active stream
    pub start: u32,
    pub end: u32,
    /// Code nesting level
    pub level: u32,
    /// Function return point
    pub is_return: bool,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32, start: u32, level: u32) -> Self {
        Self {
            kind,
            line,
            start,
            end: start,
            level,
            ..Default::default()
        }
    }
}
