//! # cppdoc-base
//!
//! Core library for C++ source analysis and documentation compilation.
//!
//! Given a project declared as a hierarchy of components (libraries,
//! programs, suites), each owning header, source and document files, the
//! crate lexes and preprocesses the C++ code base, parses it into a
//! cross-referenced entity model, attaches structured comments to the
//! entities they document, and exports the model as a nested XML
//! document.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project   → configuration, components, per-component driver
//!   ↓
//! export    → XML serialization of the entity model
//!   ↓
//! comments  → structured comment processors
//!   ↓
//! parser    → recursive-descent parser over the active stream
//!   ↓
//! preproc   → directive evaluation, #define/macro expansion, includes
//!   ↓
//! semantic  → entity model, entity tables, typlex, lookup engine
//!   ↓
//! lexer     → tab expansion, logos lexer, raw stream assembly
//!   ↓
//! token     → token model, kind enumeration, delimiter matcher
//!   ↓
//! diag      → severity, error codes, diagnostic sink
//!   ↓
//! base      → character classifier, FileId, interning, positions
//! ```

/// Foundation types: character classifier, FileId, string interning
pub mod base;

/// Diagnostics: severity levels, error codes, per-file sinks
pub mod diag;

/// Token model: kinds with category masks, tokens, delimiter matching
pub mod token;

/// Lexer: tab expansion and raw token stream assembly
pub mod lexer;

/// Semantic model: entities, entity tables, typlexes, lookup
pub mod semantic;

/// Preprocessor: directives, #define/macro expansion, include graph
pub mod preproc;

/// Parser: recursive-descent construction of the entity model
pub mod parser;

/// Comment processors: internal, external and trailing comments
pub mod comments;

/// Project management: configuration, components, driver
pub mod project;

/// Entity model export as XML
pub mod export;

// Re-export foundation types
pub use base::{FileId, Interner, Position, Span, StrId};
pub use diag::{ErrorCode, Severity};
pub use project::Project;
pub use token::{Token, TokenKind};
