//! Foundation types for the cppdoc toolchain.
//!
//! This module provides fundamental types used throughout the analyzer:
//! - [`chars`] - Character classification table and predicates
//! - [`FileId`] - Compact file identifiers
//! - [`Interner`], [`StrId`] - String interning
//! - [`Position`], [`Span`] - Line/column positions for diagnostics
//!
//! This module has NO dependencies on other cppdoc modules.

pub mod chars;
mod file_id;
mod intern;
mod position;

pub use file_id::FileId;
pub use intern::{Interner, StrId};
pub use position::{Position, Span};
