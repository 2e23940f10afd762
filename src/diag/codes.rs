//! The closed error code enumeration.
//!
//! Routines return `Result<_, ErrorCode>`; success is `Ok(())` so there
//! is no `E_OK` variant. The remaining codes match the taxonomy used in
//! every diagnostic line.

use thiserror::Error;

/// Error codes returned by analyzer routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// Input does not match any recognized form
    #[error("E_SYNTAX")]
    Syntax,
    /// A named entity could not be resolved
    #[error("E_NOTFOUND")]
    NotFound,
    /// A name is already taken within the scope
    #[error("E_DUPLICATE")]
    Duplicate,
    /// Internal state is inconsistent (loop guard, bad token links)
    #[error("E_CORRUPT")]
    Corrupt,
    /// Required content is absent
    #[error("E_NODATA")]
    NoData,
    /// A routine was called with an unusable argument
    #[error("E_ARGUMENT")]
    Argument,
    /// Content present but malformed
    #[error("E_FORMAT")]
    Format,
    /// An entity is being redefined as something else
    #[error("E_CONFLICT")]
    Conflict,
    /// Operating on an uninitialized object
    #[error("E_NOINIT")]
    NoInit,
    /// Type mismatch in an expression or assignment
    #[error("E_TYPE")]
    Type,
    /// A file could not be opened
    #[error("E_OPENFAIL")]
    OpenFail,
    /// Output could not be written
    #[error("E_WRITEFAIL")]
    WriteFail,
    /// Allocation failure
    #[error("E_MEMORY")]
    Memory,
}
