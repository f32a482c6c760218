// ============================================================================
// error.rs — Conversion error taxonomy
// ============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// The only fatal conditions of a conversion run. Malformed macros, missing
/// source files and unresolved references are reported through
/// [`crate::diag::Diagnostics`] instead and never abort the run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A qmake project was detected where a configure script was expected.
    /// This conversion path is not implemented; the run terminates with a
    /// distinct exit status.
    #[error("qmake project conversion is not implemented (found {})", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl ConvertError {
    /// Process exit code for this error. Unimplemented conversion paths get
    /// their own status so callers can tell them from ordinary failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::UnsupportedFormat(_) => 2,
            _ => 1,
        }
    }
}
