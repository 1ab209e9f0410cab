use std::path::PathBuf;

use thiserror::Error;

use crate::cut::CutRange;

/// Failures that abort an extraction or resolution call.
///
/// Public entry points return `anyhow::Result` with path context layered on
/// top; callers that need to branch on the kind can `downcast_ref::<MapError>()`.
#[derive(Debug, Error)]
pub enum MapError {
    /// Two cut ranges intersect without one containing the other.
    #[error("cut ranges {first} and {second} partially overlap")]
    Overlap { first: CutRange, second: CutRange },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    /// The parser returned no tree at all (not the same as a tree with ERROR nodes).
    #[error("failed to parse {}", path.display())]
    Parse { path: PathBuf },

    #[error("invalid {grammar} query: {message}")]
    Query { grammar: &'static str, message: String },

    #[error("grammar {grammar} is not compiled into this build")]
    UnknownGrammar { grammar: &'static str },

    #[error("operation cancelled")]
    Cancelled,
}

pub type MapResult<T> = std::result::Result<T, MapError>;
