//! BOM structural errors

use miette::Diagnostic;
use thiserror::Error;

/// Structural violations of the BOM graph
///
/// All variants are raised before any mutation takes place.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum BomError {
    /// Bad input: non-positive quantity, self-reference, blank field
    #[error("validation failed: {message}")]
    #[diagnostic(code(forge::bom::validation))]
    Validation { message: String },

    /// The edge would make a part transitively require itself
    #[error("BOM cycle: {}", path.join(" -> "))]
    #[diagnostic(
        code(forge::bom::cycle),
        help("a part must never require itself through its own components")
    )]
    Cycle { path: Vec<String> },

    /// A referenced part does not exist
    #[error("{what} not found: {id}")]
    #[diagnostic(code(forge::bom::not_found))]
    NotFound { what: &'static str, id: String },

    /// Traversal went deeper than the configured limit
    #[error("BOM depth limit of {limit} exceeded below {root}")]
    #[diagnostic(
        code(forge::bom::depth),
        help("raise max_depth in .forge/config.yaml if the structure is really this deep")
    )]
    DepthExceeded { root: String, limit: usize },
}

impl BomError {
    pub fn validation(message: impl Into<String>) -> Self {
        BomError::Validation {
            message: message.into(),
        }
    }

    pub fn part_not_found(id: impl ToString) -> Self {
        BomError::NotFound {
            what: "part",
            id: id.to_string(),
        }
    }
}
