use thiserror::Error;

use crate::kind::FileKind;
use crate::store::StoreError;

/// Errors raised by tree and project operations.
/// 專案樹與專案操作的錯誤類型。
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("`{name}` already belongs to a directory")]
    AlreadyParented { name: String },
    #[error("`{name}` is not a child of `{directory}`")]
    ParentMismatch { name: String, directory: String },
    #[error("status stack cannot pop the idle sentinel")]
    StatusUnderflow,
    #[error("name collision not handled for `{name}`")]
    NameCollision { name: String },
    #[error("`{name}` already exists in `{directory}`")]
    NameTaken { name: String, directory: String },
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("`{path}` is not a directory")]
    NotADirectory { path: String },
    #[error("`{path}` exists as {found}, expected {expected}")]
    KindMismatch {
        path: String,
        expected: FileKind,
        found: FileKind,
    },
    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("no notebook host is attached to this project")]
    NoNotebookHost,
    #[error("notebook host failed to open `{path}`: {message}")]
    Notebook { path: String, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProjectError {
    /// Returns `true` for caller bugs (as opposed to store or lookup failures).
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            ProjectError::AlreadyParented { .. }
                | ProjectError::ParentMismatch { .. }
                | ProjectError::StatusUnderflow
        )
    }
}
