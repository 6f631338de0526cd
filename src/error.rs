use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to load library from {}: {reason}", path.display())]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("no title tag in {}", .0.display())]
    MissingMetadata(PathBuf),

    #[error("playlist queue is empty")]
    EmptyQueue,

    #[error("selected directory sets contain no pieces")]
    EmptyLibrary,

    #[error("media backend reported invalid timing: {0}")]
    BackendTransient(String),

    #[error("media backend error: {0}")]
    Backend(String),
}

impl PlayerError {
    pub fn library_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LibraryLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
