use procdef::ReadError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ReadError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Process not found: {}", .0.display())]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
