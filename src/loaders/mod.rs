//! Asset loaders.

mod obj_loader;

pub use obj_loader::ObjLoader;

use thiserror::Error;

/// Errors that can occur while loading mesh assets.
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error reading a file.
    #[error("Failed to read {0}: {1}")]
    Io(String, String),

    /// Malformed mesh data.
    #[error("Malformed mesh data: {0}")]
    Malformed(String),

    /// A face referenced an attribute index out of range.
    #[error("Face index out of range: {0}")]
    IndexOutOfRange(String),
}
