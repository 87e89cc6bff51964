use thiserror::Error;

/// Error kinds surfaced by the class loading core. `Clone` is required so a
/// permanently failed load can replay its error to every later requester.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    #[error("ClassFormatError: {0}")]
    ClassFormat(String),

    #[error("UnsupportedClassVersionError: {0}")]
    UnsupportedVersion(String),

    #[error("ClassNotFoundException: {0}")]
    ClassNotFound(String),

    #[error("NoSuchMethodError: {0}")]
    NoSuchMethod(String),

    #[error("main() method not found in class {0}")]
    NoMainMethod(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub fn cfe(msg: impl Into<String>) -> VmError {
    VmError::ClassFormat(msg.into())
}
