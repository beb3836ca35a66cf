//! Public error types.
//!
//! Every stage ends in one terminal [`Error`]. Compile-time problems carry a
//! [`FileError`] so callers can pull out the line, column and snippet; errors
//! raised by host functions keep the original error value in a [`HostError`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::FileError;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Lexing, parsing, type checking, folding or code generation failed.
    #[error("{0}")]
    Compile(FileError),

    /// The program failed while running.
    ///
    /// `cause` holds the host error when a host function call failed.
    #[error("{error}")]
    Runtime {
        error: FileError,
        #[source]
        cause: Option<HostError>,
    },

    /// The VM step or memory budget was exhausted.
    #[error("{0}")]
    ResourceExceeded(FileError),

    /// The expression type cannot produce the requested result kind.
    #[error("{0}")]
    Expect(String),

    /// A constant-expression function reported its own error at compile time.
    #[error("{0}")]
    Host(HostError),

    /// The compile configuration is inconsistent.
    #[error("{0}")]
    Config(String),
}

impl Error {
    /// Resolves any unbound location against `source`.
    pub fn bind(self, source: &str) -> Self {
        match self {
            Error::Compile(e) => Error::Compile(e.bind(source)),
            Error::Runtime { error, cause } => Error::Runtime {
                error: error.bind(source),
                cause,
            },
            Error::ResourceExceeded(e) => Error::ResourceExceeded(e.bind(source)),
            other => other,
        }
    }

    /// The location-tagged diagnostic, when there is one.
    pub fn file_error(&self) -> Option<&FileError> {
        match self {
            Error::Compile(e) | Error::ResourceExceeded(e) => Some(e),
            Error::Runtime { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<FileError> for Error {
    fn from(error: FileError) -> Self {
        Error::Compile(error)
    }
}

/// An error produced by host code.
///
/// Cheap to clone; the wrapped value can be recovered with
/// [`HostError::downcast_ref`].
#[derive(Clone)]
pub struct HostError(Arc<dyn std::error::Error + Send + Sync>);

impl HostError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HostError(Arc::new(error))
    }

    /// A host error carrying only a message.
    pub fn msg(message: impl fmt::Display) -> Self {
        HostError(Arc::new(Message(message.to_string())))
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);
