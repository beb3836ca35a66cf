//! Failures raised while a program runs.

use thiserror::Error;

use crate::diagnostics::{FileError, Span};
use crate::errors::{Error, HostError};
use crate::values::CallError;

/// A runtime failure before it is tied to a source location.
#[derive(Debug, Error)]
pub(crate) enum Fault {
    /// Raised by the VM itself.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A host function returned an error.
    #[error("{0}")]
    Host(HostError),

    /// A host function panicked.
    #[error("{0}")]
    Panic(String),

    #[error("memory budget exceeded")]
    MemoryExceeded,

    #[error("step budget exceeded")]
    StepsExceeded,
}

impl Fault {
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Fault::Runtime(message.into())
    }

    /// The public error for this fault raised at `span`.
    pub(crate) fn at(self, span: Span) -> Error {
        let error = FileError::new(self.to_string(), span);
        match self {
            Fault::MemoryExceeded | Fault::StepsExceeded => Error::ResourceExceeded(error),
            Fault::Host(cause) => Error::Runtime {
                error,
                cause: Some(cause),
            },
            Fault::Runtime(_) | Fault::Panic(_) => Error::Runtime { error, cause: None },
        }
    }
}

impl From<CallError> for Fault {
    fn from(error: CallError) -> Self {
        match error {
            CallError::Host(e) => Fault::Host(e),
            CallError::Panic(message) => Fault::Panic(message),
            CallError::Argument(message) => Fault::Runtime(message),
        }
    }
}
