//! Error types for library handles.

use std::error::Error as StdError;

/// Result type for library operations.
pub type Result<T, E = LibraryError> = std::result::Result<T, E>;

/// Failure reported by the platform loader.
///
/// Carries the OS diagnostic text verbatim (`dlerror()` output on Unix,
/// the system message for `GetLastError()` on Windows).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{diagnostic}")]
pub struct PlatformError {
    diagnostic: String,
}

impl PlatformError {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }

    /// Flatten a loader error and its sources into one line.
    pub(crate) fn from_libloading(err: &libloading::Error) -> Self {
        let mut diagnostic = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            diagnostic.push_str(": ");
            diagnostic.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { diagnostic }
    }

    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }
}

/// Broad outcome of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The OS could not load the image
    Open,
    /// The OS refused to unload the image
    Close,
    /// A symbol lookup failed in a way callers can recover from
    NotFound,
    /// A lookup failed for any other reason
    Unexpected,
    /// The operation was not valid for the value it was applied to
    Usage,
}

/// Library handle error type.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("could not open library %{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: PlatformError,
    },

    #[error("could not close library %{path}: {source}")]
    Close {
        path: String,
        #[source]
        source: PlatformError,
    },

    #[error("symbol `{name}` not found: {source}")]
    SymbolNotFound {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error("unexpected failure looking up `{name}`: {source}")]
    Lookup {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error("could not find collator function `{linkname}` in library: {source}")]
    CollatorNotFound {
        linkname: String,
        #[source]
        source: PlatformError,
    },

    #[error("collator function `{linkname}` resolved to a null address")]
    NullCollator { linkname: String },

    #[error("library %{path} is already closed")]
    AlreadyClosed { path: String },

    #[error("cannot look up `{name}` in closed library %{path}")]
    ClosedLookup { path: String, name: String },

    #[error("library! values cannot be modified")]
    Immutable,

    #[error("expected {expected} but got {actual}")]
    UnexpectedType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("cannot make library! with a {0} parent")]
    BadMakeParent(&'static str),
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Open { .. } => ErrorKind::Open,
            LibraryError::Close { .. } => ErrorKind::Close,
            LibraryError::SymbolNotFound { .. } => ErrorKind::NotFound,
            LibraryError::Lookup { .. }
            | LibraryError::CollatorNotFound { .. }
            | LibraryError::NullCollator { .. } => ErrorKind::Unexpected,
            LibraryError::AlreadyClosed { .. }
            | LibraryError::ClosedLookup { .. }
            | LibraryError::Immutable
            | LibraryError::UnexpectedType { .. }
            | LibraryError::BadMakeParent(_) => ErrorKind::Usage,
        }
    }

    /// Returns `true` for the one outcome a caller is expected to handle,
    /// typically by trying another symbol name.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_usage_error(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    /// OS diagnostic text, when the failure came from the loader.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            LibraryError::Open { source, .. }
            | LibraryError::Close { source, .. }
            | LibraryError::SymbolNotFound { source, .. }
            | LibraryError::Lookup { source, .. }
            | LibraryError::CollatorNotFound { source, .. } => Some(source.diagnostic()),
            _ => None,
        }
    }
}
