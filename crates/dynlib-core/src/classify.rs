//! Symbol lookup failure classification.
//!
//! Loaders do not agree on an error code for "no such symbol", so the
//! decision is made on the diagnostic text. Known phrasings:
//!
//! - Windows: `The specified procedure could not be found.`
//! - macOS: `dlsym(0x..., foo): symbol not found`
//! - musl: `Symbol not found: foo`
//!
//! Text that mentions a missing shared object is not a missing symbol.

/// Outcome of classifying a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// The symbol is absent; the caller may try something else
    NotFound,
    /// Anything else (bad handle, corrupt image, relocation error, ...)
    Unexpected,
}

impl LookupFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupFailure::NotFound => "not-found",
            LookupFailure::Unexpected => "unexpected",
        }
    }
}

/// Classify a loader diagnostic produced by a failed symbol lookup.
pub fn classify_lookup_failure(diagnostic: &str) -> LookupFailure {
    if diagnostic.contains("could not be found")
        || (diagnostic.contains("not found") && !diagnostic.contains("shared"))
    {
        LookupFailure::NotFound
    } else {
        LookupFailure::Unexpected
    }
}
