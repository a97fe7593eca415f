//! Core types for dynlib.
//!
//! A [`Library`] is a host value standing for one loaded native image
//! (.so/.dylib/.dll). Symbols are resolved through the [`platform`] loader,
//! lookup failures are sorted into recoverable and unexpected outcomes by
//! [`classify`], and [`collator`] runs an extension's entry point against
//! the host API table.

pub mod classify;
pub mod collator;
pub mod config;
pub mod error;
pub mod library;
pub mod natives;
pub mod platform;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify_lookup_failure, LookupFailure};
pub use collator::{host_api, run_library_collator};
pub use config::{Binding, ConfigError, LoaderConfig, Visibility};
pub use error::{ErrorKind, LibraryError, PlatformError, Result};
pub use library::{Library, Symbol};
pub use platform::{Image, Loader, SymbolAddress, SystemLoader};
pub use value::{file_to_local, Value};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::error::{ErrorKind, LibraryError, Result};
    pub use crate::library::{Library, Symbol};
    pub use crate::platform::{Loader, SystemLoader};
    pub use crate::value::Value;
    pub use dynlib_sdk::{HostApi, RawValue, ABI_VERSION};
}
