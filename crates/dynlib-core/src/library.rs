//! Library values.
//!
//! A [`Library`] is a cheap handle onto a shared record holding one OS
//! image handle. Clones share the record, so closing through any of them
//! closes it for all. A closed library stays closed; open a new one instead.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::classify::{classify_lookup_failure, LookupFailure};
use crate::error::{LibraryError, PlatformError, Result};
use crate::platform::{Image, Loader, SymbolAddress, SystemLoader};
use crate::value::file_to_local;

struct LibraryRecord {
    /// Host file text the library was opened with
    path: String,
    /// `None` once closed
    handle: Mutex<Option<Box<dyn Image>>>,
}

/// Handle to a loaded native library.
#[derive(Clone)]
pub struct Library {
    record: Arc<LibraryRecord>,
}

impl Library {
    /// Open `path` with the system loader and default options.
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with(&SystemLoader::new(), path)
    }

    /// Open `path` (host file text) through `loader`.
    pub fn open_with(loader: &dyn Loader, path: &str) -> Result<Self> {
        let local = file_to_local(path);
        let image = loader.open(&local).map_err(|source| LibraryError::Open {
            path: path.to_string(),
            source,
        })?;
        debug!(path, "opened library");

        Ok(Self {
            record: Arc::new(LibraryRecord {
                path: path.to_string(),
                handle: Mutex::new(Some(image)),
            }),
        })
    }

    /// The path text this library was opened with.
    pub fn path(&self) -> &str {
        &self.record.path
    }

    pub fn is_open(&self) -> bool {
        self.record.handle.lock().is_some()
    }

    /// Close the library.
    ///
    /// Closing a library that is already closed is a usage error. If the OS
    /// refuses to unload the image the library is still marked closed.
    pub fn close(&self) -> Result<()> {
        match self.take_handle() {
            Some(image) => self.unload(image),
            None => Err(LibraryError::AlreadyClosed {
                path: self.record.path.clone(),
            }),
        }
    }

    /// Close the library if it is still open.
    ///
    /// Unlike [`Library::close`] this accepts an already closed library and
    /// returns `Ok(false)` for it.
    pub fn release(&self) -> Result<bool> {
        match self.take_handle() {
            Some(image) => self.unload(image).map(|()| true),
            None => Ok(false),
        }
    }

    /// Resolve `name`.
    ///
    /// A failed lookup is [`LibraryError::SymbolNotFound`] when the loader
    /// diagnostic reads like a missing symbol, [`LibraryError::Lookup`]
    /// otherwise. Looking up in a closed library is a usage error.
    pub fn pick(&self, name: &str) -> Result<Symbol> {
        let address = self.find_raw(name)?.map_err(|source| {
            match classify_lookup_failure(source.diagnostic()) {
                LookupFailure::NotFound => {
                    debug!(path = %self.record.path, name, "symbol not found");
                    LibraryError::SymbolNotFound {
                        name: name.to_string(),
                        source,
                    }
                }
                LookupFailure::Unexpected => {
                    warn!(
                        path = %self.record.path,
                        name,
                        diagnostic = source.diagnostic(),
                        "unexpected symbol lookup failure"
                    );
                    LibraryError::Lookup {
                        name: name.to_string(),
                        source,
                    }
                }
            }
        })?;

        Ok(Symbol {
            name: name.to_string(),
            address,
            library: self.clone(),
        })
    }

    /// Resolve the first of `names` that exists.
    ///
    /// Recoverable failures move on to the next name; any other failure is
    /// returned immediately. `Ok(None)` means none of the names were found.
    pub fn pick_any<'a, I>(&self, names: I) -> Result<Option<Symbol>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            match self.pick(name) {
                Ok(symbol) => return Ok(Some(symbol)),
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Unclassified lookup.
    ///
    /// The outer result only fails for a closed library; the inner one is
    /// the loader's answer.
    pub(crate) fn find_raw(
        &self,
        name: &str,
    ) -> Result<std::result::Result<SymbolAddress, PlatformError>> {
        let handle = self.record.handle.lock();
        let image = handle.as_ref().ok_or_else(|| LibraryError::ClosedLookup {
            path: self.record.path.clone(),
            name: name.to_string(),
        })?;
        Ok(image.find_symbol(name))
    }

    /// Returns `true` if both values refer to the same loaded library.
    pub fn ptr_eq(&self, other: &Library) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }

    fn take_handle(&self) -> Option<Box<dyn Image>> {
        self.record.handle.lock().take()
    }

    fn unload(&self, image: Box<dyn Image>) -> Result<()> {
        match image.close() {
            Ok(()) => {
                debug!(path = %self.record.path, "closed library");
                Ok(())
            }
            Err(source) => {
                warn!(
                    path = %self.record.path,
                    diagnostic = source.diagnostic(),
                    "OS refused to unload library"
                );
                Err(LibraryError::Close {
                    path: self.record.path.clone(),
                    source,
                })
            }
        }
    }
}

impl PartialEq for Library {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Library {}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open() {
            write!(f, "#[library! %{}]", self.record.path)
        } else {
            write!(f, "#[library! %{} closed]", self.record.path)
        }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.record.path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// A resolved symbol.
///
/// Keeps its library's record alive, but not the image: once the library
/// is closed the address is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    address: SymbolAddress,
    library: Library,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> SymbolAddress {
        self.address
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    /// Reinterpret the address as a function pointer.
    ///
    /// # Safety
    ///
    /// See [`SymbolAddress::to_fn`].
    pub unsafe fn as_fn<F: Copy>(&self) -> F {
        unsafe { self.address.to_fn() }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#[handle! {}]", self.name)
    }
}
