//! Platform loader.
//!
//! One contract over the OS dynamic loader: `dlopen`/`dlsym`/`dlclose` on
//! Unix, `LoadLibraryW`/`GetProcAddress`/`FreeLibrary` on Windows.
//!
//! The OS reports loader failures through a per-process (or, depending on
//! the libc, per-thread) "last error" slot. Success of a symbol lookup is
//! signaled by that slot staying empty, not by the returned address, so
//! every clear/call/check sequence the [`SystemLoader`] performs holds
//! `LOADER_CHANNEL` for its whole duration.

use std::ffi::{c_void, OsStr};
use std::fmt;
use std::mem;

use parking_lot::{const_mutex, Mutex};
use tracing::trace;

use crate::config::LoaderConfig;
use crate::error::PlatformError;

#[cfg(unix)]
use libloading::os::unix::Library as NativeLibrary;
#[cfg(windows)]
use libloading::os::windows::Library as NativeLibrary;

/// Serializes access to the OS loader error channel.
static LOADER_CHANNEL: Mutex<()> = const_mutex(());

/// Address of a resolved symbol.
///
/// Opaque data: zero is a legal value (e.g. an undefined weak symbol) and
/// nothing here checks what the address points at.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolAddress(*mut c_void);

// Plain address, never dereferenced by this crate.
unsafe impl Send for SymbolAddress {}
unsafe impl Sync for SymbolAddress {}

impl SymbolAddress {
    pub const NULL: SymbolAddress = SymbolAddress(std::ptr::null_mut());

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        SymbolAddress(ptr)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    pub fn addr(&self) -> usize {
        self.0 as usize
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Reinterpret the address as a function pointer of type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the calling convention
    /// and signature of the code at this address, and the image the address
    /// came from must still be loaded when the result is called.
    pub unsafe fn to_fn<F: Copy>(self) -> F {
        assert_eq!(
            mem::size_of::<F>(),
            mem::size_of::<*mut c_void>(),
            "symbol addresses can only be reinterpreted as pointer-sized types"
        );
        unsafe { mem::transmute_copy(&self.0) }
    }
}

impl fmt::Debug for SymbolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolAddress({:#x})", self.addr())
    }
}

impl fmt::LowerHex for SymbolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.addr(), f)
    }
}

/// Opens native images.
pub trait Loader: Send + Sync {
    /// Load the image at `path`.
    ///
    /// `path` is handed to the OS as is: bare names go through the OS
    /// library search rules.
    fn open(&self, path: &OsStr) -> Result<Box<dyn Image>, PlatformError>;
}

/// A loaded native image.
pub trait Image: Send + Sync {
    /// Resolve `name`. A null address is a successful result.
    fn find_symbol(&self, name: &str) -> Result<SymbolAddress, PlatformError>;

    /// Unload the image.
    fn close(self: Box<Self>) -> Result<(), PlatformError>;
}

/// [`Loader`] backed by the operating system's dynamic loader.
#[derive(Debug, Clone, Default)]
pub struct SystemLoader {
    config: LoaderConfig,
}

impl SystemLoader {
    /// Create a loader with default options (lazy binding, local symbols).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl Loader for SystemLoader {
    fn open(&self, path: &OsStr) -> Result<Box<dyn Image>, PlatformError> {
        let _channel = LOADER_CHANNEL.lock();
        trace!(path = ?path, "loading native image");
        let library = unsafe { open_native(path, &self.config) }
            .map_err(|e| PlatformError::from_libloading(&e))?;
        Ok(Box::new(SystemImage { library }))
    }
}

#[cfg(unix)]
unsafe fn open_native(
    path: &OsStr,
    config: &LoaderConfig,
) -> Result<NativeLibrary, libloading::Error> {
    use libloading::os::unix::{RTLD_GLOBAL, RTLD_LAZY, RTLD_LOCAL, RTLD_NOW};

    use crate::config::{Binding, Visibility};

    let binding = match config.binding {
        Binding::Lazy => RTLD_LAZY,
        Binding::Now => RTLD_NOW,
    };
    let visibility = match config.visibility {
        Visibility::Local => RTLD_LOCAL,
        Visibility::Global => RTLD_GLOBAL,
    };
    unsafe { NativeLibrary::open(Some(path), binding | visibility) }
}

#[cfg(windows)]
unsafe fn open_native(
    path: &OsStr,
    _config: &LoaderConfig,
) -> Result<NativeLibrary, libloading::Error> {
    unsafe { NativeLibrary::new(path) }
}

struct SystemImage {
    library: NativeLibrary,
}

impl Image for SystemImage {
    fn find_symbol(&self, name: &str) -> Result<SymbolAddress, PlatformError> {
        let _channel = LOADER_CHANNEL.lock();
        let symbol = unsafe { lookup_native::<*mut c_void>(&self.library, name.as_bytes()) }
            .map_err(|e| PlatformError::from_libloading(&e))?;
        Ok(SymbolAddress(*symbol))
    }

    fn close(self: Box<Self>) -> Result<(), PlatformError> {
        let _channel = LOADER_CHANNEL.lock();
        self.library
            .close()
            .map_err(|e| PlatformError::from_libloading(&e))
    }
}

// Clears dlerror, calls dlsym, then checks dlerror. A null result with no
// pending error comes back as Ok. The caller holds LOADER_CHANNEL, which is
// what makes the single-threaded variant sound here.
#[cfg(unix)]
unsafe fn lookup_native<T>(
    library: &NativeLibrary,
    name: &[u8],
) -> Result<libloading::os::unix::Symbol<T>, libloading::Error> {
    unsafe { library.get_singlethreaded(name) }
}

// GetProcAddress never yields a null address for a real export.
#[cfg(windows)]
unsafe fn lookup_native<T>(
    library: &NativeLibrary,
    name: &[u8],
) -> Result<libloading::os::windows::Symbol<T>, libloading::Error> {
    unsafe { library.get(name) }
}
