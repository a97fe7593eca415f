//! dynlib extension SDK
//!
//! Types shared by the host and native extensions. An extension is a shared
//! library exporting a *collator*: a function that receives the host's
//! [`HostApi`] table and returns one host value.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dynlib_sdk::export_collator;
//!
//! export_collator!(collate_my_extension, |api| {
//!     api.info("my extension loaded");
//!     api.text("hello from my extension")
//! });
//! ```
//!
//! Values only ever travel as [`RawValue`] pointers. Every pointer returned
//! by a constructor in the table is owned by the extension until it is
//! returned from the collator, handed to [`HostApi::block`], or released.

#[macro_use]
pub mod macros;

/// Current host API version.
/// Bumped whenever the layout of [`HostApi`] changes.
pub const ABI_VERSION: u32 = 1;

/// Opaque host value. Only ever used behind a pointer.
#[repr(C)]
pub struct RawValue {
    _private: [u8; 0],
}

/// Signature every collator entry point must have.
pub type CollateFn = unsafe extern "C" fn(api: *const HostApi) -> *mut RawValue;

/// Log levels understood by [`HostApi::log`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Decode a level received over the ABI. Unknown values map to `Trace`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Table of host entry points passed to every collator.
#[repr(C)]
pub struct HostApi {
    /// Must equal [`ABI_VERSION`] for the table layout below to be valid
    pub abi_version: u32,

    pub blank_fn: unsafe extern "C" fn() -> *mut RawValue,
    pub logic_fn: unsafe extern "C" fn(flag: bool) -> *mut RawValue,
    pub integer_fn: unsafe extern "C" fn(value: i64) -> *mut RawValue,
    pub decimal_fn: unsafe extern "C" fn(value: f64) -> *mut RawValue,

    /// UTF-8 bytes; invalid sequences are replaced
    pub text_fn: unsafe extern "C" fn(ptr: *const u8, len: usize) -> *mut RawValue,
    pub word_fn: unsafe extern "C" fn(ptr: *const u8, len: usize) -> *mut RawValue,

    /// Takes ownership of every item; null items are skipped
    pub block_fn: unsafe extern "C" fn(items: *const *mut RawValue, len: usize) -> *mut RawValue,

    pub release_fn: unsafe extern "C" fn(value: *mut RawValue),
    pub log_fn: unsafe extern "C" fn(level: u32, ptr: *const u8, len: usize),
}

impl HostApi {
    /// Returns `true` if this table has the layout this SDK was built for.
    pub fn is_compatible(&self) -> bool {
        self.abi_version == ABI_VERSION
    }

    pub fn blank(&self) -> *mut RawValue {
        unsafe { (self.blank_fn)() }
    }

    pub fn logic(&self, flag: bool) -> *mut RawValue {
        unsafe { (self.logic_fn)(flag) }
    }

    pub fn integer(&self, value: i64) -> *mut RawValue {
        unsafe { (self.integer_fn)(value) }
    }

    pub fn decimal(&self, value: f64) -> *mut RawValue {
        unsafe { (self.decimal_fn)(value) }
    }

    pub fn text(&self, text: &str) -> *mut RawValue {
        unsafe { (self.text_fn)(text.as_ptr(), text.len()) }
    }

    pub fn word(&self, spelling: &str) -> *mut RawValue {
        unsafe { (self.word_fn)(spelling.as_ptr(), spelling.len()) }
    }

    /// Build a block out of `items`, consuming them.
    pub fn block(&self, items: &[*mut RawValue]) -> *mut RawValue {
        unsafe { (self.block_fn)(items.as_ptr(), items.len()) }
    }

    /// Drop a value that will not be handed back to the host.
    ///
    /// # Safety
    ///
    /// `value` must come from this table and must not be used afterwards.
    pub unsafe fn release(&self, value: *mut RawValue) {
        unsafe { (self.release_fn)(value) }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        unsafe { (self.log_fn)(level as u32, message.as_ptr(), message.len()) }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
}
