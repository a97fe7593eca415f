//! Host values.
//!
//! The subset of the host's value model this crate consumes and produces:
//! arguments to the library natives, and whatever an extension's collator
//! builds through the API table.

use std::ffi::OsString;
use std::fmt;

use dynlib_sdk::RawValue;

use crate::library::{Library, Symbol};

/// A host value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Blank,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Word(String),
    /// Host file path text, e.g. `%lib/libfoo.so`
    File(String),
    Block(Vec<Value>),
    Library(Library),
    /// Resolved symbol address
    Handle(Symbol),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Blank => "blank!",
            Value::Logic(_) => "logic!",
            Value::Integer(_) => "integer!",
            Value::Decimal(_) => "decimal!",
            Value::Text(_) => "text!",
            Value::Word(_) => "word!",
            Value::File(_) => "file!",
            Value::Block(_) => "block!",
            Value::Library(_) => "library!",
            Value::Handle(_) => "handle!",
        }
    }

    /// UTF-8 spelling of text, word and file values.
    pub fn as_utf8(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Word(s) | Value::File(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_library(&self) -> Option<&Library> {
        match self {
            Value::Library(library) => Some(library),
            _ => None,
        }
    }

    /// Move this value behind an ABI pointer.
    ///
    /// Ownership passes to whoever receives the pointer; it comes back
    /// through [`Value::from_raw`].
    pub fn into_raw(self) -> *mut RawValue {
        Box::into_raw(Box::new(self)).cast()
    }

    /// Take back ownership of a value produced by [`Value::into_raw`].
    /// Null yields `None`.
    ///
    /// # Safety
    ///
    /// `raw` must be null or come from [`Value::into_raw`], and must not be
    /// used again afterwards.
    pub unsafe fn from_raw(raw: *mut RawValue) -> Option<Value> {
        if raw.is_null() {
            return None;
        }
        let boxed = unsafe { Box::from_raw(raw.cast::<Value>()) };
        Some(*boxed)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Blank => f.write_str("_"),
            Value::Logic(flag) => write!(f, "{flag}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(d) => {
                if d.is_finite() && d.fract() == 0.0 {
                    write!(f, "{d:.1}")
                } else {
                    write!(f, "{d}")
                }
            }
            Value::Text(text) => {
                f.write_str("\"")?;
                for c in text.chars() {
                    match c {
                        '"' => f.write_str("^\"")?,
                        '^' => f.write_str("^^")?,
                        '\n' => f.write_str("^/")?,
                        '\t' => f.write_str("^-")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Value::Word(spelling) => f.write_str(spelling),
            Value::File(path) => write!(f, "%{path}"),
            Value::Block(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Library(library) => write!(f, "{library}"),
            Value::Handle(symbol) => write!(f, "{symbol}"),
        }
    }
}

/// Convert host file text into an OS path string.
///
/// The result is never made absolute: a bare `libfoo.so` must reach the OS
/// loader unchanged so its library search rules apply.
#[cfg(not(windows))]
pub fn file_to_local(file: &str) -> OsString {
    OsString::from(file)
}

/// Convert host file text into an OS path string.
///
/// Forward slashes become backslashes and a leading `/c/` drive form
/// becomes `c:\`. The result is never made absolute.
#[cfg(windows)]
pub fn file_to_local(file: &str) -> OsString {
    OsString::from(windows_local(file))
}

#[cfg_attr(not(any(windows, test)), allow(dead_code))]
fn windows_local(file: &str) -> String {
    let mut local = String::with_capacity(file.len() + 1);
    let mut rest = file;

    let bytes = file.as_bytes();
    if bytes.len() >= 2
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && (bytes.len() == 2 || bytes[2] == b'/')
    {
        local.push(bytes[1] as char);
        local.push(':');
        rest = &file[2..];
        if rest.is_empty() {
            local.push('\\');
        }
    }

    local.extend(rest.chars().map(|c| if c == '/' { '\\' } else { c }));
    local
}
