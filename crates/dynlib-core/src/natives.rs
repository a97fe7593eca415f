//! Library natives.
//!
//! Entry points the host's generic dispatch calls with host values. They
//! check argument types, then defer to [`Library`] and the collator.

use tracing::debug;

use crate::collator;
use crate::error::{LibraryError, Result};
use crate::library::Library;
use crate::platform::{Loader, SystemLoader};
use crate::value::Value;

fn expect_library(value: &Value) -> Result<&Library> {
    value.as_library().ok_or(LibraryError::UnexpectedType {
        expected: "library!",
        actual: value.type_name(),
    })
}

/// `make library! %path`
pub fn make_library(parent: Option<&Value>, arg: &Value) -> Result<Value> {
    make_library_with(&SystemLoader::new(), parent, arg)
}

/// `make library!` through a specific loader.
pub fn make_library_with(loader: &dyn Loader, parent: Option<&Value>, arg: &Value) -> Result<Value> {
    if let Some(parent) = parent {
        return Err(LibraryError::BadMakeParent(parent.type_name()));
    }

    let Value::File(path) = arg else {
        return Err(LibraryError::UnexpectedType {
            expected: "file!",
            actual: arg.type_name(),
        });
    };

    Library::open_with(loader, path).map(Value::Library)
}

/// `to library! %path`, same as `make` without a parent.
pub fn to_library(arg: &Value) -> Result<Value> {
    make_library(None, arg)
}

/// `close library`
pub fn close_library(value: &Value) -> Result<()> {
    expect_library(value)?.close()
}

/// `open? library`
pub fn open_q(value: &Value) -> Result<Value> {
    Ok(Value::Logic(expect_library(value)?.is_open()))
}

/// `pick library name`, where name is text or a word.
pub fn pick_library(value: &Value, picker: &Value) -> Result<Value> {
    let library = expect_library(value)?;
    let name = match picker {
        Value::Text(name) | Value::Word(name) => name,
        other => {
            return Err(LibraryError::UnexpectedType {
                expected: "text! or word!",
                actual: other.type_name(),
            })
        }
    };
    library.pick(name).map(Value::Handle)
}

/// `poke library ...` is never allowed.
pub fn poke_library(value: &Value, _picker: &Value, _poked: &Value) -> Result<()> {
    expect_library(value)?;
    debug!("refusing to poke into library! value");
    Err(LibraryError::Immutable)
}

/// `run-library-collator library linkname`
pub fn run_library_collator(value: &Value, linkname: &Value) -> Result<Option<Value>> {
    let library = expect_library(value)?;
    let Value::Text(linkname) = linkname else {
        return Err(LibraryError::UnexpectedType {
            expected: "text!",
            actual: linkname.type_name(),
        });
    };
    collator::run_library_collator(library, linkname)
}

/// Library comparison: equal when both refer to the same handle record.
pub fn library_equal(a: &Value, b: &Value) -> Result<bool> {
    Ok(expect_library(a)? == expect_library(b)?)
}
