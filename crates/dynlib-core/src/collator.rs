//! Extension collators.
//!
//! A collator is an entry point exported by an extension image. The host
//! resolves it by name, calls it once with [`EXT_LIB`], and takes whatever
//! value it returns. Extensions linked into the executable call the host
//! directly and never see the table.

use std::slice;

use dynlib_sdk::{CollateFn, HostApi, LogLevel, RawValue, ABI_VERSION};
use tracing::{debug, error, info, trace, warn};

use crate::error::{LibraryError, Result};
use crate::library::Library;
use crate::value::Value;

/// The host API table handed to every collator.
pub static EXT_LIB: HostApi = HostApi {
    abi_version: ABI_VERSION,
    blank_fn: api_blank,
    logic_fn: api_logic,
    integer_fn: api_integer,
    decimal_fn: api_decimal,
    text_fn: api_text,
    word_fn: api_word,
    block_fn: api_block,
    release_fn: api_release,
    log_fn: api_log,
};

pub fn host_api() -> &'static HostApi {
    &EXT_LIB
}

/// Resolve `linkname` in `library` and run it as a collator.
///
/// Any lookup failure is fatal here, whatever the loader said. `Ok(None)`
/// means the collator returned no value.
///
/// The callee is arbitrary native code. It runs on the calling thread and
/// nothing about its behavior is checked.
pub fn run_library_collator(library: &Library, linkname: &str) -> Result<Option<Value>> {
    let address = library
        .find_raw(linkname)?
        .map_err(|source| LibraryError::CollatorNotFound {
            linkname: linkname.to_string(),
            source,
        })?;

    if address.is_null() {
        return Err(LibraryError::NullCollator {
            linkname: linkname.to_string(),
        });
    }

    debug!(path = library.path(), linkname, "running collator");
    let collator: CollateFn = unsafe { address.to_fn() };
    let result = unsafe { collator(&EXT_LIB) };

    Ok(unsafe { Value::from_raw(result) })
}

unsafe fn utf8_lossy(ptr: *const u8, len: usize) -> String {
    if ptr.is_null() || len == 0 {
        return String::new();
    }
    let bytes = unsafe { slice::from_raw_parts(ptr, len) };
    String::from_utf8_lossy(bytes).into_owned()
}

extern "C" fn api_blank() -> *mut RawValue {
    Value::Blank.into_raw()
}

extern "C" fn api_logic(flag: bool) -> *mut RawValue {
    Value::Logic(flag).into_raw()
}

extern "C" fn api_integer(value: i64) -> *mut RawValue {
    Value::Integer(value).into_raw()
}

extern "C" fn api_decimal(value: f64) -> *mut RawValue {
    Value::Decimal(value).into_raw()
}

unsafe extern "C" fn api_text(ptr: *const u8, len: usize) -> *mut RawValue {
    Value::Text(unsafe { utf8_lossy(ptr, len) }).into_raw()
}

unsafe extern "C" fn api_word(ptr: *const u8, len: usize) -> *mut RawValue {
    Value::Word(unsafe { utf8_lossy(ptr, len) }).into_raw()
}

unsafe extern "C" fn api_block(items: *const *mut RawValue, len: usize) -> *mut RawValue {
    let mut values = Vec::with_capacity(len);
    if !items.is_null() {
        for &item in unsafe { slice::from_raw_parts(items, len) } {
            if let Some(value) = unsafe { Value::from_raw(item) } {
                values.push(value);
            }
        }
    }
    Value::Block(values).into_raw()
}

unsafe extern "C" fn api_release(value: *mut RawValue) {
    drop(unsafe { Value::from_raw(value) });
}

unsafe extern "C" fn api_log(level: u32, ptr: *const u8, len: usize) {
    let message = unsafe { utf8_lossy(ptr, len) };
    match LogLevel::from_raw(level) {
        LogLevel::Error => error!(target: "dynlib::extension", "{message}"),
        LogLevel::Warn => warn!(target: "dynlib::extension", "{message}"),
        LogLevel::Info => info!(target: "dynlib::extension", "{message}"),
        LogLevel::Debug => debug!(target: "dynlib::extension", "{message}"),
        LogLevel::Trace => trace!(target: "dynlib::extension", "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;

    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{FakeImage, FakeLoader};

    unsafe extern "C" fn collate_block(api: *const HostApi) -> *mut RawValue {
        let api = unsafe { &*api };
        assert!(api.is_compatible());
        api.info("collating test extension");

        let scratch = api.text("discarded");
        unsafe { api.release(scratch) };

        api.block(&[
            api.word("test-ext"),
            api.integer(7),
            api.text("ready"),
            std::ptr::null_mut(),
        ])
    }

    unsafe extern "C" fn collate_nothing(_api: *const HostApi) -> *mut RawValue {
        std::ptr::null_mut()
    }

    fn open_extension() -> Library {
        let loader = FakeLoader::new().with_image(
            "libext.so",
            FakeImage::new()
                .with_function("collate_block", collate_block as CollateFn as *const c_void)
                .with_function("collate_nothing", collate_nothing as CollateFn as *const c_void)
                .with_symbol("null_entry", 0)
                .with_failure("missing", "The specified procedure could not be found."),
        );
        Library::open_with(&loader, "libext.so").unwrap()
    }

    #[test]
    fn test_collator_returns_callee_value() {
        let library = open_extension();
        let value = run_library_collator(&library, "collate_block").unwrap();
        assert_eq!(
            value,
            Some(Value::Block(vec![
                Value::Word("test-ext".to_string()),
                Value::Integer(7),
                Value::Text("ready".to_string()),
            ]))
        );
    }

    #[test]
    fn test_collator_returning_null_yields_none() {
        let library = open_extension();
        assert_eq!(run_library_collator(&library, "collate_nothing").unwrap(), None);
    }

    #[test]
    fn test_missing_collator_is_hard_failure() {
        let library = open_extension();
        // Would classify as recoverable through pick().
        assert!(library.pick("missing").unwrap_err().is_recoverable());

        let err = run_library_collator(&library, "missing").unwrap_err();
        assert!(matches!(err, LibraryError::CollatorNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_null_collator_is_refused() {
        let library = open_extension();
        let err = run_library_collator(&library, "null_entry").unwrap_err();
        assert!(matches!(err, LibraryError::NullCollator { .. }));
    }

    #[test]
    fn test_collator_on_closed_library() {
        let library = open_extension();
        library.close().unwrap();
        let err = run_library_collator(&library, "collate_block").unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_host_api_table() {
        let api = host_api();
        assert_eq!(api.abi_version, ABI_VERSION);
        let raw = api.decimal(2.5);
        assert_eq!(unsafe { Value::from_raw(raw) }, Some(Value::Decimal(2.5)));
        let raw = api.logic(false);
        assert_eq!(unsafe { Value::from_raw(raw) }, Some(Value::Logic(false)));
    }
}
