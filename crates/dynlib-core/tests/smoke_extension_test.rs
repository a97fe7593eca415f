//! Integration tests for collating the smoke test extension.
//!
//! The extension is the `dynlib-smoke-extension` workspace member. Tests are
//! skipped when its shared library has not been built yet.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;

use dynlib_core::{natives, run_library_collator, ErrorKind, Library, LibraryError, Value};

/// Helper to find the built smoke extension
fn smoke_extension_path() -> Option<PathBuf> {
    let file = format!("{}dynlib_smoke_extension{}", DLL_PREFIX, DLL_SUFFIX);

    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join("target")
        });

    ["debug", "release"]
        .iter()
        .map(|profile| target.join(profile).join(&file))
        .find(|path| path.exists())
}

macro_rules! open_smoke_extension {
    () => {
        match smoke_extension_path() {
            Some(path) => {
                let path = path.to_str().expect("target path is UTF-8").to_string();
                Library::open(&path).expect("smoke extension should load")
            }
            None => {
                eprintln!("smoke extension not built, skipping");
                return;
            }
        }
    };
}

#[test]
fn test_collate_smoke_extension() {
    let library = open_smoke_extension!();

    let value = run_library_collator(&library, "collate_smoke").unwrap();
    assert_eq!(
        value,
        Some(Value::Block(vec![
            Value::Word("smoke".to_string()),
            Value::Integer(42),
            Value::Text("ready".to_string()),
            Value::Logic(true),
            Value::Decimal(1.5),
        ]))
    );

    library.close().unwrap();
}

#[test]
fn test_collator_without_value() {
    let library = open_smoke_extension!();
    assert_eq!(run_library_collator(&library, "collate_nothing").unwrap(), None);
    library.close().unwrap();
}

#[test]
fn test_missing_collator_is_hard_failure() {
    let library = open_smoke_extension!();

    let err = run_library_collator(&library, "collate_does_not_exist").unwrap_err();
    assert!(matches!(err, LibraryError::CollatorNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Unexpected);

    library.close().unwrap();
}

#[test]
fn test_pick_and_call_plain_export() {
    let library = open_smoke_extension!();

    let answer = library.pick("smoke_answer").unwrap();
    let answer: extern "C" fn() -> i32 = unsafe { answer.as_fn() };
    assert_eq!(answer(), 42);

    library.close().unwrap();
}

#[test]
fn test_natives_round_trip() {
    let library = open_smoke_extension!();
    let value = Value::Library(library);

    let result = natives::run_library_collator(&value, &Value::Text("collate_smoke".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(result.to_string(), "[smoke 42 \"ready\" true 1.5]");

    natives::close_library(&value).unwrap();
    assert_eq!(natives::open_q(&value).unwrap(), Value::Logic(false));
    assert!(natives::close_library(&value).unwrap_err().is_usage_error());
}
