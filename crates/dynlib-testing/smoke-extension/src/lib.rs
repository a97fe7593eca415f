//! Smoke test extension.
//!
//! Exports two collators and one plain function so the host's loading,
//! lookup and collation paths can be exercised against a real image.

use dynlib_sdk::export_collator;

/// Version string returned inside the collated block.
pub const SMOKE_VERSION: &str = "ready";

export_collator!(collate_smoke, |api| {
    api.info("smoke extension collated");
    api.block(&[
        api.word("smoke"),
        api.integer(42),
        api.text(SMOKE_VERSION),
        api.logic(true),
        api.decimal(1.5),
    ])
});

export_collator!(collate_nothing, |api| {
    api.warn("smoke extension returning no value");
    std::ptr::null_mut()
});

/// Plain exported function, resolved with `pick`.
#[no_mangle]
pub extern "C" fn smoke_answer() -> i32 {
    42
}
