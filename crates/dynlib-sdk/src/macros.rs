//! Declarative macros for extension development.

/// Export a collator entry point.
///
/// The body receives `&HostApi` and must evaluate to a `*mut RawValue`
/// (null meaning "no value"). A null table pointer or an incompatible ABI
/// version makes the generated function return null without running the
/// body.
///
/// # Example
///
/// ```rust,ignore
/// use dynlib_sdk::export_collator;
///
/// export_collator!(collate_answer, |api| api.integer(42));
/// ```
#[macro_export]
macro_rules! export_collator {
    ($name:ident, |$api:ident| $body:expr) => {
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            $api: *const $crate::HostApi,
        ) -> *mut $crate::RawValue {
            if $api.is_null() {
                return ::core::ptr::null_mut();
            }
            let $api: &$crate::HostApi = unsafe { &*$api };
            if !$api.is_compatible() {
                return ::core::ptr::null_mut();
            }
            $body
        }
    };
}
