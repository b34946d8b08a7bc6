//! Console logging shim
//!
//! Routes to the browser console on wasm32 (the host surfaces these in
//! devtools) and to stderr on native so unit tests can exercise degrade
//! paths without a DOM.

#[cfg(target_arch = "wasm32")]
pub(crate) fn warn(msg: &str) {
    web_sys::console::warn_1(&msg.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn warn(msg: &str) {
    eprintln!("{}", msg);
}
