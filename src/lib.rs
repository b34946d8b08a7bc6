//! TokenCore: Omnibar Inline Token Engine
//!
//! A Rust/WASM implementation of the KittClouds omnibar token subsystem:
//! trigger-based typeahead over a live inline document, atomic token nodes,
//! and debounced suggestion queries.
//!
//! # Architecture
//!
//! ## Omnibar Components
//! - `token.rs` - TokenKind + InlineToken: atomic inline nodes and their persisted form
//! - `registry.rs` - TokenRegistry: kind → (serialize, deserialize, dom-import) dispatch
//! - `document.rs` - InlineDocument: host document model with whole-token editing
//! - `trigger.rs` - TriggerPattern: backward cursor-relative trigger scanning
//! - `debounce.rs` - QueryDebouncer: trailing-edge query coalescing
//! - `controller.rs` - TokenController: per-kind Idle → Matching → Committing machine
//! - `change.rs` - EditFingerprint: change-skip detection for document events
//! - `conductor.rs` - OmnibarConductor: priority dispatch + the WASM surface
//! - `dom.rs` - DOM import boundary for pasted content
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { OmnibarConductor } from 'tokencore';
//!
//! await init();
//!
//! const omnibar = new OmnibarConductor();
//! omnibar.insertText('hello @jo');
//!
//! // Drive the debounce clock; due queries come back for the search backend
//! const events = omnibar.tick(); // [{ kind: 'mention', query: 'jo', generation: 1 }]
//!
//! // Search results flow back in, gated by generation
//! omnibar.deliverSuggestions('mention', 1, [{ value: 'user-42', displayText: '@John Doe' }]);
//!
//! // The user picks a candidate
//! omnibar.commit('user-42', '@John Doe');
//! console.log(omnibar.text()); // "hello @John Doe"
//! ```

pub mod omnibar;

mod log;

pub use omnibar::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("tokencore v{}", env!("CARGO_PKG_VERSION"))
}
