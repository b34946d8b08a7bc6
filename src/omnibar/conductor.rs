//! OmnibarConductor: single coordinator for the inline token subsystem
//!
//! Owns the document, the registry, and one controller per token kind in a
//! fixed priority order (mention > topic > entity). Every document change is
//! dispatched through the priority list; the first controller to match wins
//! and all lower-priority controllers are force-cancelled, so at most one
//! controller is ever in Matching state.
//!
//! Designed for WASM with one coarse boundary call per editor event: the
//! host applies an edit, reads back the match state, and drives the
//! debounce clock by calling `tick()`.

use instant::Instant;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use crate::omnibar::change::EditFingerprint;
use crate::omnibar::controller::{MatchState, QueryEvent, Suggestion, TokenController};
use crate::omnibar::debounce::DEFAULT_DEBOUNCE;
use crate::omnibar::document::{InlineDocument, SerializedNode};
use crate::omnibar::dom::{import_fragment, DomNode};
use crate::omnibar::registry::TokenRegistry;
use crate::omnibar::token::{SerializedToken, TokenKind};
use crate::omnibar::trigger::TriggerPattern;

// =============================================================================
// OmnibarConductor
// =============================================================================

/// Coordinator owning the document and the per-kind controllers
#[wasm_bindgen]
pub struct OmnibarConductor {
    document: InlineDocument,
    registry: TokenRegistry,
    controllers: Vec<TokenController>,
    fingerprint: EditFingerprint,
    cursor: usize,
}

impl Default for OmnibarConductor {
    fn default() -> Self {
        Self::new()
    }
}

impl OmnibarConductor {
    /// Conductor with the built-in kinds and the default debounce interval
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        let controllers = TokenKind::all()
            .into_iter()
            .map(|kind| TokenController::new(TriggerPattern::for_kind(kind), debounce))
            .collect();
        Self {
            document: InlineDocument::new(),
            registry: TokenRegistry::with_builtin_kinds(),
            controllers,
            fingerprint: EditFingerprint::new(),
            cursor: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Document access
    // -------------------------------------------------------------------------

    pub fn document(&self) -> &InlineDocument {
        &self.document
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn token_count(&self) -> usize {
        self.document.token_count()
    }

    // -------------------------------------------------------------------------
    // Edits (each applies one mutation, then re-dispatches)
    // -------------------------------------------------------------------------

    /// Insert text at the caret
    pub fn insert_text(&mut self, text: &str, now: Instant) {
        if let Some(caret) = self.document.insert_text(self.cursor, text) {
            self.cursor = caret;
        }
        self.dispatch(now);
    }

    /// Delete one unit backward from the caret (grapheme or whole token)
    pub fn backspace(&mut self, now: Instant) {
        if let Some(caret) = self.document.backspace(self.cursor) {
            self.cursor = caret;
        }
        self.dispatch(now);
    }

    /// Delete a char range; the caret lands at the effective start
    pub fn delete_range(&mut self, start: usize, end: usize, now: Instant) {
        if let Some(caret) = self.document.delete_range(start, end) {
            self.cursor = caret;
        }
        self.dispatch(now);
    }

    /// Pure caret move (no text mutation)
    pub fn set_cursor(&mut self, cursor: usize, now: Instant) {
        self.cursor = cursor.min(self.document.char_len());
        self.dispatch(now);
    }

    /// Paste a host-flattened DOM fragment at the caret. Tokens survive,
    /// unknown kinds degrade, malformed markers drop.
    pub fn paste_dom(&mut self, fragment: &[DomNode], now: Instant) {
        let nodes = import_fragment(&self.registry, fragment);
        // A caret inside a token lands past it, as with plain insertion
        self.cursor = self.document.snap_to_boundary(self.cursor);
        for node in nodes {
            let len = node.char_len();
            if self.document.replace_range(self.cursor, self.cursor, node) {
                self.cursor += len;
            }
        }
        self.dispatch(now);
    }

    /// Re-evaluate all controllers against the current snapshot.
    /// Redundant events (same text, same caret) are skipped.
    pub fn dispatch(&mut self, now: Instant) {
        // Token interiors are masked in the scan snapshot; offsets still
        // line up with the rendered text
        let text = self.document.scan_text();
        if !self.fingerprint.has_changed(&text, self.cursor) {
            return;
        }
        let mut winner: Option<usize> = None;
        for idx in 0..self.controllers.len() {
            if winner.is_some() {
                // Priority exclusion: higher-priority match wins outright
                self.controllers[idx].cancel();
                continue;
            }
            if self.controllers[idx].on_document_change(&text, self.cursor, now) {
                winner = Some(idx);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Suggestion UI boundary
    // -------------------------------------------------------------------------

    /// Match state of the active controller, if any
    pub fn match_state(&self) -> Option<MatchState> {
        self.controllers
            .iter()
            .find(|c| c.is_matching())
            .map(|c| c.match_state().clone())
    }

    /// Candidates currently held for the active match
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.controllers
            .iter()
            .find(|c| c.is_matching())
            .map(|c| c.suggestions().to_vec())
            .unwrap_or_default()
    }

    /// Drain due debounced queries for the search backend
    pub fn tick(&mut self, now: Instant) -> Vec<QueryEvent> {
        self.controllers
            .iter_mut()
            .filter_map(|c| c.poll_query(now))
            .collect()
    }

    /// Hand search results to the owning controller. Returns false (and
    /// applies nothing) for stale generations or dead matches.
    pub fn deliver_suggestions(
        &mut self,
        kind: TokenKind,
        generation: u64,
        suggestions: Vec<Suggestion>,
    ) -> bool {
        self.controllers
            .iter_mut()
            .find(|c| c.kind() == kind)
            .map(|c| c.deliver(generation, suggestions))
            .unwrap_or(false)
    }

    /// Commit the active match: one atomic replacement of the matched span.
    /// Returns false when no live match accepts the commit.
    pub fn commit(&mut self, value: &str, display_text: &str, now: Instant) -> bool {
        let Some(idx) = self.controllers.iter().position(|c| c.is_matching()) else {
            return false;
        };
        let start = self.controllers[idx].match_state().start;
        let committed = self.controllers[idx].commit(&mut self.document, value, display_text);
        if committed {
            // Caret lands right after the new token
            let token_len = self
                .document
                .nodes()
                .iter()
                .scan(0usize, |pos, node| {
                    let here = *pos;
                    *pos += node.char_len();
                    Some((here, node.char_len()))
                })
                .find(|(here, _)| *here == start)
                .map(|(_, len)| len)
                .unwrap_or(0);
            self.cursor = start + token_len;
            self.dispatch(now);
        }
        committed
    }

    /// Cancel every controller (idempotent)
    pub fn cancel(&mut self) {
        for controller in &mut self.controllers {
            controller.cancel();
        }
    }

    // -------------------------------------------------------------------------
    // Persistence boundary
    // -------------------------------------------------------------------------

    /// Persisted form of the whole document
    pub fn save(&self) -> Vec<SerializedNode> {
        self.document.to_serialized()
    }

    /// Load a persisted document; unknown-kind tokens degrade to text
    pub fn load(&mut self, nodes: &[SerializedNode], now: Instant) {
        self.document = InlineDocument::from_serialized(&self.registry, nodes);
        self.cursor = self.cursor.min(self.document.char_len());
        self.cancel();
        self.fingerprint.reset();
        self.dispatch(now);
    }

    /// Serialized form of every token in document order
    pub fn serialize_tokens(&self) -> Vec<SerializedToken> {
        self.registry.serialize_all(&self.document)
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    /// Share of change events skipped by fingerprinting, as a percentage
    pub fn skip_rate(&self) -> f64 {
        self.fingerprint.skip_rate()
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

#[wasm_bindgen]
impl OmnibarConductor {
    /// Create a new conductor (JS binding)
    #[wasm_bindgen(constructor)]
    pub fn js_new() -> Self {
        Self::new()
    }

    /// Create with a custom debounce interval in milliseconds (JS binding)
    #[wasm_bindgen(js_name = "withDebounceMs")]
    pub fn js_with_debounce_ms(ms: u32) -> Self {
        Self::with_debounce(Duration::from_millis(ms as u64))
    }

    /// Insert text at the caret (JS binding)
    #[wasm_bindgen(js_name = "insertText")]
    pub fn js_insert_text(&mut self, text: &str) {
        self.insert_text(text, Instant::now());
    }

    /// Backspace at the caret (JS binding)
    #[wasm_bindgen(js_name = "backspace")]
    pub fn js_backspace(&mut self) {
        self.backspace(Instant::now());
    }

    /// Delete a char range (JS binding)
    #[wasm_bindgen(js_name = "deleteRange")]
    pub fn js_delete_range(&mut self, start: usize, end: usize) {
        self.delete_range(start, end, Instant::now());
    }

    /// Move the caret (JS binding)
    #[wasm_bindgen(js_name = "setCursor")]
    pub fn js_set_cursor(&mut self, cursor: usize) {
        self.set_cursor(cursor, Instant::now());
    }

    /// Current document text (JS binding)
    #[wasm_bindgen(js_name = "text")]
    pub fn js_text(&self) -> String {
        self.text()
    }

    /// Current caret offset (JS binding)
    #[wasm_bindgen(js_name = "cursor")]
    pub fn js_cursor(&self) -> usize {
        self.cursor()
    }

    /// Active match state or null (JS binding)
    #[wasm_bindgen(js_name = "matchState")]
    pub fn js_match_state(&self) -> JsValue {
        match self.match_state() {
            Some(state) => serde_wasm_bindgen::to_value(&state).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    /// Candidates for the active match (JS binding)
    #[wasm_bindgen(js_name = "suggestions")]
    pub fn js_suggestions(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.suggestions()).unwrap_or(JsValue::NULL)
    }

    /// Drain due query events (JS binding).
    /// Returns `[{ kind, query, generation }]`.
    #[wasm_bindgen(js_name = "tick")]
    pub fn js_tick(&mut self) -> JsValue {
        let events = self.tick(Instant::now());
        serde_wasm_bindgen::to_value(&events).unwrap_or(JsValue::NULL)
    }

    /// Deliver search results (JS binding).
    /// Expects `kind` as a serialized kind name and an array of
    /// `{ value, displayText }`.
    #[wasm_bindgen(js_name = "deliverSuggestions")]
    pub fn js_deliver_suggestions(
        &mut self,
        kind: &str,
        generation: u64,
        suggestions: JsValue,
    ) -> Result<bool, JsValue> {
        let kind = TokenKind::parse(kind)
            .ok_or_else(|| JsValue::from_str(&format!("unknown token kind `{}`", kind)))?;
        let suggestions: Vec<Suggestion> = serde_wasm_bindgen::from_value(suggestions)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse suggestions: {}", e)))?;
        Ok(self.deliver_suggestions(kind, generation, suggestions))
    }

    /// Commit the active match (JS binding)
    #[wasm_bindgen(js_name = "commit")]
    pub fn js_commit(&mut self, value: &str, display_text: &str) -> bool {
        self.commit(value, display_text, Instant::now())
    }

    /// Cancel all matching (JS binding)
    #[wasm_bindgen(js_name = "cancel")]
    pub fn js_cancel(&mut self) {
        self.cancel();
    }

    /// Persist the document (JS binding)
    #[wasm_bindgen(js_name = "save")]
    pub fn js_save(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.save())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize document: {}", e)))
    }

    /// Load a persisted document (JS binding)
    #[wasm_bindgen(js_name = "load")]
    pub fn js_load(&mut self, nodes: JsValue) -> Result<(), JsValue> {
        let nodes: Vec<SerializedNode> = serde_wasm_bindgen::from_value(nodes)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse document: {}", e)))?;
        self.load(&nodes, Instant::now());
        Ok(())
    }

    /// Serialize every token node (JS binding)
    #[wasm_bindgen(js_name = "serializeTokens")]
    pub fn js_serialize_tokens(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.serialize_tokens())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize tokens: {}", e)))
    }

    /// Paste a flattened DOM fragment at the caret (JS binding).
    /// Expects `[{ tag, attrs, text }]`.
    #[wasm_bindgen(js_name = "pasteDom")]
    pub fn js_paste_dom(&mut self, fragment: JsValue) -> Result<(), JsValue> {
        let fragment: Vec<DomNode> = serde_wasm_bindgen::from_value(fragment)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse DOM fragment: {}", e)))?;
        self.paste_dom(&fragment, Instant::now());
        Ok(())
    }

    /// Fingerprint skip rate percentage (JS binding)
    #[wasm_bindgen(js_name = "skipRate")]
    pub fn js_skip_rate(&self) -> f64 {
        self.skip_rate()
    }
}

// =============================================================================
// Tests
// =============================================================================
