//! TokenController: per-kind typeahead state machine
//!
//! One controller per token kind drives the trigger → query → commit cycle:
//!
//! ```text
//! Idle → Matching → (Idle | Committing → Idle)
//! ```
//!
//! Every Matching republish pushes the raw query into the debouncer tagged
//! with a fresh generation; suggestion deliveries and commits bearing a
//! stale generation are no-ops. Timing races are designed out by the
//! generation counter, not handled reactively.

use instant::Instant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::omnibar::debounce::QueryDebouncer;
use crate::omnibar::document::{InlineDocument, InlineNode};
use crate::omnibar::token::{InlineToken, TokenKind};
use crate::omnibar::trigger::TriggerPattern;

// =============================================================================
// Types
// =============================================================================

/// Snapshot of the currently active match, consumed read-only by the
/// suggestion UI. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchState {
    pub active: bool,
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    #[serde(rename = "rawQuery")]
    pub raw_query: String,
    pub generation: u64,
}

impl MatchState {
    fn idle(kind: TokenKind) -> Self {
        Self {
            active: false,
            kind,
            start: 0,
            end: 0,
            raw_query: String::new(),
            generation: 0,
        }
    }
}

/// Debounced query emission handed to the external search backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryEvent {
    pub kind: TokenKind,
    pub query: String,
    pub generation: u64,
}

/// One search candidate coming back from the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub value: String,
    #[serde(rename = "displayText")]
    pub display_text: String,
}

/// Controller phases. `Committing` only lives inside [`TokenController::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Matching,
    Committing,
}

// =============================================================================
// TokenController
// =============================================================================

/// Typeahead controller for one token kind
pub struct TokenController {
    pattern: TriggerPattern,
    phase: Phase,
    state: MatchState,
    debouncer: QueryDebouncer,
    suggestions: Vec<Suggestion>,
}

impl TokenController {
    pub fn new(pattern: TriggerPattern, debounce: Duration) -> Self {
        let state = MatchState::idle(pattern.kind());
        Self {
            pattern,
            phase: Phase::Idle,
            state,
            debouncer: QueryDebouncer::new(debounce),
            suggestions: Vec::new(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.pattern.kind()
    }

    pub fn is_matching(&self) -> bool {
        self.phase == Phase::Matching
    }

    pub fn match_state(&self) -> &MatchState {
        &self.state
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Re-evaluate against a fresh text snapshot. Returns true while this
    /// controller holds an active match.
    pub fn on_document_change(&mut self, text: &str, cursor: usize, now: Instant) -> bool {
        match self.pattern.scan(text, cursor) {
            Some(scan) => {
                // A trigger at a new anchor restarts the match
                let fresh = self.phase != Phase::Matching || self.state.start != scan.start;
                let query_changed = fresh || self.state.raw_query != scan.query;
                self.phase = Phase::Matching;
                self.state.active = true;
                self.state.start = scan.start;
                self.state.end = scan.end;
                if fresh {
                    self.suggestions.clear();
                }
                if query_changed {
                    self.state.generation += 1;
                    self.state.raw_query = scan.query.clone();
                    self.debouncer.push(scan.query, now);
                }
                true
            }
            None => {
                self.cancel();
                false
            }
        }
    }

    /// Drain the debounced query, tagged with the current generation
    pub fn poll_query(&mut self, now: Instant) -> Option<QueryEvent> {
        let query = self.debouncer.poll(now)?;
        Some(QueryEvent {
            kind: self.kind(),
            query,
            generation: self.state.generation,
        })
    }

    /// Accept search results. Responses bearing a stale generation (or
    /// arriving after the match died) are discarded, never applied.
    pub fn deliver(&mut self, generation: u64, suggestions: Vec<Suggestion>) -> bool {
        if self.phase != Phase::Matching || generation != self.state.generation {
            return false;
        }
        self.suggestions = suggestions;
        true
    }

    /// Replace the matched span with one atomic token node.
    ///
    /// Returns `false` (no mutation) when the match has been invalidated
    /// since the suggestion was displayed; exactly one document mutation on
    /// success.
    pub fn commit(&mut self, document: &mut InlineDocument, value: &str, display_text: &str) -> bool {
        if self.phase != Phase::Matching || !self.state.active {
            return false;
        }
        // Defensive revalidation against the live document: the span must
        // still begin with our trigger character
        let text = document.text();
        let trigger_ok = text
            .chars()
            .nth(self.state.start)
            .map(|c| c == self.pattern.trigger())
            .unwrap_or(false);
        if !trigger_ok {
            self.cancel();
            return false;
        }

        self.phase = Phase::Committing;
        let token = InlineToken::new(self.kind(), value, display_text);
        let committed =
            document.replace_range(self.state.start, self.state.end, InlineNode::Token(token));

        self.phase = Phase::Idle;
        self.state.active = false;
        self.state.raw_query.clear();
        self.debouncer.clear();
        self.suggestions.clear();
        committed
    }

    /// Leave Matching and drop all pending work. Idempotent: a cancel on an
    /// already-Idle controller is a no-op.
    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
        self.state.active = false;
        self.state.raw_query.clear();
        self.debouncer.clear();
        self.suggestions.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mention_controller() -> TokenController {
        TokenController::new(
            TriggerPattern::for_kind(TokenKind::Mention),
            Duration::from_millis(300),
        )
    }

    fn after_debounce(now: Instant) -> Instant {
        now + Duration::from_millis(300)
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Idle → Matching on a trigger, back to Idle on match loss
    // -------------------------------------------------------------------------
    #[test]
    fn test_matching_lifecycle() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        assert!(ctrl.on_document_change("hello @jo", 9, now));
        assert!(ctrl.is_matching());
        let state = ctrl.match_state();
        assert_eq!((state.start, state.end), (6, 9));
        assert_eq!(state.raw_query, "jo");

        // Trigger deleted → match dies
        assert!(!ctrl.on_document_change("hello jo", 8, now));
        assert!(!ctrl.is_matching());
        assert!(!ctrl.match_state().active);
    }

    // -------------------------------------------------------------------------
    // Requirement 2: each query change bumps the generation and republishes
    // -------------------------------------------------------------------------
    #[test]
    fn test_generation_advances_with_query() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        ctrl.on_document_change("hello @jo", 9, now);
        let g1 = ctrl.match_state().generation;
        ctrl.on_document_change("hello @joe", 10, now);
        let g2 = ctrl.match_state().generation;
        assert!(g2 > g1);

        // Unchanged snapshot republish does not burn a generation
        ctrl.on_document_change("hello @joe", 10, now);
        assert_eq!(ctrl.match_state().generation, g2);
    }

    // -------------------------------------------------------------------------
    // Requirement 3: debounced emission carries the latest query
    // -------------------------------------------------------------------------
    #[test]
    fn test_poll_query_trailing_edge() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        ctrl.on_document_change("hi @j", 5, now);
        ctrl.on_document_change("hi @jo", 6, now);
        assert_eq!(ctrl.poll_query(now), None);

        let event = ctrl.poll_query(after_debounce(now)).unwrap();
        assert_eq!(event.query, "jo");
        assert_eq!(event.kind, TokenKind::Mention);
        assert_eq!(event.generation, ctrl.match_state().generation);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: stale-generation deliveries are discarded
    // -------------------------------------------------------------------------
    #[test]
    fn test_stale_delivery_discarded() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        ctrl.on_document_change("hi @jo", 6, now);
        let stale = ctrl.match_state().generation;
        ctrl.on_document_change("hi @joe", 7, now);

        let results = vec![Suggestion {
            value: "user-1".to_string(),
            display_text: "@Jo".to_string(),
        }];
        assert!(!ctrl.deliver(stale, results.clone()));
        assert!(ctrl.suggestions().is_empty());

        assert!(ctrl.deliver(ctrl.match_state().generation, results));
        assert_eq!(ctrl.suggestions().len(), 1);
    }

    // -------------------------------------------------------------------------
    // Requirement 5: commit replaces the span atomically (Scenario C)
    // -------------------------------------------------------------------------
    #[test]
    fn test_commit_inserts_token() {
        let mut ctrl = mention_controller();
        let mut doc = InlineDocument::from_text("hello @jo");
        let now = Instant::now();

        ctrl.on_document_change(&doc.text(), 9, now);
        assert!(ctrl.commit(&mut doc, "user-42", "@John Doe"));
        assert_eq!(doc.text(), "hello @John Doe");
        assert_eq!(doc.token_count(), 1);
        assert!(!ctrl.is_matching());

        // One backspace removes the whole token again
        doc.backspace(doc.char_len()).unwrap();
        assert_eq!(doc.text(), "hello ");
    }

    // -------------------------------------------------------------------------
    // Requirement 6: commit against an invalidated match is a no-op
    // -------------------------------------------------------------------------
    #[test]
    fn test_stale_commit_is_noop() {
        let mut ctrl = mention_controller();
        let mut doc = InlineDocument::from_text("hello @jo");
        let now = Instant::now();

        ctrl.on_document_change(&doc.text(), 9, now);
        // The user selects everything and retypes; the match dies
        doc.delete_range(0, doc.char_len()).unwrap();
        doc.insert_text(0, "fresh text").unwrap();
        ctrl.on_document_change(&doc.text(), 10, now);

        assert!(!ctrl.commit(&mut doc, "user-42", "@John Doe"));
        assert_eq!(doc.text(), "fresh text");
        assert_eq!(doc.token_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 7: cancel is idempotent and clears pending queries
    // -------------------------------------------------------------------------
    #[test]
    fn test_cancel_idempotent() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        ctrl.cancel(); // already Idle: no-op
        assert!(!ctrl.is_matching());

        ctrl.on_document_change("hi @jo", 6, now);
        ctrl.cancel();
        assert!(!ctrl.is_matching());
        // Pending debounced query was dropped with the match
        assert_eq!(ctrl.poll_query(after_debounce(now)), None);

        ctrl.cancel();
        assert!(!ctrl.is_matching());
    }

    // -------------------------------------------------------------------------
    // Requirement 8: a new trigger inside an active match re-anchors it
    // -------------------------------------------------------------------------
    #[test]
    fn test_reanchoring_clears_suggestions() {
        let mut ctrl = mention_controller();
        let now = Instant::now();

        ctrl.on_document_change("hi @jo", 6, now);
        ctrl.deliver(
            ctrl.match_state().generation,
            vec![Suggestion {
                value: "user-1".to_string(),
                display_text: "@Jo".to_string(),
            }],
        );
        assert_eq!(ctrl.suggestions().len(), 1);

        // New trigger further right: match re-anchors, old candidates drop
        ctrl.on_document_change("hi @jo @k", 9, now);
        assert_eq!(ctrl.match_state().start, 7);
        assert!(ctrl.suggestions().is_empty());
    }
}
