//! TriggerScanner: cursor-relative trigger detection
//!
//! Scans backward from the cursor through query-eligible chars looking for a
//! trigger character. A match is valid only when the trigger is preceded by
//! start-of-text or whitespace (no mid-word triggers) and the query has
//! reached the pattern's minimum length.
//!
//! The scan takes an immutable text snapshot per change event; no positions
//! into the live document are retained across events.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::omnibar::token::TokenKind;

// =============================================================================
// Constants
// =============================================================================

/// Broad query-eligibility class shared by all patterns. Individual
/// patterns narrow this further with their compiled query regex.
fn is_query_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

// =============================================================================
// TriggerScan
// =============================================================================

/// A successful trigger match. `start..end` are char offsets covering the
/// trigger character and the query; `query` excludes the trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerScan {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub query: String,
}

// =============================================================================
// TriggerPattern
// =============================================================================

/// One trigger pattern: character, minimum query length, and a compiled
/// query-shape regex (the per-kind allowed-character predicate)
pub struct TriggerPattern {
    kind: TokenKind,
    trigger: char,
    min_query_len: usize,
    query_re: Regex,
}

impl TriggerPattern {
    /// Default pattern for a kind. Mentions admit dotted handles; topic and
    /// entity queries stay word-shaped.
    pub fn for_kind(kind: TokenKind) -> Self {
        let query_re = match kind {
            TokenKind::Mention => r"^[\w.-]*$",
            TokenKind::Topic | TokenKind::Entity => r"^[\w-]*$",
        };
        Self {
            kind,
            trigger: kind.trigger_char(),
            min_query_len: 1,
            // Fixed alternatives above, compiled once per pattern
            query_re: Regex::new(query_re).expect("static query pattern compiles"),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    pub fn min_query_len(&self) -> usize {
        self.min_query_len
    }

    pub fn with_min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = len.max(1);
        self
    }

    /// Scan backward from `cursor` (a char offset) for this pattern.
    ///
    /// Returns `None` when no trigger is in reach, the trigger sits mid-word,
    /// or the query is still below the minimum length.
    pub fn scan(&self, text: &str, cursor: usize) -> Option<TriggerScan> {
        let chars: Vec<char> = text.chars().collect();
        if cursor > chars.len() {
            return None;
        }

        // Walk back over query-eligible chars to the nearest candidate
        let mut i = cursor;
        while i > 0 {
            let c = chars[i - 1];
            if c == self.trigger {
                break;
            }
            if !is_query_char(c) {
                return None;
            }
            i -= 1;
        }
        if i == 0 {
            return None; // ran out of text without a trigger
        }
        let trigger_at = i - 1;

        // Mid-word triggers don't count: `foo@bar` is an email, not a match
        if trigger_at > 0 && !chars[trigger_at - 1].is_whitespace() {
            return None;
        }

        let query: String = chars[i..cursor].iter().collect();
        if query.chars().count() < self.min_query_len {
            return None;
        }
        if !self.query_re.is_match(&query) {
            return None;
        }

        Some(TriggerScan {
            kind: self.kind,
            start: trigger_at,
            end: cursor,
            query,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
