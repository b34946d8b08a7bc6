//! EditFingerprint: change-skip detection for document events
//!
//! Hashes each (snapshot, cursor) pair so redundant change events (selection
//! refreshes, no-op notifications from the host) skip controller
//! re-evaluation. Cursor position is part of the fingerprint: a pure caret
//! move can enter or leave a match range and must not be skipped as
//! "unchanged text".

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Content + cursor fingerprint with skip accounting
#[derive(Debug, Default)]
pub struct EditFingerprint {
    last: Option<u64>,
    check_count: u64,
    skip_count: u64,
}

impl EditFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when this (text, cursor) pair differs from the last seen one.
    /// The first check always counts as changed.
    pub fn has_changed(&mut self, text: &str, cursor: usize) -> bool {
        self.check_count += 1;
        let current = Self::fingerprint(text, cursor);
        let changed = match self.last {
            None => true,
            Some(prev) => prev != current,
        };
        if !changed {
            self.skip_count += 1;
        }
        self.last = Some(current);
        changed
    }

    pub fn check_count(&self) -> u64 {
        self.check_count
    }

    pub fn skip_count(&self) -> u64 {
        self.skip_count
    }

    /// Skip rate as a percentage
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.check_count = 0;
        self.skip_count = 0;
    }

    fn fingerprint(text: &str, cursor: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        cursor.hash(&mut hasher);
        hasher.finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Requirement 1: first check always counts as changed
    // -------------------------------------------------------------------------
    #[test]
    fn test_first_check_changed() {
        let mut fp = EditFingerprint::new();
        assert!(fp.has_changed("hello", 5));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: identical text and cursor skips
    // -------------------------------------------------------------------------
    #[test]
    fn test_identical_pair_skips() {
        let mut fp = EditFingerprint::new();
        fp.has_changed("hello", 5);
        assert!(!fp.has_changed("hello", 5));
        assert_eq!(fp.skip_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Requirement 3: a pure cursor move is a change
    // -------------------------------------------------------------------------
    #[test]
    fn test_cursor_move_is_change() {
        let mut fp = EditFingerprint::new();
        fp.has_changed("hello", 5);
        assert!(fp.has_changed("hello", 2));
    }

    // -------------------------------------------------------------------------
    // Requirement 4: skip rate accounting
    // -------------------------------------------------------------------------
    #[test]
    fn test_skip_rate() {
        let mut fp = EditFingerprint::new();
        fp.has_changed("a", 1);
        fp.has_changed("a", 1);
        fp.has_changed("a", 1);
        fp.has_changed("a", 1);
        assert!((fp.skip_rate() - 75.0).abs() < 0.01);
    }

    // -------------------------------------------------------------------------
    // Requirement 5: reset clears history
    // -------------------------------------------------------------------------
    #[test]
    fn test_reset() {
        let mut fp = EditFingerprint::new();
        fp.has_changed("a", 1);
        fp.reset();
        assert_eq!(fp.check_count(), 0);
        assert!(fp.has_changed("a", 1));
    }
}
