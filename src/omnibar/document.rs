//! InlineDocument: host document model for the omnibar
//!
//! A flat list of inline nodes: plain text runs and atomic tokens. All
//! public offsets are char offsets into the rendered snapshot (tokens render
//! as their display text).
//!
//! Guarantees:
//! - editing operations delete or replace a token as a whole, never split
//!   its interior
//! - a caret immediately after a token inserts plain text without extending
//!   the token
//! - adjacent text runs are merged after every mutation, so repeated edits
//!   do not fragment the node list

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::log;
use crate::omnibar::registry::TokenRegistry;
use crate::omnibar::token::{InlineToken, SerializedToken};

// =============================================================================
// InlineNode
// =============================================================================

/// One inline element: a text run or an atomic token
#[derive(Debug, Clone, PartialEq)]
pub enum InlineNode {
    Text(String),
    Token(InlineToken),
}

impl InlineNode {
    pub fn text(s: impl Into<String>) -> Self {
        InlineNode::Text(s.into())
    }

    /// Rendered form of this node
    pub fn rendered(&self) -> &str {
        match self {
            InlineNode::Text(s) => s,
            InlineNode::Token(t) => t.display_text(),
        }
    }

    /// Length in chars of the rendered form
    pub fn char_len(&self) -> usize {
        self.rendered().chars().count()
    }
}

// =============================================================================
// SerializedNode
// =============================================================================

/// Persisted form of one inline node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    Text { text: String },
    Token(SerializedToken),
}

// =============================================================================
// InlineDocument
// =============================================================================

/// Flat inline document owning its nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineDocument {
    nodes: Vec<InlineNode>,
}

impl InlineDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with a single text run
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.nodes.push(InlineNode::text(text));
        doc.normalize();
        doc
    }

    pub fn nodes(&self) -> &[InlineNode] {
        &self.nodes
    }

    /// Immutable text snapshot of the whole document
    pub fn text(&self) -> String {
        self.nodes.iter().map(InlineNode::rendered).collect()
    }

    /// Snapshot for trigger scanning: token interiors are masked with the
    /// object replacement character (same length as the rendered form, so
    /// offsets line up) and can never produce or extend a match.
    pub fn scan_text(&self) -> String {
        self.nodes
            .iter()
            .map(|node| match node {
                InlineNode::Text(s) => s.clone(),
                InlineNode::Token(t) => "\u{FFFC}".repeat(t.char_len()),
            })
            .collect()
    }

    /// Total length in chars
    pub fn char_len(&self) -> usize {
        self.nodes.iter().map(InlineNode::char_len).sum()
    }

    pub fn token_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, InlineNode::Token(_)))
            .count()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Insert plain text at a char offset. Offsets strictly inside a token
    /// snap forward to the token boundary (tokens never grow). Returns the
    /// offset immediately after the inserted text, or `None` when the offset
    /// is past the end of the document.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Option<usize> {
        if offset > self.char_len() {
            return None;
        }
        if text.is_empty() {
            return Some(offset);
        }
        let inserted_len = text.chars().count();

        let mut pos = 0usize;
        let mut target = self.nodes.len(); // append by default
        let mut in_node = 0usize;
        let mut effective = offset;
        for (idx, node) in self.nodes.iter().enumerate() {
            let end = pos + node.char_len();
            if offset <= end {
                match node {
                    InlineNode::Text(_) => {
                        target = idx;
                        in_node = offset - pos;
                    }
                    InlineNode::Token(_) => {
                        if offset == pos {
                            // Boundary before the token: insert in front of it
                            target = idx;
                            in_node = 0;
                        } else {
                            // Interior or trailing boundary: snap after the token
                            target = idx + 1;
                            in_node = 0;
                            effective = end;
                        }
                    }
                }
                break;
            }
            pos = end;
        }

        if let Some(InlineNode::Text(s)) = self.nodes.get_mut(target) {
            let byte = char_to_byte(s, in_node);
            s.insert_str(byte, text);
        } else {
            self.nodes.insert(target, InlineNode::text(text));
        }
        self.normalize();
        Some(effective + inserted_len)
    }

    /// Delete one unit backward from a char offset: the previous grapheme in
    /// text, or the whole token when the offset sits at (or inside) a token.
    /// Returns the new caret offset; `None` when nothing was deleted.
    pub fn backspace(&mut self, offset: usize) -> Option<usize> {
        if offset == 0 || offset > self.char_len() {
            return None;
        }
        // Locate the node holding the char at offset - 1
        let mut pos = 0usize;
        let mut target = None;
        for (idx, node) in self.nodes.iter().enumerate() {
            let end = pos + node.char_len();
            if offset - 1 < end {
                target = Some((idx, pos));
                break;
            }
            pos = end;
        }
        let (idx, node_start) = target?;

        if matches!(self.nodes[idx], InlineNode::Token(_)) {
            // Whole-token deletion, never a partial one
            self.nodes.remove(idx);
            self.normalize();
            return Some(node_start);
        }

        if let InlineNode::Text(s) = &mut self.nodes[idx] {
            let in_off = offset - node_start;
            let prefix_byte = char_to_byte(s, in_off);
            let (grapheme_bytes, removed_chars) = {
                let grapheme = s[..prefix_byte].graphemes(true).next_back()?;
                (grapheme.len(), grapheme.chars().count())
            };
            s.replace_range(prefix_byte - grapheme_bytes..prefix_byte, "");
            self.normalize();
            return Some(offset - removed_chars);
        }
        None
    }

    /// Delete a char range. Tokens partially covered by the range are
    /// removed whole. Returns the caret offset after deletion (the effective
    /// start, which can be left of `start` when a token was expanded).
    pub fn delete_range(&mut self, start: usize, end: usize) -> Option<usize> {
        if start > end || end > self.char_len() {
            return None;
        }
        let mut out: Vec<InlineNode> = Vec::with_capacity(self.nodes.len());
        let mut effective_start = start;
        let mut pos = 0usize;
        for node in self.nodes.drain(..) {
            let nstart = pos;
            let nend = pos + node.char_len();
            pos = nend;
            if nend <= start || nstart >= end {
                out.push(node);
                continue;
            }
            match node {
                InlineNode::Token(_) => {
                    // Overlapped at all: drop the whole token
                    if nstart < effective_start {
                        effective_start = nstart;
                    }
                }
                InlineNode::Text(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let cut_from = start.saturating_sub(nstart).min(chars.len());
                    let cut_to = (end - nstart).min(chars.len());
                    let mut kept = String::with_capacity(s.len());
                    kept.extend(&chars[..cut_from]);
                    kept.extend(&chars[cut_to..]);
                    if !kept.is_empty() {
                        out.push(InlineNode::Text(kept));
                    }
                }
            }
        }
        self.nodes = out;
        self.normalize();
        Some(effective_start)
    }

    /// Atomically replace `[start, end)` with one node. Fails (returns
    /// `false`, document untouched) when either boundary cuts a token
    /// interior or the range is out of bounds.
    pub fn replace_range(&mut self, start: usize, end: usize, node: InlineNode) -> bool {
        if start > end || end > self.char_len() {
            return false;
        }
        if self.splits_token(start) || self.splits_token(end) {
            return false;
        }
        self.delete_range(start, end);
        // Range boundaries are token-safe, so deletion kept `start` stable
        self.insert_node_at(start, node);
        self.normalize();
        true
    }

    /// Snap an offset that falls strictly inside a token forward to the
    /// token's trailing boundary; offsets elsewhere pass through (clamped to
    /// the document length).
    pub fn snap_to_boundary(&self, offset: usize) -> usize {
        let mut pos = 0usize;
        for node in &self.nodes {
            let end = pos + node.char_len();
            if offset > pos && offset < end {
                if matches!(node, InlineNode::Token(_)) {
                    return end;
                }
                return offset;
            }
            pos = end;
        }
        offset.min(self.char_len())
    }

    /// True when the offset falls strictly inside a token
    fn splits_token(&self, offset: usize) -> bool {
        let mut pos = 0usize;
        for node in &self.nodes {
            let end = pos + node.char_len();
            if offset > pos && offset < end {
                return matches!(node, InlineNode::Token(_));
            }
            pos = end;
        }
        false
    }

    fn insert_node_at(&mut self, offset: usize, node: InlineNode) {
        let mut pos = 0usize;
        for idx in 0..self.nodes.len() {
            let len = self.nodes[idx].char_len();
            let end = pos + len;
            if offset == pos {
                self.nodes.insert(idx, node);
                return;
            }
            if offset < end {
                // Inside a text run: split it (token interiors were rejected
                // by the caller)
                if let InlineNode::Text(s) = &self.nodes[idx] {
                    let byte = char_to_byte(s, offset - pos);
                    let (head, tail) = (s[..byte].to_string(), s[byte..].to_string());
                    self.nodes[idx] = InlineNode::Text(head);
                    self.nodes.insert(idx + 1, node);
                    self.nodes.insert(idx + 2, InlineNode::Text(tail));
                }
                return;
            }
            pos = end;
        }
        self.nodes.push(node);
    }

    /// Merge adjacent text runs and drop empty ones
    fn normalize(&mut self) {
        let mut out: Vec<InlineNode> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            match (&node, out.last_mut()) {
                (InlineNode::Text(s), _) if s.is_empty() => {}
                (InlineNode::Text(s), Some(InlineNode::Text(prev))) => prev.push_str(s),
                _ => out.push(node),
            }
        }
        self.nodes = out;
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Persisted form of the whole document
    pub fn to_serialized(&self) -> Vec<SerializedNode> {
        self.nodes
            .iter()
            .map(|node| match node {
                InlineNode::Text(s) => SerializedNode::Text { text: s.clone() },
                InlineNode::Token(t) => SerializedNode::Token(t.serialize()),
            })
            .collect()
    }

    /// Load from persisted form. Malformed or unknown-kind tokens degrade to
    /// plain text equal to their stored display text; the load itself never
    /// fails.
    pub fn from_serialized(registry: &TokenRegistry, nodes: &[SerializedNode]) -> Self {
        let mut doc = Self::new();
        for raw in nodes {
            match raw {
                SerializedNode::Text { text } => doc.nodes.push(InlineNode::text(text)),
                SerializedNode::Token(raw) => match registry.deserialize(raw) {
                    Ok(token) => doc.nodes.push(InlineNode::Token(token)),
                    Err(err) => {
                        log::warn(&format!("[Document] degrading token to text: {}", err));
                        let fallback = if raw.display_text.is_empty() {
                            &raw.value
                        } else {
                            &raw.display_text
                        };
                        doc.nodes.push(InlineNode::text(fallback));
                    }
                },
            }
        }
        doc.normalize();
        doc
    }
}

fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omnibar::token::TokenKind;

    fn mention() -> InlineToken {
        InlineToken::new(TokenKind::Mention, "user-42", "@John Doe")
    }

    // -------------------------------------------------------------------------
    // Requirement 1: snapshot renders tokens as display text
    // -------------------------------------------------------------------------
    #[test]
    fn test_text_snapshot() {
        let mut doc = InlineDocument::from_text("hello ");
        doc.replace_range(6, 6, InlineNode::Token(mention()));
        assert_eq!(doc.text(), "hello @John Doe");
        assert_eq!(doc.char_len(), 15);
    }

    // -------------------------------------------------------------------------
    // Requirement 2: replace_range swaps a span for one atomic node
    // -------------------------------------------------------------------------
    #[test]
    fn test_replace_range_with_token() {
        let mut doc = InlineDocument::from_text("hello @jo");
        assert!(doc.replace_range(6, 9, InlineNode::Token(mention())));
        assert_eq!(doc.text(), "hello @John Doe");
        assert_eq!(doc.token_count(), 1);
        // Text before the token survived untouched
        assert_eq!(doc.nodes()[0], InlineNode::text("hello "));
    }

    // -------------------------------------------------------------------------
    // Requirement 3: backspace after a token deletes the whole token
    // -------------------------------------------------------------------------
    #[test]
    fn test_backspace_deletes_whole_token() {
        let mut doc = InlineDocument::from_text("hello @jo");
        doc.replace_range(6, 9, InlineNode::Token(mention()));
        let caret = doc.backspace(doc.char_len()).unwrap();
        assert_eq!(doc.text(), "hello ");
        assert_eq!(caret, 6);
        assert_eq!(doc.token_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: backspace in text removes one grapheme
    // -------------------------------------------------------------------------
    #[test]
    fn test_backspace_grapheme_aware() {
        let mut doc = InlineDocument::from_text("hi é");
        let caret = doc.backspace(doc.char_len()).unwrap();
        assert_eq!(doc.text(), "hi ");
        assert_eq!(caret, 3);

        // Multi-scalar grapheme comes off in one backspace
        let mut doc = InlineDocument::from_text("ok e\u{301}");
        doc.backspace(doc.char_len()).unwrap();
        assert_eq!(doc.text(), "ok ");
    }

    // -------------------------------------------------------------------------
    // Requirement 5: insertion at a token boundary never extends the token
    // -------------------------------------------------------------------------
    #[test]
    fn test_insert_after_token_is_plain_text() {
        let mut doc = InlineDocument::new();
        doc.replace_range(0, 0, InlineNode::Token(mention()));
        let caret = doc.insert_text(doc.char_len(), "!").unwrap();
        assert_eq!(doc.text(), "@John Doe!");
        assert_eq!(caret, 10);
        assert_eq!(doc.token_count(), 1);
        match &doc.nodes()[0] {
            InlineNode::Token(t) => assert_eq!(t.display_text(), "@John Doe"),
            other => panic!("token was extended: {:?}", other),
        }
    }

    // -------------------------------------------------------------------------
    // Requirement 6: interior offsets never split a token
    // -------------------------------------------------------------------------
    #[test]
    fn test_no_interior_split() {
        let mut doc = InlineDocument::new();
        doc.replace_range(0, 0, InlineNode::Token(mention()));
        // replace_range refuses a boundary inside the token
        assert!(!doc.replace_range(2, 4, InlineNode::text("x")));
        assert_eq!(doc.text(), "@John Doe");
        // insert_text snaps past the token instead of splitting it
        doc.insert_text(3, "x").unwrap();
        assert_eq!(doc.text(), "@John Doex");
    }

    // -------------------------------------------------------------------------
    // Requirement 7: range deletion removes covered tokens whole
    // -------------------------------------------------------------------------
    #[test]
    fn test_delete_range_expands_over_token() {
        let mut doc = InlineDocument::from_text("a @jo b");
        doc.replace_range(2, 5, InlineNode::Token(mention()));
        // "a @John Doe b": delete from inside the token through the tail
        let caret = doc.delete_range(5, doc.char_len()).unwrap();
        assert_eq!(doc.text(), "a ");
        assert_eq!(caret, 2);
    }

    // -------------------------------------------------------------------------
    // Requirement 8: adjacent text runs merge after mutations
    // -------------------------------------------------------------------------
    #[test]
    fn test_normalization_merges_text() {
        let mut doc = InlineDocument::from_text("ab");
        doc.replace_range(1, 1, InlineNode::Token(mention()));
        doc.backspace(2).unwrap(); // removes the token again
        assert_eq!(doc.nodes(), &[InlineNode::text("ab")]);
    }

    // -------------------------------------------------------------------------
    // Requirement 9: scan snapshot masks token interiors at equal length
    // -------------------------------------------------------------------------
    #[test]
    fn test_scan_text_masks_tokens() {
        let mut doc = InlineDocument::from_text("hi @jo!");
        doc.replace_range(3, 6, InlineNode::Token(mention()));
        let masked = doc.scan_text();
        assert_eq!(masked.chars().count(), doc.char_len());
        assert!(masked.starts_with("hi "));
        assert!(masked.ends_with('!'));
        assert!(!masked.contains('@'));
    }

    // -------------------------------------------------------------------------
    // Requirement 10: document round-trips through the serialized form
    // -------------------------------------------------------------------------
    #[test]
    fn test_serialized_round_trip() {
        let registry = TokenRegistry::with_builtin_kinds();
        let mut doc = InlineDocument::from_text("hello ");
        doc.replace_range(6, 6, InlineNode::Token(mention()));
        doc.insert_text(doc.char_len(), " and #news").unwrap();

        let saved = serde_json::to_string(&doc.to_serialized()).unwrap();
        let loaded: Vec<SerializedNode> = serde_json::from_str(&saved).unwrap();
        let restored = InlineDocument::from_serialized(&registry, &loaded);
        assert_eq!(restored, doc);
    }

    // -------------------------------------------------------------------------
    // Requirement 11: unknown-kind tokens degrade to their display text
    // -------------------------------------------------------------------------
    #[test]
    fn test_unknown_kind_degrades_on_load() {
        let registry = TokenRegistry::with_builtin_kinds();
        let nodes = vec![
            SerializedNode::Text {
                text: "see ".to_string(),
            },
            SerializedNode::Token(SerializedToken {
                kind: "legacy-card".to_string(),
                value: "c1".to_string(),
                display_text: "@Old Card".to_string(),
                version: 1,
            }),
        ];
        let doc = InlineDocument::from_serialized(&registry, &nodes);
        assert_eq!(doc.text(), "see @Old Card");
        assert_eq!(doc.token_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 12: a token record missing a field still parses and degrades
    // -------------------------------------------------------------------------
    #[test]
    fn test_absent_field_degrades_not_aborts() {
        let registry = TokenRegistry::with_builtin_kinds();
        // No displayText on the token record; the whole load must survive
        let json = r#"[
            {"type":"text","text":"hello "},
            {"type":"token","kind":"mention","value":"user-1","version":1}
        ]"#;
        let nodes: Vec<SerializedNode> = serde_json::from_str(json).unwrap();
        let doc = InlineDocument::from_serialized(&registry, &nodes);
        // displayText was empty, so the fallback text is the stored value
        assert_eq!(doc.text(), "hello user-1");
        assert_eq!(doc.token_count(), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 13: offsets inside a token snap to its trailing boundary
    // -------------------------------------------------------------------------
    #[test]
    fn test_snap_to_boundary() {
        let mut doc = InlineDocument::from_text("hi ");
        doc.replace_range(3, 3, InlineNode::Token(mention()));
        // "hi @John Doe": the token spans 3..12
        assert_eq!(doc.snap_to_boundary(5), 12);
        assert_eq!(doc.snap_to_boundary(3), 3);
        assert_eq!(doc.snap_to_boundary(12), 12);
        assert_eq!(doc.snap_to_boundary(1), 1);
        assert_eq!(doc.snap_to_boundary(99), doc.char_len());
    }
}
