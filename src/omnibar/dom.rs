//! DOM import boundary for pasted / externally authored content
//!
//! The host serializes a pasted DOM subtree into flat [`DomNode`] records
//! (one boundary call, no per-element chatter) and this module turns them
//! into inline nodes. Recognition is attribute-driven:
//!
//! - `data-token-kind` + `data-token-value` → token via the registry
//! - well-formed but unrecognized kind → plain text (display text survives)
//! - malformed attribute sets → dropped silently
//! - anything else → its text content

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::log;
use crate::omnibar::document::InlineNode;
use crate::omnibar::registry::TokenRegistry;
use crate::omnibar::token::TokenKind;

// =============================================================================
// Constants
// =============================================================================

/// Marker attribute carrying the token kind
pub const ATTR_TOKEN_KIND: &str = "data-token-kind";

/// Marker attribute carrying the token value
pub const ATTR_TOKEN_VALUE: &str = "data-token-value";

// =============================================================================
// DomNode
// =============================================================================

/// Host-serialized view of one DOM element (or text run)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DomNode {
    /// Lowercased tag name; empty for bare text runs
    #[serde(default)]
    pub tag: String,
    /// Flattened attribute map
    #[serde(default)]
    pub attrs: HashMap<String, String>,
    /// Concatenated text content
    #[serde(default)]
    pub text: String,
}

impl DomNode {
    /// Bare text run
    pub fn text_run(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Element carrying token marker attributes
    pub fn token_element(kind: &str, value: &str, text: &str) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert(ATTR_TOKEN_KIND.to_string(), kind.to_string());
        attrs.insert(ATTR_TOKEN_VALUE.to_string(), value.to_string());
        Self {
            tag: "span".to_string(),
            attrs,
            text: text.to_string(),
        }
    }

    pub fn token_kind_attr(&self) -> Option<&str> {
        self.attrs.get(ATTR_TOKEN_KIND).map(String::as_str)
    }

    pub fn token_value_attr(&self) -> Option<&str> {
        self.attrs.get(ATTR_TOKEN_VALUE).map(String::as_str)
    }
}

// =============================================================================
// Import
// =============================================================================

/// Import a flattened DOM fragment into inline nodes.
///
/// Never fails: well-formed markup always yields nodes, however degraded.
pub fn import_fragment(registry: &TokenRegistry, fragment: &[DomNode]) -> Vec<InlineNode> {
    let mut nodes = Vec::with_capacity(fragment.len());
    for dom in fragment {
        if let Some(node) = import_node(registry, dom) {
            nodes.push(node);
        }
    }
    nodes
}

fn import_node(registry: &TokenRegistry, dom: &DomNode) -> Option<InlineNode> {
    let kind_attr = match dom.token_kind_attr() {
        Some(kind) => kind,
        None => {
            // Ordinary content: contribute text, skip empty runs
            if dom.text.is_empty() {
                return None;
            }
            return Some(InlineNode::text(&dom.text));
        }
    };

    // Marker present but empty → malformed, drop
    if kind_attr.is_empty() {
        log::warn("[DomImport] dropping element with empty data-token-kind");
        return None;
    }

    match TokenKind::parse(kind_attr) {
        Some(_) => match registry.import_dom(dom) {
            Some(token) => Some(InlineNode::Token(token)),
            None => {
                // Known kind, malformed attributes (e.g. missing value)
                log::warn(&format!(
                    "[DomImport] dropping malformed `{}` element",
                    kind_attr
                ));
                None
            }
        },
        None => {
            // Well-formed but unrecognized kind: keep the visible text
            if dom.text.is_empty() {
                return None;
            }
            log::warn(&format!(
                "[DomImport] unknown token kind `{}`, degrading to text",
                kind_attr
            ));
            Some(InlineNode::text(&dom.text))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
