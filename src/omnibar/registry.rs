//! TokenRegistry: kind → behavior dispatch table
//!
//! One registry maps each token kind to its (serialize, deserialize,
//! dom-import) behavior. Kinds are globally unique; registering a kind twice
//! is a configuration bug and fails immediately. Unknown kinds are the
//! normal, recoverable case on the read paths and degrade instead of
//! erroring.

use std::collections::HashMap;

use thiserror::Error;

use crate::omnibar::document::{InlineDocument, InlineNode};
use crate::omnibar::dom::DomNode;
use crate::omnibar::token::{InlineToken, MalformedTokenError, SerializedToken, TokenKind};

// =============================================================================
// Errors
// =============================================================================

/// Registry misconfiguration: the same kind registered twice.
/// Programmer error, fatal at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token kind `{0}` is already registered")]
pub struct DuplicateTokenKindError(pub String);

// =============================================================================
// TokenBehavior
// =============================================================================

/// Per-kind token behavior. The registry dispatches on the kind
/// discriminant; implementations specialize validation and DOM import.
pub trait TokenBehavior {
    fn kind(&self) -> TokenKind;

    /// Produce the persisted form
    fn serialize(&self, token: &InlineToken) -> SerializedToken {
        token.serialize()
    }

    /// Rebuild a token from its persisted form
    fn deserialize(&self, raw: &SerializedToken) -> Result<InlineToken, MalformedTokenError> {
        InlineToken::deserialize(raw)
    }

    /// Import from a host-serialized DOM element. `None` means the element
    /// is malformed for this kind; the caller drops it.
    fn import_dom(&self, dom: &DomNode) -> Option<InlineToken> {
        let value = dom.token_value_attr()?;
        if value.is_empty() {
            return None;
        }
        let display = if dom.text.is_empty() { value } else { &dom.text };
        Some(InlineToken::new(self.kind(), value, display))
    }
}

// =============================================================================
// Built-in behaviors
// =============================================================================

/// Mention (`@`): value is an opaque user id, display text is the name.
/// Requires an explicit `data-token-value` on import.
pub struct MentionBehavior;

impl TokenBehavior for MentionBehavior {
    fn kind(&self) -> TokenKind {
        TokenKind::Mention
    }
}

/// Topic (`#`): value doubles as display. Import tolerates a missing value
/// attribute by falling back to the element text minus the trigger.
pub struct TopicBehavior;

impl TokenBehavior for TopicBehavior {
    fn kind(&self) -> TokenKind {
        TokenKind::Topic
    }

    fn import_dom(&self, dom: &DomNode) -> Option<InlineToken> {
        let value = match dom.token_value_attr() {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                let text = dom.text.trim_start_matches('#');
                if text.is_empty() {
                    return None;
                }
                text.to_string()
            }
        };
        let display = if dom.text.is_empty() {
            value.clone()
        } else {
            dom.text.clone()
        };
        Some(InlineToken::new(TokenKind::Topic, value, display))
    }
}

/// Entity (`~`): value is an entity reference id.
/// Requires an explicit `data-token-value` on import.
pub struct EntityBehavior;

impl TokenBehavior for EntityBehavior {
    fn kind(&self) -> TokenKind {
        TokenKind::Entity
    }
}

// =============================================================================
// TokenRegistry
// =============================================================================

/// Dispatch table from canonical kind name to behavior
pub struct TokenRegistry {
    behaviors: HashMap<&'static str, Box<dyn TokenBehavior>>,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::with_builtin_kinds()
    }
}

impl TokenRegistry {
    /// Empty registry (hosts composing a custom kind set)
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Registry with the three built-in kinds registered
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        let builtins: [Box<dyn TokenBehavior>; 3] = [
            Box::new(MentionBehavior),
            Box::new(TopicBehavior),
            Box::new(EntityBehavior),
        ];
        for behavior in builtins {
            registry
                .register(behavior)
                .expect("builtin kinds are distinct");
        }
        registry
    }

    /// Register a behavior. Duplicate kinds fail with
    /// [`DuplicateTokenKindError`].
    pub fn register(
        &mut self,
        behavior: Box<dyn TokenBehavior>,
    ) -> Result<(), DuplicateTokenKindError> {
        let name = behavior.kind().as_str();
        if self.behaviors.contains_key(name) {
            return Err(DuplicateTokenKindError(name.to_string()));
        }
        self.behaviors.insert(name, behavior);
        Ok(())
    }

    pub fn is_registered(&self, kind: TokenKind) -> bool {
        self.behaviors.contains_key(kind.as_str())
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    fn behavior_for(&self, kind: TokenKind) -> Option<&dyn TokenBehavior> {
        self.behaviors.get(kind.as_str()).map(Box::as_ref)
    }

    /// Serialize every token node in the document, in document order
    pub fn serialize_all(&self, document: &InlineDocument) -> Vec<SerializedToken> {
        document
            .nodes()
            .iter()
            .filter_map(|node| match node {
                InlineNode::Token(token) => Some(
                    self.behavior_for(token.kind())
                        .map(|b| b.serialize(token))
                        .unwrap_or_else(|| token.serialize()),
                ),
                InlineNode::Text(_) => None,
            })
            .collect()
    }

    /// Rebuild a token from its persisted form, dispatching on the kind
    /// string (legacy aliases resolved).
    pub fn deserialize(&self, raw: &SerializedToken) -> Result<InlineToken, MalformedTokenError> {
        let kind = TokenKind::parse(&raw.kind)
            .ok_or_else(|| MalformedTokenError::UnknownKind(raw.kind.clone()))?;
        let behavior = self
            .behavior_for(kind)
            .ok_or_else(|| MalformedTokenError::UnknownKind(raw.kind.clone()))?;
        behavior.deserialize(raw)
    }

    /// Import one DOM element, dispatched via its `data-token-kind` marker.
    /// Returns `None` for unknown kinds or malformed markers; never errors
    /// on well-formed-but-unrecognized markup.
    pub fn import_dom(&self, dom: &DomNode) -> Option<InlineToken> {
        let kind = TokenKind::parse(dom.token_kind_attr()?)?;
        self.behavior_for(kind)?.import_dom(dom)
    }
}

// =============================================================================
// Tests
// =============================================================================
