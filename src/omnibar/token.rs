//! Inline token nodes and their persisted form
//!
//! Tokens are atomic inline document elements: a resolved mention, topic, or
//! entity reference. The kind is a tagged-union discriminant; per-kind
//! behavior lives in the registry, not in subclasses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Current persisted token format version
pub const SERIALIZED_VERSION: u32 = 1;

// =============================================================================
// TokenKind
// =============================================================================

/// Kind of inline token
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Mention,
    Topic,
    Entity,
}

impl TokenKind {
    /// Canonical serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Mention => "mention",
            TokenKind::Topic => "topic",
            TokenKind::Entity => "entity",
        }
    }

    /// Parse a serialized kind name. `"hashtag"` is a legacy alias for
    /// `Topic` (documents written before the rename must still load).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mention" => Some(TokenKind::Mention),
            "topic" | "hashtag" => Some(TokenKind::Topic),
            "entity" => Some(TokenKind::Entity),
            _ => None,
        }
    }

    /// Trigger character that begins a typeahead match for this kind
    pub fn trigger_char(&self) -> char {
        match self {
            TokenKind::Mention => '@',
            TokenKind::Topic => '#',
            TokenKind::Entity => '~',
        }
    }

    /// Fixed evaluation priority: lower value wins. Only the
    /// highest-priority matching controller stays active.
    pub fn priority(&self) -> u8 {
        match self {
            TokenKind::Mention => 0,
            TokenKind::Topic => 1,
            TokenKind::Entity => 2,
        }
    }

    /// All kinds in priority order
    pub fn all() -> [TokenKind; 3] {
        [TokenKind::Mention, TokenKind::Topic, TokenKind::Entity]
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A serialized token that cannot be turned back into a node.
///
/// Recovered locally: callers substitute plain text for the broken token
/// rather than failing the whole document load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTokenError {
    #[error("unrecognized token kind `{0}`")]
    UnknownKind(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported token version {0}")]
    UnsupportedVersion(u32),
}

// =============================================================================
// SerializedToken
// =============================================================================

/// Persisted token form. Must round-trip exactly through save/load.
///
/// Every field defaults on deserialize: a record with an absent field still
/// parses, and the empty value is caught by [`InlineToken::deserialize`] as
/// malformed. A broken token must degrade, never abort the document load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedToken {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "displayText", default)]
    pub display_text: String,
    #[serde(default)]
    pub version: u32,
}

// =============================================================================
// InlineToken
// =============================================================================

/// Atomic inline token node.
///
/// Invariants (enforced by [`InlineToken::new`]):
/// - `display_text` always begins with the kind's trigger character
/// - `value` never begins with it (interior occurrences are the host's data
///   and pass through untouched)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineToken {
    kind: TokenKind,
    value: String,
    display_text: String,
}

impl InlineToken {
    /// Create a token, normalizing the trigger-character invariants.
    pub fn new(kind: TokenKind, value: impl Into<String>, display_text: impl Into<String>) -> Self {
        let trigger = kind.trigger_char();
        let mut value = value.into();
        if value.starts_with(trigger) {
            value.remove(0);
        }
        let mut display_text = display_text.into();
        if !display_text.starts_with(trigger) {
            display_text.insert(0, trigger);
        }
        Self {
            kind,
            value,
            display_text,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Length of the rendered token in chars (tokens render as their
    /// display text)
    pub fn char_len(&self) -> usize {
        self.display_text.chars().count()
    }

    /// Produce the persisted form
    pub fn serialize(&self) -> SerializedToken {
        SerializedToken {
            kind: self.kind.as_str().to_string(),
            value: self.value.clone(),
            display_text: self.display_text.clone(),
            version: SERIALIZED_VERSION,
        }
    }

    /// Rebuild a token from its persisted form.
    ///
    /// Fails with [`MalformedTokenError`] when required fields are absent or
    /// the kind is unrecognized. Versions newer than this build are treated
    /// as malformed rather than misread.
    pub fn deserialize(raw: &SerializedToken) -> Result<Self, MalformedTokenError> {
        if raw.version > SERIALIZED_VERSION {
            return Err(MalformedTokenError::UnsupportedVersion(raw.version));
        }
        let kind = TokenKind::parse(&raw.kind)
            .ok_or_else(|| MalformedTokenError::UnknownKind(raw.kind.clone()))?;
        if raw.value.is_empty() {
            return Err(MalformedTokenError::MissingField("value"));
        }
        if raw.display_text.is_empty() {
            return Err(MalformedTokenError::MissingField("displayText"));
        }
        Ok(Self::new(kind, raw.value.clone(), raw.display_text.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
