//! Wire-ready filter literals

/// Type tag prefixed to a quoted literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralTag {
    /// `guid'…'`
    Guid,
    /// `datetime'…'`
    DateTime,
    /// `time'…'`
    Time,
    /// `X'…'`
    Binary,
    /// `'…'` with embedded quotes doubled
    Text,
}

/// A literal produced by a codec's filter encoding
///
/// Untagged literals (numbers, booleans, `null`) render verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedLiteral {
    tag: Option<LiteralTag>,
    payload: String,
}

impl TypedLiteral {
    pub(crate) fn plain(payload: impl Into<String>) -> Self {
        Self {
            tag: None,
            payload: payload.into(),
        }
    }

    pub(crate) fn tagged(tag: LiteralTag, payload: impl Into<String>) -> Self {
        Self {
            tag: Some(tag),
            payload: payload.into(),
        }
    }

    pub(crate) fn null() -> Self {
        Self::plain("null")
    }

    pub fn tag(&self) -> Option<LiteralTag> {
        self.tag
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl std::fmt::Display for TypedLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tag {
            None => f.write_str(&self.payload),
            Some(LiteralTag::Text) => write!(f, "'{}'", self.payload.replace('\'', "''")),
            Some(LiteralTag::Guid) => write!(f, "guid'{}'", self.payload),
            Some(LiteralTag::DateTime) => write!(f, "datetime'{}'", self.payload),
            Some(LiteralTag::Time) => write!(f, "time'{}'", self.payload),
            Some(LiteralTag::Binary) => write!(f, "X'{}'", self.payload),
        }
    }
}
