//! Minimal codec for the JSON object subset used on the wire.
//!
//! Objects decode into an ordered list of key/value pairs. Nested objects and
//! arrays are not parsed eagerly: their balanced source text is captured and
//! kept opaque until a caller asks for it with [`WireMessage::object`].

mod decode;
mod encode;
mod error;


pub use self::decode::decode;
pub use self::encode::encode;
pub use self::error::DecodeError;

/// A single value stored in a [`WireMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// An unescaped string value.
    Text(String),
    /// The literal `null`.
    Null,
    /// Balanced source text of a nested object or array, kept verbatim.
    Nested(String),
}

impl WireValue {
    /// Returns the string payload when the value is [`WireValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Null | Self::Nested(_) => None,
        }
    }

    /// Returns text that may itself be decoded as an object.
    ///
    /// Request envelopes carry their `data` either as a JSON string holding
    /// serialised text or as an inline object; both forms are accepted.
    #[must_use]
    pub fn as_source(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Nested(text) => Some(text),
            Self::Null => None,
        }
    }

    /// Returns `true` for the `null` marker.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// An ordered mapping from keys to [`WireValue`]s.
///
/// Storage does not enforce key uniqueness; lookups return the first pair
/// inserted under a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireMessage {
    pairs: Vec<(String, WireValue)>,
}

impl WireMessage {
    /// Creates an empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Appends a pair, keeping insertion order.
    pub fn insert(&mut self, key: impl Into<String>, value: WireValue) {
        self.pairs.push((key.into(), value));
    }

    /// Builder-style variant of [`WireMessage::insert`] for string values.
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, WireValue::Text(value.into()));
        self
    }

    /// Builder-style insertion of a nested object, serialised immediately.
    #[must_use]
    pub fn with_object(mut self, key: impl Into<String>, value: &Self) -> Self {
        self.insert(key, WireValue::Nested(encode(value)));
        self
    }

    /// Looks up the first value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&WireValue> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Looks up a string value. `null` and nested values yield `None`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(WireValue::as_text)
    }

    /// Decodes the nested object stored under `key`.
    ///
    /// Returns `None` when the key is absent, is not a nested value, or its
    /// text does not decode as an object.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Self> {
        match self.get(key)? {
            WireValue::Nested(source) => decode(source).ok(),
            WireValue::Text(_) | WireValue::Null => None,
        }
    }

    /// Iterates over the stored pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of stored pairs, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` when no pairs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WireMessage
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut message = Self::new();
        for (key, value) in iter {
            message.insert(key, WireValue::Text(value.into()));
        }
        message
    }
}
