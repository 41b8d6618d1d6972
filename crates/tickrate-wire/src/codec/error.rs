//! Errors reported while decoding wire objects.

use thiserror::Error;

/// Errors surfaced by [`decode`](super::decode).
///
/// Positions are byte offsets into the decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input does not begin with `{`.
    #[error("input is not an object")]
    NotAnObject,
    /// The input ended before the object was closed.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// A character appeared where the grammar does not allow it.
    #[error("unexpected character '{found}' at byte {position}")]
    UnexpectedCharacter {
        /// Offending character.
        found: char,
        /// Byte offset of the character.
        position: usize,
    },
    /// A string literal was not closed before the input ended.
    #[error("unterminated string starting at byte {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// A backslash escape other than `\" \\ \n \r \t` was found.
    #[error("invalid escape sequence '\\{escape}' at byte {position}")]
    InvalidEscape {
        /// Character following the backslash.
        escape: char,
        /// Byte offset of the backslash.
        position: usize,
    },
    /// A nested object or array was not balanced before the input ended.
    #[error("unbalanced nested value starting at byte {position}")]
    UnbalancedNested {
        /// Byte offset of the opening bracket.
        position: usize,
    },
    /// Non-whitespace text followed the closing brace.
    #[error("trailing characters after object at byte {position}")]
    TrailingCharacters {
        /// Byte offset of the first trailing character.
        position: usize,
    },
}
