//! Decoder for wire objects.

use super::{DecodeError, WireMessage, WireValue};

/// Decodes `input` into a [`WireMessage`].
///
/// The input must start with `{`. String values support the escapes
/// `\" \\ \n \r \t`; any other escape is rejected. Nested objects and arrays
/// are captured as balanced source text without being parsed, and the literal
/// `null` decodes to [`WireValue::Null`].
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first malformed construct.
pub fn decode(input: &str) -> Result<WireMessage, DecodeError> {
    let mut cursor = Cursor::new(input);
    if cursor.peek() != Some(b'{') {
        return Err(DecodeError::NotAnObject);
    }
    cursor.advance();

    let mut message = WireMessage::new();
    cursor.skip_whitespace();
    if cursor.peek() == Some(b'}') {
        cursor.advance();
        cursor.finish()?;
        return Ok(message);
    }

    loop {
        cursor.skip_whitespace();
        cursor.expect(b'"')?;
        let key = cursor.string()?;
        cursor.skip_whitespace();
        cursor.expect(b':')?;
        cursor.skip_whitespace();
        let value = cursor.value()?;
        message.insert(key, value);
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b',') => cursor.advance(),
            Some(b'}') => {
                cursor.advance();
                cursor.finish()?;
                return Ok(message);
            }
            Some(_) => return Err(cursor.unexpected()),
            None => return Err(DecodeError::UnexpectedEnd),
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.advance();
        Some(byte)
    }

    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or_default()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }

    fn unexpected(&self) -> DecodeError {
        match self.rest().chars().next() {
            Some(found) => DecodeError::UnexpectedCharacter {
                found,
                position: self.pos,
            },
            None => DecodeError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<(), DecodeError> {
        match self.peek() {
            Some(byte) if byte == wanted => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(DecodeError::UnexpectedEnd),
        }
    }

    fn finish(&mut self) -> Result<(), DecodeError> {
        self.skip_whitespace();
        if self.pos < self.bytes.len() {
            return Err(DecodeError::TrailingCharacters { position: self.pos });
        }
        Ok(())
    }

    fn value(&mut self) -> Result<WireValue, DecodeError> {
        match self.peek() {
            Some(b'"') => {
                self.advance();
                self.string().map(WireValue::Text)
            }
            Some(b'{' | b'[') => self.nested().map(WireValue::Nested),
            Some(b'n') if self.rest().starts_with("null") => {
                self.pos += "null".len();
                Ok(WireValue::Null)
            }
            Some(_) => Err(self.unexpected()),
            None => Err(DecodeError::UnexpectedEnd),
        }
    }

    /// Reads a string body; the opening quote has already been consumed.
    fn string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos.saturating_sub(1);
        let mut out = Vec::new();
        loop {
            let Some(byte) = self.next_byte() else {
                return Err(DecodeError::UnterminatedString { position: start });
            };
            match byte {
                b'"' => break,
                b'\\' => {
                    let escape_at = self.pos - 1;
                    let Some(escaped) = self.next_byte() else {
                        return Err(DecodeError::UnterminatedString { position: start });
                    };
                    let decoded = match escaped {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        _ => {
                            let escape = self
                                .src
                                .get(escape_at + 1..)
                                .and_then(|tail| tail.chars().next())
                                .unwrap_or(char::REPLACEMENT_CHARACTER);
                            return Err(DecodeError::InvalidEscape {
                                escape,
                                position: escape_at,
                            });
                        }
                    };
                    out.push(decoded);
                }
                other => out.push(other),
            }
        }
        // Only ASCII bytes are rewritten, so multi-byte sequences survive intact.
        Ok(String::from_utf8(out)
            .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned()))
    }

    /// Captures a balanced `{...}` or `[...]` region verbatim.
    fn nested(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let mut depth = 0_usize;
        while let Some(byte) = self.next_byte() {
            match byte {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self
                            .src
                            .get(start..self.pos)
                            .map(str::to_owned)
                            .ok_or(DecodeError::UnbalancedNested { position: start });
                    }
                }
                b'"' => self.skip_quoted(start)?,
                _ => {}
            }
        }
        Err(DecodeError::UnbalancedNested { position: start })
    }

    /// Skips a quoted string inside a nested region so braces in text do not
    /// affect the depth count.
    fn skip_quoted(&mut self, nested_start: usize) -> Result<(), DecodeError> {
        while let Some(byte) = self.next_byte() {
            match byte {
                b'"' => return Ok(()),
                b'\\' => {
                    if self.next_byte().is_none() {
                        break;
                    }
                }
                _ => {}
            }
        }
        Err(DecodeError::UnbalancedNested {
            position: nested_start,
        })
    }
}
