//! Encoder for wire objects.

use super::{WireMessage, WireValue};

/// Serialises `message` as compact JSON object text.
///
/// Keys and string values escape `"`, `\`, and control characters below
/// `0x20` (`\n`, `\r` and `\t` in short form, everything else as `\uXXXX`).
/// `null` markers become `null`, and nested values are written verbatim.
#[must_use]
pub fn encode(message: &WireMessage) -> String {
    let mut out = String::with_capacity(64);
    out.push('{');
    for (index, (key, value)) in message.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_string(&mut out, key);
        out.push(':');
        match value {
            WireValue::Text(text) => push_string(&mut out, text),
            WireValue::Null => out.push_str("null"),
            WireValue::Nested(source) => out.push_str(source),
        }
    }
    out.push('}');
    out
}

fn push_string(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            control if u32::from(control) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", u32::from(control)));
            }
            other => out.push(other),
        }
    }
    out.push('"');
}
