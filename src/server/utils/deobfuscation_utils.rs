// voe hides the player config in a one element json array inside an inline script. Undoing it is
// a fixed pipeline and the order of every step matters:
//
// json array -> rot13 -> strip noise tokens -> base64 -> shift code points down 3 -> reverse ->
// base64 -> json
//
// any of these failing just means the candidate was a decoy, callers move on to the next one
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde_json::Value;

/// two character junk sequences sprinkled through the base64 text
pub const NOISE_TOKENS: &[&str] = &["@$", "^^", "~@", "%?", "*~", "!!", "#&"];

/// deepest nesting `find_string_containing` will walk, parsed json can't loop but it can be silly
const MAX_SEARCH_DEPTH: usize = 64;

// forgiving decode: anything outside the alphabet is dropped beforehand and padding is optional
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeobfuscationError {
    #[error("payload is not a json array starting with a string")]
    MalformedPayload,

    #[error("decode failed: {0}")]
    Decode(String),
}

/// letters only, case is kept and everything else passes through
pub fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
            'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
            _ => c,
        })
        .collect()
}

pub fn strip_noise(input: &str) -> String {
    NOISE_TOKENS
        .iter()
        .fold(input.to_string(), |acc, token| acc.replace(token, ""))
}

/// base64 to text, invalid utf-8 turns into U+FFFD instead of failing
pub fn decode_base64_lossy(input: &str) -> Result<String, DeobfuscationError> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();

    let bytes = LENIENT_BASE64
        .decode(cleaned.trim_end_matches('='))
        .map_err(|e| DeobfuscationError::Decode(format!("base64: {}", e)))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// moves every code point down by `shift`, not just letters
pub fn shift_chars_down(input: &str, shift: u32) -> Result<String, DeobfuscationError> {
    input
        .chars()
        .map(|c| {
            (c as u32)
                .checked_sub(shift)
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    DeobfuscationError::Decode(format!(
                        "cannot shift U+{:04X} down by {}",
                        c as u32, shift
                    ))
                })
        })
        .collect()
}

pub fn deobfuscate(payload: &str) -> Result<Value, DeobfuscationError> {
    let parsed: Value =
        serde_json::from_str(payload).map_err(|_| DeobfuscationError::MalformedPayload)?;
    let obfuscated = parsed
        .as_array()
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .ok_or(DeobfuscationError::MalformedPayload)?;

    let rotated = rot13(obfuscated);
    let stripped = strip_noise(&rotated);
    let decoded = decode_base64_lossy(&stripped)?;
    let shifted = shift_chars_down(&decoded, 3)?;
    let reversed: String = shifted.chars().rev().collect();
    let json_text = decode_base64_lossy(&reversed)?;

    serde_json::from_str(&json_text).map_err(|e| DeobfuscationError::Decode(format!("json: {}", e)))
}

/// depth first search for the first string value that contains `marker`
pub fn find_string_containing<'a>(value: &'a Value, marker: &str) -> Option<&'a str> {
    fn walk<'a>(value: &'a Value, marker: &str, depth: usize) -> Option<&'a str> {
        if depth > MAX_SEARCH_DEPTH {
            return None;
        }

        match value {
            Value::String(s) if s.contains(marker) => Some(s.as_str()),
            Value::Object(map) => map.values().find_map(|v| walk(v, marker, depth + 1)),
            Value::Array(items) => items.iter().find_map(|v| walk(v, marker, depth + 1)),
            _ => None,
        }
    }

    walk(value, marker, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rot13_only_touches_letters() {
        assert_eq!(rot13("Hello, World! 123+/="), "Uryyb, Jbeyq! 123+/=");
        assert_eq!(rot13(&rot13("MixedCase")), "MixedCase");
    }

    #[test]
    fn strip_noise_removes_every_token() {
        assert_eq!(strip_noise("ab@$cd^^ef~@gh%?ij*~kl!!mn#&op"), "abcdefghijklmnop");
        assert_eq!(strip_noise("no tokens here"), "no tokens here");
    }

    #[test]
    fn decode_base64_lossy_replaces_bad_utf8() {
        // 0xff is never valid utf-8
        assert_eq!(decode_base64_lossy("/w==").unwrap(), "\u{FFFD}");
        assert_eq!(decode_base64_lossy("aGVsbG8").unwrap(), "hello");
    }

    #[test]
    fn decode_base64_lossy_rejects_impossible_lengths() {
        assert!(matches!(
            decode_base64_lossy("a"),
            Err(DeobfuscationError::Decode(_))
        ));
    }

    #[test]
    fn shift_fails_below_zero() {
        assert_eq!(shift_chars_down("def", 3).unwrap(), "abc");
        assert!(shift_chars_down("\u{1}", 3).is_err());
    }

    #[test]
    fn malformed_payloads() {
        assert_eq!(deobfuscate("not json"), Err(DeobfuscationError::MalformedPayload));
        assert_eq!(deobfuscate("[1, 2]"), Err(DeobfuscationError::MalformedPayload));
        assert_eq!(deobfuscate("{\"a\": \"b\"}"), Err(DeobfuscationError::MalformedPayload));
        assert_eq!(deobfuscate("[]"), Err(DeobfuscationError::MalformedPayload));
    }

    #[test]
    fn search_walks_nested_values() {
        let value = json!({
            "title": "x",
            "qualities": [
                {"label": "720p", "file": "https://cdn.example/seg.ts"},
                {"label": "auto", "file": "https://cdn.example/hls/master.m3u8?t=1"}
            ]
        });

        assert_eq!(
            find_string_containing(&value, "master.m3u8"),
            Some("https://cdn.example/hls/master.m3u8?t=1")
        );
        assert_eq!(find_string_containing(&value, "nothing"), None);
        assert_eq!(
            find_string_containing(&json!("top level master.m3u8"), "master.m3u8"),
            Some("top level master.m3u8")
        );
    }

    #[test]
    fn search_gives_up_past_the_depth_cap() {
        let mut value = json!("deep/master.m3u8");
        for _ in 0..(MAX_SEARCH_DEPTH + 5) {
            value = json!([value]);
        }
        assert_eq!(find_string_containing(&value, "master.m3u8"), None);
    }
}
