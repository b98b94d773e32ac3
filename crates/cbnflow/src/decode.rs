//! Source file decoding.
//!
//! Inputs come from legacy tooling and are not always valid in the configured
//! encoding. Decoding degrades through three tiers and never fails:
//! primary encoding, then Windows-1252, then lossy UTF-8.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Bytes Windows-1252 leaves unassigned. encoding_rs maps them to C1
/// controls; we treat them as errors so that tier two is strict.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Which tier produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeTier {
    Primary,
    Legacy,
    Lossy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub tier: DecodeTier,
    pub encoding_label: &'static str,
}

/// Decode `bytes` using `label` first, falling back as described above.
///
/// An unknown label skips straight to the legacy tier.
pub fn decode_source(bytes: &[u8], label: &str) -> DecodedText {
    if let Some(encoding) = Encoding::for_label(label.as_bytes())
        && let Some(text) = decode_strict(bytes, encoding)
    {
        return DecodedText {
            text,
            tier: DecodeTier::Primary,
            encoding_label: encoding.name(),
        };
    }

    if let Some(text) = decode_cp1252(bytes) {
        return DecodedText {
            text,
            tier: DecodeTier::Legacy,
            encoding_label: WINDOWS_1252.name(),
        };
    }

    DecodedText {
        text: String::from_utf8_lossy(bytes).into_owned(),
        tier: DecodeTier::Lossy,
        encoding_label: UTF_8.name(),
    }
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    if encoding == WINDOWS_1252 {
        return decode_cp1252(bytes);
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        return None;
    }
    WINDOWS_1252
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
