// Text decoding with an ordered fallback chain

use std::fmt;

use serde::{Deserialize, Serialize};

/// A text encoding the table readers know how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1")]
    Latin1,
    #[serde(rename = "cp1252", alias = "windows-1252")]
    Windows1252,
    #[serde(rename = "iso-8859-1", alias = "iso8859-1")]
    Iso8859_1,
}

/// Default decoding order. Latin-1 accepts every byte sequence, so the two
/// candidates after it are only reached when the chain is reordered or cut.
pub const DEFAULT_CHAIN: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
    TextEncoding::Iso8859_1,
];

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "cp1252",
            Self::Iso8859_1 => "iso-8859-1",
        }
    }

    /// Decode `bytes` strictly. Returns `None` when the bytes are not valid in
    /// this encoding; never substitutes replacement characters.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            }
            Self::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            // Byte value == code point
            Self::Latin1 | Self::Iso8859_1 => {
                Some(encoding_rs::mem::decode_latin1(bytes).into_owned())
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text produced by [`decode_with_fallback`], tagged with the encoding that
/// accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Try each encoding in `chain` and keep the first that decodes without error.
///
/// Acceptance is purely mechanical: a Windows-1252 file that happens to be
/// valid Latin-1 is returned as Latin-1 text. On failure the caller gets back
/// the encodings that were attempted, in order.
pub fn decode_with_fallback(
    bytes: &[u8],
    chain: &[TextEncoding],
) -> Result<Decoded, Vec<TextEncoding>> {
    for &encoding in chain {
        if let Some(text) = encoding.decode(bytes) {
            return Ok(Decoded { text, encoding });
        }
        tracing::debug!(encoding = %encoding, "decode attempt failed");
    }
    Err(chain.to_vec())
}

/// Render an attempt list for error messages: `utf-8, cp1252`.
pub fn format_attempts(attempted: &[TextEncoding]) -> String {
    if attempted.is_empty() {
        return "no encodings configured".to_string();
    }
    attempted.iter().map(|e| e.label()).collect::<Vec<_>>().join(", ")
}
