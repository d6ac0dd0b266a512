//! Single-byte text encodings used on the wire.
//!
//! Every character maps to exactly one byte, so a read of N bytes always
//! decodes to N characters or fails as a whole.

use crate::port::PortError;
use serde::{Deserialize, Serialize};

/// Text encoding applied to outbound strings and inbound bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// 7-bit US-ASCII. Bytes at or above 0x80 do not decode.
    #[default]
    Ascii,
    /// ISO-8859-1. Every byte decodes; characters above U+00FF do not encode.
    Latin1,
}

impl TextEncoding {
    pub fn encode(self, text: &str) -> Result<Vec<u8>, PortError> {
        match self {
            Self::Ascii if text.is_ascii() => Ok(text.as_bytes().to_vec()),
            Self::Ascii => Err(PortError::InvalidBuffer),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| PortError::InvalidBuffer))
                .collect(),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, PortError> {
        match self {
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
                Some(at) => Err(PortError::DecodeFailed(format!(
                    "byte 0x{:02x} at offset {} is not ASCII",
                    bytes[at], at
                ))),
            },
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(format!("unknown text encoding '{other}'")),
        }
    }
}
