use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1252};

use crate::error::ExtractError;

/// Decodes OCR output saved by tools that do not agree on an encoding: a BOM
/// wins, then UTF-8, then Windows-1252.
#[must_use]
pub fn decode_text_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("input is not UTF-8; decoding as windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

pub fn read_text_file(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    Ok(decode_text_bytes(&bytes))
}
