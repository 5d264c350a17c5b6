//! Windows-1252 conversion for the persisted plugin files.
//!
//! The games write their active-plugins files in the OS-local code page
//! (Windows-1252 everywhere that matters); internally this crate works in
//! UTF-8 only, so every read decodes and every write encodes at the file
//! boundary.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

use crate::error::{Error, Result};

/// Decodes Windows-1252 bytes to UTF-8.
///
/// Every byte has a mapping in Windows-1252, so decoding cannot fail.
pub fn bytes_to_utf8(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}

/// Encodes UTF-8 text as Windows-1252.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the text contains a character with no
/// Windows-1252 representation.
pub fn utf8_to_bytes(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        return Err(Error::Encode(text.to_string()));
    }
    Ok(bytes.into_owned())
}
