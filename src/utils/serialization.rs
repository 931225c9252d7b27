// src/utils/serialization.rs
//! Serialization utilities for the signed-token wire format.
//!
//! Provides:
//! - base64url (unpadded) encoding used by JWK members and JWS segments
//! - JSON serialization of token segments

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Encodes bytes as unpadded base64url.
pub fn base64url_encode(data: impl AsRef<[u8]>) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes unpadded base64url, tolerating trailing padding.
///
/// # Errors
/// `UnableToDecode` if the input is not base64url.
pub fn base64url_decode(data: &str) -> Result<Vec<u8>> {
    base64::decode_config(data.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .map_err(|e| Error::UnableToDecode(format!("invalid base64url: {e}")))
}

/// Serializes a value to JSON and encodes it as a token segment.
///
/// # Errors
/// `UnableToDecode` if the value cannot be represented as JSON.
pub fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| Error::UnableToDecode(format!("unserializable segment: {e}")))?;
    Ok(base64url_encode(json))
}

/// Decodes a token segment into a value.
///
/// # Errors
/// `UnableToDecode` if the segment is not base64url-encoded JSON of type `T`.
pub fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = base64url_decode(segment)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::UnableToDecode(e.to_string()))
}
