//! Opaque pagination cursors.
//!
//! The store's continuation token needs full primary-key context even
//! for secondary-index queries, so a cursor carries the queried index's
//! key attributes *and* the primary key attributes of the last item,
//! tagged with the type discriminator. The wire form is base64url over
//! JSON: safe to hand to a caller and accept back.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use monotable_codec::Item;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    #[serde(rename = "t")]
    type_name: String,
    #[serde(rename = "k")]
    key: Item,
}

/// Encode a continuation key as an opaque cursor string.
pub fn encode(type_name: &str, key: &Item) -> CoreResult<String> {
    let payload = CursorPayload {
        type_name: type_name.to_string(),
        key: key.clone(),
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|err| invalid_cursor(type_name, err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a cursor back into a continuation key.
///
/// Rejects malformed cursors and cursors issued for a different type
/// discriminator.
pub fn decode(type_name: &str, cursor: &str) -> CoreResult<Item> {
    let json = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| invalid_cursor(type_name, "malformed pagination cursor"))?;
    let payload: CursorPayload = serde_json::from_slice(&json)
        .map_err(|_| invalid_cursor(type_name, "malformed pagination cursor"))?;
    if payload.type_name != type_name {
        return Err(invalid_cursor(
            type_name,
            format!("cursor was issued for type {}", payload.type_name),
        ));
    }
    Ok(payload.key)
}

fn invalid_cursor(type_name: &str, message: impl Into<String>) -> CoreError {
    CoreError::input_validation(
        "query",
        type_name,
        monotable_codec::CodecError::violation(type_name, "cursor", message),
    )
}
