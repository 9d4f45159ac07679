//! On-disk token record format.
//!
//! One JSON object per file:
//! `{"access_id": "...", "token": "...", "expiry": <epoch seconds>, ...}`.
//! `auth_creds`, `uam_creds` and `kfm_creds` are optional and carried through
//! untouched. Unknown fields are ignored.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::cache::token::Token;
use crate::errors::RecordError;

#[derive(Debug, Deserialize, Serialize)]
struct RawTokenRecord {
    access_id: String,
    token: String,
    expiry: i64,
    #[serde(default)]
    auth_creds: String,
    #[serde(default)]
    uam_creds: String,
    #[serde(default)]
    kfm_creds: String,
}

/// Decode a token record. Required fields must be present and non-empty.
pub fn decode(bytes: &[u8]) -> Result<Token, RecordError> {
    let raw: RawTokenRecord = serde_json::from_slice(bytes)?;

    if raw.access_id.is_empty() {
        return Err(RecordError::EmptyField("access_id"));
    }
    if raw.token.is_empty() {
        return Err(RecordError::EmptyField("token"));
    }
    let expiry = DateTime::from_timestamp(raw.expiry, 0)
        .ok_or(RecordError::ExpiryOutOfRange(raw.expiry))?;

    Ok(Token {
        access_id: raw.access_id,
        token: raw.token,
        expiry,
        auth_creds: raw.auth_creds,
        uam_creds: raw.uam_creds,
        kfm_creds: raw.kfm_creds,
    })
}

/// Encode a token record. Sub-second precision of the expiry is dropped.
pub fn encode(token: &Token) -> Result<Vec<u8>, RecordError> {
    let raw = RawTokenRecord {
        access_id: token.access_id.clone(),
        token: token.token.clone(),
        expiry: token.expiry.timestamp(),
        auth_creds: token.auth_creds.clone(),
        uam_creds: token.uam_creds.clone(),
        kfm_creds: token.kfm_creds.clone(),
    };
    Ok(serde_json::to_vec(&raw)?)
}
