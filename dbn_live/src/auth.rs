//! Challenge-response authentication with the live gateway.
//!
//! The gateway sends a challenge token; the client answers with the hex
//! SHA-256 of `challenge|key` followed by `-` and the key's bucket ID, its
//! last five characters. The key itself never crosses the wire.
use dbn_common::{DbnError, Result};
use sha2::{Digest, Sha256};

/// Required length of an API key.
pub const API_KEY_LENGTH: usize = 32;

/// Length of the bucket ID suffix of an API key.
pub const BUCKET_ID_LENGTH: usize = 5;

/// Checks that `key` has the shape of an API key.
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.len() != API_KEY_LENGTH || !key.is_ascii() {
        return Err(DbnError::Config(format!(
            "API key must be {} ASCII characters, got {}",
            API_KEY_LENGTH,
            key.chars().count()
        )));
    }
    Ok(())
}

/// Bucket ID of a validated key.
pub fn bucket_id(key: &str) -> Result<&str> {
    validate_api_key(key)?;
    Ok(&key[API_KEY_LENGTH - BUCKET_ID_LENGTH..])
}

/// Computes the reply to the gateway challenge `challenge` for `key`.
pub fn cram_reply(challenge: &str, key: &str) -> Result<String> {
    let bucket = bucket_id(key)?;
    let digest = Sha256::digest(format!("{}|{}", challenge, key).as_bytes());
    Ok(format!("{}-{}", hex::encode(digest), bucket))
}
