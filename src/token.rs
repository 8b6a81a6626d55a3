// token.rs — Signed confirmation tokens.
//
// The prepare step resolves a destination and hands the caller a token
// binding (template, destination, params); the create step accepts the
// token instead of re-resolving, so the notebook is written to the
// destination the caller confirmed. Format:
//
//   base64url(payload_json) "." base64url(hmac_sha256(secret, payload_b64))
//
// Verification recomputes the MAC in constant time and enforces a maximum
// token age.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::host::Destination;

type HmacSha256 = Hmac<Sha256>;

/// What a confirmation token binds together.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationToken {
    /// Template the token was minted for; creation rejects a mismatch.
    pub template: String,
    pub destination: Destination,
    pub params: Map<String, Value>,
    /// Unix seconds at minting time.
    pub issued_at: u64,
}

/// Mint a token for the given template, destination and parameters.
pub fn mint(
    template: &str,
    destination: &Destination,
    params: &Map<String, Value>,
    secret: &[u8],
) -> Result<String> {
    mint_at(template, destination, params, secret, unix_now())
}

fn mint_at(
    template: &str,
    destination: &Destination,
    params: &Map<String, Value>,
    secret: &[u8],
    issued_at: u64,
) -> Result<String> {
    let payload = ConfirmationToken {
        template: template.to_string(),
        destination: destination.clone(),
        params: params.clone(),
        issued_at,
    };
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).context("encoding token payload")?);

    let mut mac = HmacSha256::new_from_slice(secret).context("initializing token mac")?;
    mac.update(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{payload_b64}.{sig_b64}"))
}

/// Verify a token's signature and age, returning its payload.
pub fn verify(raw: &str, secret: &[u8], max_age: Duration) -> Result<ConfirmationToken> {
    let (payload_b64, sig_b64) = raw
        .split_once('.')
        .ok_or_else(|| anyhow!("malformed confirmation token"))?;

    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| anyhow!("invalid token signature encoding"))?;
    let mut mac = HmacSha256::new_from_slice(secret).context("initializing token mac")?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&sig)
        .map_err(|_| anyhow!("token signature invalid"))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| anyhow!("invalid token payload encoding"))?;
    let token: ConfirmationToken =
        serde_json::from_slice(&payload).context("decoding token payload")?;

    let age = unix_now().saturating_sub(token.issued_at);
    if age > max_age.as_secs() {
        return Err(anyhow!("confirmation token expired"));
    }

    Ok(token)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
