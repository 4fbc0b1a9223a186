//! Signed bearer tokens.
//!
//! A token is `base64url(claims).base64url(mac)` where the MAC is
//! HMAC-SHA256 over the encoded claims under the configured secret.
//! Claims carry the user id and an expiry timestamp (30 days by default).

use crate::config;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn issue(user_id: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + config::token_expiry_days() * 86_400,
    };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let mac = sign(payload.as_bytes())?;
    Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(mac)))
}

/// Returns the user id carried by a valid, unexpired token.
pub fn verify(token: &str) -> Option<String> {
    let (payload, signature) = token.split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac = HmacSha256::new_from_slice(config::token_secret().as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    // Constant-time comparison.
    mac.verify_slice(&signature).ok()?;

    let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if claims.exp < chrono::Utc::now().timestamp() {
        return None;
    }
    Some(claims.sub)
}

fn sign(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(config::token_secret().as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to key MAC: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_roundtrip() {
        let token = issue("user-123").unwrap();
        assert_eq!(verify(&token).as_deref(), Some("user-123"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue("user-123").unwrap();
        let (payload, sig) = token.split_once('.').unwrap();
        let forged = Claims {
            sub: "user-456".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert!(verify(&format!("{}.{}", forged_payload, sig)).is_none());
        assert!(verify(&format!("{}.", payload)).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "user-123".to_string(),
            exp: chrono::Utc::now().timestamp() - 1,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let mac = sign(payload.as_bytes()).unwrap();
        let token = format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(mac));
        assert!(verify(&token).is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(verify("").is_none());
        assert!(verify("no-dot-here").is_none());
        assert!(verify("a.b.c").is_none());
        assert!(verify("!!!.???").is_none());
    }
}
