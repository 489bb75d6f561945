//! Access token (JWT) parsing.
//!
//! The token is split into its three segments; header and claims are
//! base64url/JSON decoded, the signature is kept as raw bytes together
//! with the exact signed-payload bytes (`header.claims`) so the session
//! layer can RSA-verify against the server key. Signature verification
//! itself is a crypto collaborator concern.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::utils::base64_url_decode;

/// Decoded JWT header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Signing algorithm identifier, e.g. `RS256`.
    pub alg: String,
    /// Token type, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Decoded JWT claims.
///
/// Only the claims this core acts on are typed; unknown claims are
/// ignored rather than rejected, since the server may add claims freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
    /// Subject, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// A parsed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwt {
    raw: String,
    header: JwtHeader,
    claims: JwtClaims,
    signed_payload_len: usize,
    signature: Vec<u8>,
}

impl Jwt {
    /// Parse a JWT string into header, claims, and signature.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedJwt`] when the token does not have three
    /// segments or a segment fails base64url/JSON decoding;
    /// [`ProtocolError::MissingExpiryClaim`] when the claims carry no
    /// `exp`. Either is terminal for the sign-in attempt.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = raw.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s)) if segments.next().is_none() => (h, c, s),
                _ => {
                    return Err(ProtocolError::MalformedJwt {
                        reason: "expected three dot-separated segments".to_string(),
                    })
                }
            };

        let header_bytes = base64_url_decode(header_b64).map_err(|e| ProtocolError::MalformedJwt {
            reason: format!("header segment: {e}"),
        })?;
        let header: JwtHeader =
            serde_json::from_slice(&header_bytes).map_err(|e| ProtocolError::MalformedJwt {
                reason: format!("header JSON: {e}"),
            })?;

        let claims_bytes = base64_url_decode(claims_b64).map_err(|e| ProtocolError::MalformedJwt {
            reason: format!("claims segment: {e}"),
        })?;
        // Probe for exp before typed decode so its absence is reported as
        // the expiry-contract violation it is, not a generic parse error.
        let claims_value: serde_json::Value =
            serde_json::from_slice(&claims_bytes).map_err(|e| ProtocolError::MalformedJwt {
                reason: format!("claims JSON: {e}"),
            })?;
        if claims_value.get("exp").is_none() {
            return Err(ProtocolError::MissingExpiryClaim);
        }
        let claims: JwtClaims =
            serde_json::from_value(claims_value).map_err(|e| ProtocolError::MalformedJwt {
                reason: format!("claims JSON: {e}"),
            })?;

        let signature =
            base64_url_decode(signature_b64).map_err(|e| ProtocolError::MalformedJwt {
                reason: format!("signature segment: {e}"),
            })?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            claims,
            signed_payload_len: header_b64.len() + 1 + claims_b64.len(),
            signature,
        })
    }

    /// The original token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Decoded header.
    #[must_use]
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// Decoded claims.
    #[must_use]
    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    /// The exact bytes the server signed: `header_b64.claims_b64`.
    #[must_use]
    pub fn signed_payload(&self) -> &[u8] {
        &self.raw.as_bytes()[..self.signed_payload_len]
    }

    /// Decoded signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether the expiry claim has elapsed as of `now`.
    ///
    /// Pure function of `(token, now)`; re-evaluated on every use, never
    /// cached as a boolean.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.claims.exp
    }
}
