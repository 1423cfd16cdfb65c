// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Structural validation of session tokens.
//!
//! The client never holds the signing key, so a token is only checked for
//! shape and expiry: three dot-separated segments, a base64 JSON payload in
//! the middle, and a numeric `exp` (seconds since epoch) still in the future.
//! Every decode failure is reported as an invalid token, never as a panic.

use base64::{
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Not exactly three dot-separated segments.
    Segments,
    /// Payload segment is not valid base64.
    Encoding,
    /// Payload is not a JSON object.
    Payload,
    /// Payload has no numeric `exp`.
    MissingExpiry,
    /// `exp` is not in the future.
    Expired,
}

/// Decoded payload fields the session layer cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Expiry in seconds since epoch (fractional seconds allowed).
    pub exp: f64,
    /// Subject, when present.
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Expiry in milliseconds since epoch.
    pub fn expires_at_millis(&self) -> i64 {
        (self.exp * 1000.0) as i64
    }

    /// Expiry as a UTC timestamp, if representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at_millis())
    }
}

/// Decode the payload of a token without checking expiry.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenRejection> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenRejection::Segments);
    }

    let bytes = decode_segment(segments[1]).ok_or(TokenRejection::Encoding)?;
    let payload: Value = serde_json::from_slice(&bytes).map_err(|_| TokenRejection::Payload)?;
    let object = payload.as_object().ok_or(TokenRejection::Payload)?;

    let exp = object
        .get("exp")
        .and_then(Value::as_f64)
        .ok_or(TokenRejection::MissingExpiry)?;

    let sub = object.get("sub").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(TokenClaims { exp, sub })
}

/// Validate a token against the given clock.
pub fn validate_at(token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenRejection> {
    let claims = decode_claims(token)?;
    if claims.exp * 1000.0 > now.timestamp_millis() as f64 {
        Ok(claims)
    } else {
        Err(TokenRejection::Expired)
    }
}

/// Validate a token against the current time.
pub fn validate(token: &str) -> Result<TokenClaims, TokenRejection> {
    validate_at(token, Utc::now())
}

/// Whether a token is well-formed and unexpired right now.
pub fn is_token_valid(token: &str) -> bool {
    validate(token).is_ok()
}

/// Payloads are issued URL-safe, but some issuers use the standard alphabet.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    if trimmed.is_empty() {
        return None;
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}
