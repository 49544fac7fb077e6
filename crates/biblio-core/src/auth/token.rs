//! JWT payload decoding.
//!
//! Tokens are decoded, never verified: the signature is the server's
//! business. Claims read here only drive client-side gating (which screens
//! and commands are offered). Every real authorization decision happens on
//! the server, which rejects a bad token with 401.
//!
//! All helpers except [`decode`] fail closed: a token that does not decode
//! is invalid, has no roles and no user.

use std::collections::BTreeSet;
use std::fmt;

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Prefix some issuers put on every authority.
const ROLE_PREFIX: &str = "ROLE_";

/// base64url that accepts both padded and unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried in the token payload.
///
/// Claims of an unexpected JSON type read as absent, and non-string role
/// entries are skipped, so a well-formed token never fails on claim shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub roles: Option<Vec<String>>,
    pub authorities: Option<Vec<String>>,
    /// Expiry, seconds since the epoch. NumericDate allows fractions.
    pub exp: Option<f64>,
    /// Issued-at, seconds since the epoch.
    pub iat: Option<f64>,
}

impl DecodedClaims {
    fn from_payload(payload: &Value) -> Self {
        let string = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_owned);
        let strings = |key: &str| {
            payload.get(key).and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
        };
        let number = |key: &str| payload.get(key).and_then(Value::as_f64);

        Self {
            sub: string("sub"),
            email: string("email"),
            user_type: string("userType"),
            roles: strings("roles"),
            authorities: strings("authorities"),
            exp: number("exp"),
            iat: number("iat"),
        }
    }

    /// Whether the token expires strictly after `now` (epoch seconds).
    #[allow(clippy::cast_precision_loss)]
    pub fn expires_after(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp > now as f64)
    }
}

/// User information recovered from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUser {
    pub sub: String,
    pub email: String,
    pub user_type: Option<String>,
    pub roles: BTreeSet<String>,
}

/// Why a token could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not exactly three dot-separated segments.
    Segments(usize),
    /// The payload segment is not base64url.
    Base64,
    /// The payload is not JSON.
    Json(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Segments(n) => write!(f, "expected 3 token segments, found {n}"),
            DecodeError::Base64 => write!(f, "token payload is not base64url"),
            DecodeError::Json(e) => write!(f, "token payload is not JSON: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decodes the payload (middle segment) of `token`.
///
/// # Errors
/// Returns a [`DecodeError`] for a malformed structure or a non-JSON payload.
pub fn decode(token: &str) -> Result<DecodedClaims, DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::Segments(parts.len()));
    }
    let payload = URL_SAFE_LENIENT
        .decode(parts[1])
        .map_err(|_| DecodeError::Base64)?;
    let payload: Value =
        serde_json::from_slice(&payload).map_err(|e| DecodeError::Json(e.to_string()))?;
    Ok(DecodedClaims::from_payload(&payload))
}

/// Returns true if `token` decodes and expires after `now` (epoch seconds).
pub fn is_valid_at(token: &str, now: i64) -> bool {
    match decode(token) {
        Ok(claims) => claims.expires_after(now),
        Err(e) => {
            tracing::debug!(error = %e, "token rejected");
            false
        }
    }
}

/// Returns true if `token` decodes and has not yet expired.
pub fn is_valid(token: &str) -> bool {
    is_valid_at(token, Utc::now().timestamp())
}

/// The token's expiry instant, if it decodes and carries one.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode(token).ok()?.exp?;
    DateTime::from_timestamp_millis((exp * 1000.0).round() as i64)
}

/// Extracts the roles granted by `token`.
///
/// Issuers disagree on where roles live, so the lookup is an ordered chain:
/// a non-empty `roles` claim, else a non-empty `authorities` claim, else the
/// single `userType`, else nothing. A leading `ROLE_` is stripped from each.
pub fn extract_roles(token: &str) -> BTreeSet<String> {
    decode(token)
        .map(|claims| roles_from_claims(&claims))
        .unwrap_or_default()
}

/// Applies the role lookup chain to already-decoded claims.
pub fn roles_from_claims(claims: &DecodedClaims) -> BTreeSet<String> {
    let non_empty = |list: &Option<Vec<String>>| list.as_ref().filter(|l| !l.is_empty()).cloned();

    let raw = non_empty(&claims.roles)
        .or_else(|| non_empty(&claims.authorities))
        .or_else(|| {
            claims
                .user_type
                .as_ref()
                .filter(|t| !t.is_empty())
                .map(|t| vec![t.clone()])
        })
        .unwrap_or_default();

    raw.iter()
        .map(|role| role.strip_prefix(ROLE_PREFIX).unwrap_or(role).to_string())
        .collect()
}

/// Extracts the user described by `token`, or `None` if it does not decode.
pub fn extract_user(token: &str) -> Option<TokenUser> {
    let claims = decode(token).ok()?;
    let roles = roles_from_claims(&claims);
    Some(TokenUser {
        sub: claims.sub.unwrap_or_default(),
        email: claims.email.unwrap_or_default(),
        user_type: claims.user_type,
        roles,
    })
}

/// Shortens a token for display: first 8 characters then an ellipsis.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Token builders shared by the crate's tests.

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    /// Builds an unsigned token around `claims`.
    pub fn token_with(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    /// A token for `sub` of type `user_type`, expiring `ttl` seconds from now.
    pub fn token_for(sub: &str, user_type: &str, ttl: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        token_with(&serde_json::json!({
            "sub": sub,
            "email": format!("{sub}@example.com"),
            "userType": user_type,
            "roles": [format!("ROLE_{user_type}")],
            "iat": now,
            "exp": now + ttl,
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::token_with;
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_decode_reads_claims() {
        let token = token_with(&json!({
            "sub": "ana",
            "email": "ana@example.com",
            "userType": "A",
            "exp": 2_000_000_000_i64,
            "iat": 1_000_000_000_i64
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("ana"));
        assert_eq!(claims.user_type.as_deref(), Some("A"));
        assert_eq!(claims.exp, Some(2_000_000_000.0));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        use base64::engine::general_purpose::URL_SAFE as PADDED;
        let payload = PADDED.encode(json!({"sub": "a", "exp": 1}).to_string());
        let token = format!("h.{payload}.s");
        assert_eq!(decode(&token).unwrap().sub.as_deref(), Some("a"));
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert_eq!(decode("only.two"), Err(DecodeError::Segments(2)));
        assert_eq!(decode("a.b.c.d"), Err(DecodeError::Segments(4)));
        assert_eq!(decode(""), Err(DecodeError::Segments(1)));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let payload = URL_SAFE_LENIENT.encode("not json");
        let token = format!("h.{payload}.s");
        assert!(matches!(decode(&token), Err(DecodeError::Json(_))));
        assert_eq!(decode("h.%%%.s"), Err(DecodeError::Base64));
    }

    #[test]
    fn test_fractional_exp_is_accepted() {
        let token = token_with(&json!({"sub": "ana", "exp": 1_900_000_000.5}));
        assert_eq!(decode(&token).unwrap().exp, Some(1_900_000_000.5));
        assert!(is_valid_at(&token, 1_900_000_000));
        assert!(!is_valid_at(&token, 1_900_000_001));
        assert_eq!(
            expires_at(&token).map(|t| t.timestamp_millis()),
            Some(1_900_000_000_500)
        );
    }

    #[test]
    fn test_null_email_does_not_invalidate_token() {
        let token = token_with(&json!({
            "email": null,
            "authorities": ["ROLE_A"],
            "exp": 1_900_000_000_i64
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.email, None);
        assert!(is_valid_at(&token, 1_800_000_000));
        assert_eq!(extract_roles(&token), set(&["A"]));
        assert_eq!(extract_user(&token).unwrap().email, "");
    }

    #[test]
    fn test_numeric_sub_reads_as_absent() {
        let token = token_with(&json!({"sub": 42, "userType": "C", "exp": 1_900_000_000_i64}));
        assert_eq!(decode(&token).unwrap().sub, None);
        assert!(is_valid_at(&token, 1_800_000_000));
        assert_eq!(extract_user(&token).unwrap().sub, "");
    }

    #[test]
    fn test_non_string_role_entries_are_skipped() {
        let token = token_with(&json!({"roles": ["ROLE_A", 7, null, {"x": 1}, "B"]}));
        assert_eq!(extract_roles(&token), set(&["A", "B"]));

        let token = token_with(&json!({"roles": [1, 2], "authorities": ["X"]}));
        assert_eq!(extract_roles(&token), set(&["X"]));
    }

    #[test]
    fn test_non_object_payload_has_no_claims() {
        let payload = URL_SAFE_LENIENT.encode("[1,2]");
        let token = format!("h.{payload}.s");
        assert_eq!(decode(&token), Ok(DecodedClaims::default()));
        assert!(!is_valid_at(&token, 0));
    }

    #[test]
    fn test_malformed_tokens_have_no_user() {
        assert!(extract_user("garbage").is_none());
        assert!(extract_user("a.b").is_none());
        let payload = URL_SAFE_LENIENT.encode("[1,2");
        assert!(extract_user(&format!("h.{payload}.s")).is_none());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let now = 1_700_000_000;
        for exp in [now - 3600, now - 1, now] {
            let token = token_with(&json!({"sub": "ana", "exp": exp}));
            assert!(!is_valid_at(&token, now), "exp {exp} should be invalid");
        }
        let token = token_with(&json!({"sub": "ana", "exp": now + 1}));
        assert!(is_valid_at(&token, now));
    }

    #[test]
    fn test_token_without_exp_is_invalid() {
        let token = token_with(&json!({"sub": "ana"}));
        assert!(!is_valid_at(&token, 0));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        assert!(!is_valid("not-a-token"));
        assert!(!is_valid_at("x.y.z", 0));
    }

    #[test]
    fn test_roles_claim_wins_and_prefix_is_stripped() {
        let token = token_with(&json!({
            "roles": ["ROLE_A", "B"],
            "authorities": ["X"],
            "userType": "C"
        }));
        assert_eq!(extract_roles(&token), set(&["A", "B"]));
    }

    #[test]
    fn test_authorities_used_when_roles_absent() {
        let token = token_with(&json!({"authorities": ["X"]}));
        assert_eq!(extract_roles(&token), set(&["X"]));
    }

    #[test]
    fn test_authorities_used_when_roles_empty() {
        let token = token_with(&json!({"roles": [], "authorities": ["ROLE_F"]}));
        assert_eq!(extract_roles(&token), set(&["F"]));
    }

    #[test]
    fn test_user_type_is_last_fallback() {
        let token = token_with(&json!({"userType": "A"}));
        assert_eq!(extract_roles(&token), set(&["A"]));
    }

    #[test]
    fn test_no_role_claims_yield_empty_set() {
        let token = token_with(&json!({"sub": "ana"}));
        assert!(extract_roles(&token).is_empty());
        assert!(extract_roles("broken").is_empty());
    }

    #[test]
    fn test_prefix_strip_is_case_sensitive_and_prefix_only() {
        let token = token_with(&json!({"roles": ["role_A", "MY_ROLE_B", "ROLE_ROLE_C"]}));
        assert_eq!(extract_roles(&token), set(&["role_A", "MY_ROLE_B", "ROLE_C"]));
    }

    #[test]
    fn test_extract_user_carries_roles() {
        let token = token_with(&json!({
            "sub": "ana",
            "email": "ana@example.com",
            "userType": "A",
            "authorities": ["ROLE_ADMIN"]
        }));
        let user = extract_user(&token).unwrap();
        assert_eq!(user.sub, "ana");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.roles, set(&["ADMIN"]));
    }

    #[test]
    fn test_expires_at() {
        let token = token_with(&json!({"exp": 1_700_000_000_i64}));
        assert_eq!(expires_at(&token).map(|t| t.timestamp()), Some(1_700_000_000));
        assert!(expires_at("bad").is_none());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abc"), "***");
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.x.y"), "eyJhbGci...");
    }
}
