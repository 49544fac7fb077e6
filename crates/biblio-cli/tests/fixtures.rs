//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::ResponseTemplate;

/// Creates a temp BIBLIO_HOME directory for test isolation.
pub fn temp_home() -> TempDir {
    TempDir::new().expect("create temp biblio home")
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Unsigned token for `sub` of type `user_type`, expiring in `ttl` seconds.
pub fn token_for(sub: &str, user_type: &str, ttl: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "userType": user_type,
        "roles": [format!("ROLE_{user_type}")],
        "iat": now(),
        "exp": now() + ttl,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Successful login envelope for `token`.
pub fn login_ok(token: &str, user_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "message": "Login realizado com sucesso",
        "data": {
            "token": token,
            "tokenType": "Bearer",
            "expiresIn": 3600,
            "userType": user_type,
            "email": "ana@example.com"
        }
    }))
}

pub fn envelope_ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "", "data": data}))
}

/// Writes a persisted session as if a previous `biblio login` had run.
pub fn seed_session(home: &Path, token: &str, user_type: &str) {
    let record = json!({
        "auth_token": token,
        "user_data": {
            "email": "ana@example.com",
            "userType": user_type,
            "roles": [user_type],
            "username": "ana"
        },
        "user_roles": [user_type],
        "token_expires_in": 3600,
        "token_type": "Bearer"
    });
    std::fs::write(home.join("session.json"), record.to_string()).unwrap();
}
