//! Login request/response and the session user record.

use serde::{Deserialize, Serialize};

/// User type code for administrators.
pub const USER_TYPE_ADMIN: &str = "A";
/// User type code for library clients.
pub const USER_TYPE_CLIENT: &str = "C";

/// Body of `POST api/auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(rename = "senha")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `data` of a successful login envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub token_type: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub email: String,
}

/// The signed-in user as held in the session and persisted under `user_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_type: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub username: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.user_type == USER_TYPE_ADMIN
    }
}
