use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use biblio_types::{ApiEnvelope, Credentials, LoginResponse};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::error::{ApiError, ApiResult, EnvelopeExt};
use crate::auth::token::mask_token;
use crate::auth::{Authenticator, SessionStore};
use crate::config::Config;
use crate::nav::{LOGIN_PATH, Navigator};

pub const USER_AGENT: &str = concat!("biblio/", env!("CARGO_PKG_VERSION"));
pub const LOGIN_ENDPOINT: &str = "api/auth/login";

/// HTTP client for the catalog service.
///
/// Attaches the session's bearer token to every request and treats any 401
/// as the end of the session.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let base_url = config.effective_api_url()?;
        Self::with_base_url(&base_url, config.timeout(), session, navigator)
    }

    /// Builds a client for an explicit base URL.
    ///
    /// # Errors
    /// Returns an error if `base_url` is invalid or the HTTP client cannot
    /// be built.
    pub fn with_base_url(
        base_url: &str,
        timeout: Option<Duration>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API URL: {base_url}"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            session,
            navigator,
        })
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::parse(format!("Invalid request path {path}: {e}")))
    }

    /// `GET path`, decoding the body as `T`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures, non-success statuses
    /// and bodies that do not decode as `T`. The same holds for
    /// [`post`](Self::post) and [`put`](Self::put).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path)?;
        let body = self.send(self.http.get(url)).await?.1;
        decode_body(&body)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let body = self.send(self.http.post(url).json(body)).await?.1;
        decode_body(&body)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let body = self.send(self.http.put(url).json(body)).await?.1;
        decode_body(&body)
    }

    /// Deletes a resource.
    ///
    /// 204 is success. Any other success status is too, unless the body is
    /// an envelope reporting `success == false`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures, non-success statuses
    /// and envelopes reporting failure.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path)?;
        let (status, body) = self.send(self.http.delete(url)).await?;
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        match serde_json::from_str::<ApiEnvelope<Value>>(&body) {
            Ok(envelope) if !envelope.success => Err(ApiError::envelope(
                envelope.failure_message().unwrap_or("Delete failed"),
            )),
            _ => Ok(()),
        }
    }

    /// Runs one request through both interception points.
    async fn send(&self, mut request: RequestBuilder) -> ApiResult<(StatusCode, String)> {
        if let Some(token) = self.session.bearer_token() {
            tracing::debug!(token = %mask_token(&token), "attaching bearer token");
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request failed before a response arrived");
            ApiError::transport(&e)
        })?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await.map_err(|e| ApiError::transport(&e))?;

        if status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "request succeeded");
            return Ok((status, body));
        }

        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::warn!(%url, status = status.as_u16(), error = %err, "request failed");
        if err.is_unauthorized() {
            self.handle_unauthorized();
        }
        Err(err)
    }

    /// Any 401 ends the session and sends the user to login, unless they are
    /// already there. The first redirect moves the navigator to login, so a
    /// burst of 401s redirects once.
    fn handle_unauthorized(&self) {
        self.session.expire();
        if self.navigator.current_path() != LOGIN_PATH {
            self.navigator.navigate(LOGIN_PATH);
        }
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!(error = %e, "unexpected response body");
        ApiError::parse(format!("Unexpected response from server: {e}"))
    })
}

impl Authenticator for ApiClient {
    async fn authenticate(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        tracing::debug!(username = %credentials.username, "authenticating");
        let envelope: ApiEnvelope<LoginResponse> = self.post(LOGIN_ENDPOINT, credentials).await?;
        envelope.into_data("Login failed")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiErrorKind;
    use crate::auth::MemorySessionStorage;
    use crate::auth::storage::{KEY_AUTH_TOKEN, KEY_USER_DATA};
    use crate::auth::SessionStorage;
    use crate::auth::token::testing::token_for;
    use crate::nav::testing::RecordingNavigator;

    fn signed_in_store(token: &str) -> Arc<SessionStore> {
        let storage = Arc::new(MemorySessionStorage::new());
        storage
            .set_many(vec![
                (KEY_AUTH_TOKEN, json!(token)),
                (KEY_USER_DATA, json!({"userType": "A", "username": "ana"})),
            ])
            .unwrap();
        let store = Arc::new(SessionStore::new(storage));
        store.rehydrate();
        assert!(store.is_authenticated());
        store
    }

    fn client(
        server: &MockServer,
        store: Arc<SessionStore>,
        nav: Arc<RecordingNavigator>,
    ) -> ApiClient {
        let base = format!("{}/biblioteca", server.uri());
        ApiClient::with_base_url(&base, None, store, nav).unwrap()
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_signed_in() {
        let server = MockServer::start().await;
        let token = token_for("ana", "A", 600);
        Mock::given(method("GET"))
            .and(path("/biblioteca/api/v1/autores/1"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, signed_in_store(&token), Arc::new(RecordingNavigator::at("/")));
        let envelope: ApiEnvelope<i32> = api.get("/api/v1/autores/1").await.unwrap();
        assert_eq!(envelope.data, Some(1));
    }

    #[tokio::test]
    async fn test_sends_no_authorization_when_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "ok"})))
            .mount(&server)
            .await;

        let api = client(
            &server,
            Arc::new(SessionStore::in_memory()),
            Arc::new(RecordingNavigator::at("/")),
        );
        let envelope: ApiEnvelope<String> = api.get("api/ping").await.unwrap();
        assert_eq!(envelope.data.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_concurrent_401s_log_out_and_redirect_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token inválido"})))
            .expect(3)
            .mount(&server)
            .await;

        let store = signed_in_store(&token_for("ana", "A", 600));
        let nav = Arc::new(RecordingNavigator::at("/livros"));
        let api = client(&server, store.clone(), nav.clone());

        let (a, b, c) = tokio::join!(
            api.get::<Value>("api/v1/livros/1"),
            api.get::<Value>("api/v1/autores/2"),
            api.get::<Value>("api/v1/generos/3"),
        );

        for result in [a, b, c] {
            let err = result.unwrap_err();
            assert_eq!(err.kind, ApiErrorKind::Unauthorized);
            assert_eq!(err.message, "Token inválido");
        }
        assert_eq!(nav.visits(), vec!["/login".to_string()]);
        assert!(!store.is_authenticated());
        assert_eq!(store.bearer_token(), None);
    }

    #[tokio::test]
    async fn test_anonymous_401_still_redirects_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::in_memory());
        let nav = Arc::new(RecordingNavigator::at("/livros"));
        let api = client(&server, store.clone(), nav.clone());

        let err = api.get::<Value>("api/v1/livros/1").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(nav.visits(), vec!["/login".to_string()]);

        api.get::<Value>("api/v1/livros/2").await.unwrap_err();
        assert_eq!(nav.visits(), vec!["/login".to_string()]);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_401_after_separate_logout_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = signed_in_store(&token_for("ana", "A", 600));
        let nav = Arc::new(RecordingNavigator::at("/autores"));
        let api = client(&server, store.clone(), nav.clone());

        store.logout();
        api.get::<Value>("api/v1/autores/1").await.unwrap_err();
        assert_eq!(nav.visits(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_401_on_login_screen_does_not_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = signed_in_store(&token_for("ana", "A", 600));
        let nav = Arc::new(RecordingNavigator::at("/login"));
        let api = client(&server, store.clone(), nav.clone());

        let err = api.get::<Value>("api/v1/livros/1").await.unwrap_err();
        assert_eq!(err.message, "Request failed with status code 401");
        assert!(nav.visits().is_empty());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_error_bodies_are_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "M", "error": "E"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Falha interna"))
            .mount(&server)
            .await;

        let api = client(
            &server,
            Arc::new(SessionStore::in_memory()),
            Arc::new(RecordingNavigator::at("/")),
        );

        let err = api.put::<_, Value>("api/v1/autores/1", &json!({})).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::HttpStatus);
        assert_eq!(err.status, Some(400));
        assert_eq!(err.message, "M");

        let err = api.post::<_, Value>("api/v1/autores", &json!({})).await.unwrap_err();
        assert_eq!(err.message, "Falha interna");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let api = ApiClient::with_base_url(
            "http://127.0.0.1:9/",
            Some(Duration::from_secs(2)),
            Arc::new(SessionStore::in_memory()),
            Arc::new(RecordingNavigator::at("/")),
        )
        .unwrap();

        let err = api.get::<Value>("api/ping").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Transport);
        assert!(!err.message.contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/biblioteca/api/v1/autores/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/biblioteca/api/v1/autores/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": null})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/biblioteca/api/v1/autores/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "Autor possui livros"})),
            )
            .mount(&server)
            .await;

        let api = client(
            &server,
            Arc::new(SessionStore::in_memory()),
            Arc::new(RecordingNavigator::at("/")),
        );

        api.delete("api/v1/autores/1").await.unwrap();
        api.delete("api/v1/autores/2").await.unwrap();
        let err = api.delete("api/v1/autores/3").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Envelope);
        assert_eq!(err.message, "Autor possui livros");
    }

    #[tokio::test]
    async fn test_login_through_store() {
        let server = MockServer::start().await;
        let token = token_for("ana", "A", 600);
        Mock::given(method("POST"))
            .and(path("/biblioteca/api/auth/login"))
            .and(body_json(json!({"username": "ana", "senha": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "ok",
                "data": {
                    "token": token,
                    "tokenType": "Bearer",
                    "expiresIn": 3600,
                    "userType": "A",
                    "email": "ana@example.com"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::in_memory());
        let api = client(&server, store.clone(), Arc::new(RecordingNavigator::at("/login")));

        assert!(store.login(&api, &Credentials::new("ana", "pw")).await);
        assert!(store.is_admin());
        assert_eq!(store.bearer_token(), Some(token));
    }

    #[tokio::test]
    async fn test_rejected_login_reports_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/biblioteca/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "message": "Usuário ou senha inválidos"
            })))
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::in_memory());
        let nav = Arc::new(RecordingNavigator::at("/login"));
        let api = client(&server, store.clone(), nav.clone());

        assert!(!store.login(&api, &Credentials::new("ana", "bad")).await);
        assert_eq!(store.error(), "Usuário ou senha inválidos");
        assert!(nav.visits().is_empty());
    }
}
