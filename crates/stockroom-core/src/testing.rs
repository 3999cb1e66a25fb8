use std::net::SocketAddr;

use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;

use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::seed::SeedReport;

/// A test application for integration testing.
///
/// Spins up the full router on an ephemeral port over an in-memory SQLite
/// database.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn admin_can_list_roles() {
///     let app = TestApp::new().await;
///     let token = app.login_admin().await;
///     let res = app.client.get_with_auth(&app.url("/api/roles"), &token).await;
///     assert_eq!(res.status, 200);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub db: DatabaseConnection,
    pub config: Config,
    pub codec: TokenCodec,
    pub seed: Option<SeedReport>,
}

impl TestApp {
    /// Create a test app with the canonical catalog and default admin seeded.
    pub async fn new() -> Self {
        let config = Config {
            seed_on_start: true,
            ..Config::for_tests()
        };
        Self::with_config(config).await
    }

    /// Create a test app over an empty (migrated, unseeded) database.
    pub async fn empty() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    /// Create a test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        crate::logging::try_init_logging("warn");

        let seed_on_start = config.seed_on_start;
        let app = crate::App::new(Config {
            seed_on_start: false,
            ..config
        })
        .await
        .expect("Failed to create test app");

        let seed = if seed_on_start {
            Some(app.seed().await.expect("Failed to seed test app"))
        } else {
            None
        };

        let router = app.router();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            codec: TokenCodec::new(&app.config.jwt_secret),
            db: app.db,
            config: app.config,
            seed,
        }
    }

    /// Get the full URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Log in over HTTP and return the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });

        let res = self
            .client
            .post(&self.url("/api/auth/login"), &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.body);
        res.json()["token"]
            .as_str()
            .expect("login response has no token")
            .to_string()
    }

    /// Log in as the seeded administrator.
    pub async fn login_admin(&self) -> String {
        let admin = self.config.admin.clone();
        self.login(&admin.email, &admin.password).await
    }

    /// Mint a token directly, bypassing the store.
    pub fn token_for(&self, subject: &str, roles: &[&str], permissions: Option<&[&str]>) -> String {
        self.codec
            .issue(
                subject,
                roles.iter().map(|r| r.to_string()).collect(),
                permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
            )
            .expect("Failed to mint test token")
    }
}

/// A simple HTTP test client with helper methods.
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
}

impl TestClient {
    /// Create a new test client pointing at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> TestResponse {
        let res = request.send().await.expect("request failed");
        TestResponse::from_response(res).await
    }

    fn json_body(request: reqwest::RequestBuilder, body: &str) -> reqwest::RequestBuilder {
        request
            .header("Content-Type", "application/json")
            .body(body.to_string())
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str) -> TestResponse {
        self.send(self.inner.get(url)).await
    }

    /// Send a GET request with an auth token.
    pub async fn get_with_auth(&self, url: &str, token: &str) -> TestResponse {
        self.send(self.inner.get(url).bearer_auth(token)).await
    }

    /// Send a GET request with a raw `Authorization` header value.
    pub async fn get_with_header(&self, url: &str, authorization: &str) -> TestResponse {
        self.send(self.inner.get(url).header("Authorization", authorization))
            .await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.post(url), body)).await
    }

    /// Send a POST request with auth token and JSON body.
    pub async fn post_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.post(url).bearer_auth(token), body))
            .await
    }

    /// Send a PUT request with auth token and JSON body.
    pub async fn put_with_auth(&self, url: &str, token: &str, body: &str) -> TestResponse {
        self.send(Self::json_body(self.inner.put(url).bearer_auth(token), body))
            .await
    }

    /// Send a DELETE request with auth token.
    pub async fn delete_with_auth(&self, url: &str, token: &str) -> TestResponse {
        self.send(self.inner.delete(url).bearer_auth(token)).await
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let mut headers = HeaderMap::new();
        for (name, value) in res.headers() {
            if let (Ok(name), Ok(value)) = (
                axum::http::HeaderName::from_bytes(name.as_str().as_bytes()),
                axum::http::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.json()["success"].as_bool().unwrap_or(false)
    }

    /// The `message` field, if any.
    pub fn message(&self) -> Option<String> {
        self.json()["message"].as_str().map(str::to_string)
    }
}
