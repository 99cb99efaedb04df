//! Shared test helpers: a full application instance over a private
//! temporary database, plus request plumbing.

use axum::Router;
use axum::body::Body;
use chrono::Utc;
use http::header::{ACCEPT, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use mailroom_api::{AppState, build_router};
use mailroom_auth::password::PasswordHasher;
use mailroom_core::config::{AppConfig, AppEnv};
use mailroom_entity::user::{Role, User};

/// Test application context.
pub struct TestApp {
    /// The router for making in-process requests.
    pub router: Router,
    /// The wired application state, for direct seeding and assertions.
    pub state: AppState,
    _dir: tempfile::TempDir,
}

/// The cookie pair an authenticated browser carries.
#[derive(Debug, Clone)]
pub struct AuthCookies {
    pub session: String,
    pub csrf: String,
}

impl AuthCookies {
    /// The `Cookie` request header value.
    pub fn header(&self) -> String {
        format!("session_token={}; csrf_token={}", self.session, self.csrf)
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The value of a cookie set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        for value in self.headers.get_all(SET_COOKIE) {
            let raw = value.to_str().ok()?;
            if let Ok(cookie) = cookie::Cookie::parse(raw.to_owned()) {
                if cookie.name() == name {
                    return Some(cookie.value().to_string());
                }
            }
        }
        None
    }
}

impl TestApp {
    /// Build an application over a fresh temporary database.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Build an application with a tweaked configuration (e.g. lower rate
    /// limits).
    pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig {
            app_env: AppEnv::Testing,
            database_path: dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            upload_dir: dir.path().join("uploads").to_string_lossy().into_owned(),
            log_file: dir.path().join("test.log").to_string_lossy().into_owned(),
            // Fast hashing keeps the suite quick; production costs are
            // exercised by the defaults.
            argon2_time_cost: 1,
            argon2_memory_cost: 8,
            argon2_parallelism: 1,
            rate_limit_login: 1000,
            rate_limit_api: 10_000,
            ..AppConfig::default()
        };
        tweak(&mut config);
        config.ensure_directories().expect("ensure directories");

        let state = AppState::build(config).expect("build app state");
        let router = build_router(state.clone());
        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Insert a user directly, returning the stored record.
    pub async fn seed_user(&self, username: &str, password: &str, role: Role) -> User {
        self.seed_user_with(username, password, role, |_| {}).await
    }

    /// Insert a user with field overrides (lockout counters, flags).
    pub async fn seed_user_with(
        &self,
        username: &str,
        password: &str,
        role: Role,
        tweak: impl FnOnce(&mut User),
    ) -> User {
        let hasher = PasswordHasher::new(&self.state.config);
        let hash = hasher.hash(password).expect("hash password");
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash.clone(),
            full_name: format!("{username} Test"),
            role,
            is_active: true,
            must_change_password: false,
            password_history: Some(serde_json::to_string(&[hash]).expect("history json")),
            failed_login_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        tweak(&mut user);
        self.state.users.insert(&user).await.expect("insert user");
        user
    }

    /// Fetch the login page to obtain a CSRF cookie.
    pub async fn csrf_token(&self) -> String {
        let response = self.get("/auth/login", None).await;
        assert_eq!(response.status, StatusCode::OK);
        response.cookie("csrf_token").expect("csrf cookie issued")
    }

    /// Log in and return the browser's cookie pair.
    pub async fn login(&self, username: &str, password: &str) -> AuthCookies {
        let response = self.try_login(username, password).await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "login failed: {:?}",
            response.body
        );
        let session = response.cookie("session_token").expect("session cookie");
        let csrf = response
            .cookie("csrf_token")
            .expect("csrf cookie refreshed");
        AuthCookies { session, csrf }
    }

    /// Attempt a login, returning the raw response.
    pub async fn try_login(&self, username: &str, password: &str) -> TestResponse {
        let csrf = self.csrf_token().await;
        let body = form(&[
            ("username", username),
            ("password", password),
            ("csrf_token", &csrf),
        ]);
        self.send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(COOKIE, format!("csrf_token={csrf}"))
                .header(ACCEPT, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    /// GET with optional cookies; asks for JSON.
    pub async fn get(&self, path: &str, cookies: Option<&AuthCookies>) -> TestResponse {
        let mut builder = Request::builder()
            .method("GET")
            .uri(path)
            .header(ACCEPT, "application/json");
        if let Some(cookies) = cookies {
            builder = builder.header(COOKIE, cookies.header());
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    /// POST a form with the session cookies; the CSRF token field is
    /// added automatically.
    pub async fn post_form(
        &self,
        path: &str,
        cookies: &AuthCookies,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        self.send_form("POST", path, cookies, fields).await
    }

    /// PUT a form with the session cookies.
    pub async fn put_form(
        &self,
        path: &str,
        cookies: &AuthCookies,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        self.send_form("PUT", path, cookies, fields).await
    }

    async fn send_form(
        &self,
        method: &str,
        path: &str,
        cookies: &AuthCookies,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let mut all = fields.to_vec();
        all.push(("csrf_token", cookies.csrf.as_str()));
        let body = form(&all);
        self.send(
            Request::builder()
                .method(method)
                .uri(path)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(COOKIE, cookies.header())
                .header(ACCEPT, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    /// POST JSON with the session cookies, echoing the CSRF header.
    pub async fn post_json(
        &self,
        path: &str,
        cookies: &AuthCookies,
        body: Value,
    ) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(CONTENT_TYPE, "application/json")
                .header(COOKIE, cookies.header())
                .header("X-CSRF-Token", cookies.csrf.clone())
                .header(ACCEPT, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    /// Send a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 10 * 1024 * 1024)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Count audit events of a kind, for invariant assertions.
    pub async fn audit_count(&self, kind: &str) -> usize {
        use mailroom_core::types::pagination::PageRequest;
        let page = self
            .state
            .audit_logs
            .search(
                None,
                Some(kind.parse().expect("valid kind")),
                None,
                None,
                PageRequest::new(1, 100),
            )
            .await
            .expect("audit search");
        page.total_items as usize
    }
}

/// Minimal application/x-www-form-urlencoded encoder.
pub fn form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
