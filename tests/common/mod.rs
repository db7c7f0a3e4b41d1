#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use snippetbox::{
    app_state::AppState,
    auth::{Credentials, MIN_BCRYPT_COST},
    config::AppConfig,
    models::{MemorySnippetStore, MemoryUserStore, SnippetStore, UserStore},
    server::build_router,
    sessions::{session_layer, SessionLocks},
};
use tower::ServiceExt;
use tower_sessions::{cookie::Cookie, MemoryStore};

static CSRF_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="csrf_token" value="([^"]+)""#).expect("valid regex"));

pub const PASSWORD: &str = "pa$$word-123";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// In-process client that drives the full router and carries cookies between requests.
pub struct TestApp {
    router: Router,
    pub snippets: Arc<MemorySnippetStore>,
    pub users: Arc<MemoryUserStore>,
    pub session_locks: Arc<SessionLocks>,
    cookies: HashMap<String, String>,
}

impl TestApp {
    pub fn new() -> Self {
        let credentials = Arc::new(Credentials::new(MIN_BCRYPT_COST));
        let snippets = Arc::new(MemorySnippetStore::new());
        let users = Arc::new(MemoryUserStore::new(credentials));
        Self::with_stores(snippets.clone(), snippets, users)
    }

    /// Build the app over an arbitrary snippet store, keeping the memory store handle for
    /// seeding when it is the one in use.
    pub fn with_stores(
        handle: Arc<MemorySnippetStore>,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<MemoryUserStore>,
    ) -> Self {
        Self::with_config(handle, snippets, users, test_config())
    }

    pub fn with_config(
        handle: Arc<MemorySnippetStore>,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<MemoryUserStore>,
        config: AppConfig,
    ) -> Self {
        let layer = session_layer(MemoryStore::default(), &config);
        let state = AppState::new(snippets, users.clone() as Arc<dyn UserStore>, config);
        let session_locks = Arc::clone(state.session_locks());

        Self {
            router: build_router(state, layer),
            snippets: handle,
            users,
            session_locks,
            cookies: HashMap::new(),
        }
    }

    pub async fn request(&mut self, mut req: Request<Body>) -> TestResponse {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            req.headers_mut()
                .insert(header::COOKIE, cookie_header.parse().unwrap());
        }

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        for value in headers.get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_owned()).unwrap();
            let expired = cookie
                .max_age()
                .is_some_and(|max_age| max_age.is_zero());
            if expired {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let req = Request::get(path).body(Body::empty()).unwrap();
        self.request(req).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let req = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.request(req).await
    }

    /// Load `page` and return the CSRF token embedded in its forms.
    pub async fn csrf_token(&mut self, page: &str) -> String {
        let response = self.get(page).await;
        extract_csrf_token(&response.body)
    }

    /// Submit `fields` to `path` along with a fresh token scraped from `page`.
    pub async fn submit(
        &mut self,
        page: &str,
        path: &str,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let token = self.csrf_token(page).await;
        let mut with_token = vec![("csrf_token", token.as_str())];
        with_token.extend_from_slice(fields);
        self.post_form(path, &with_token).await
    }

    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> TestResponse {
        self.submit(
            "/user/signup",
            "/user/signup",
            &[("name", name), ("email", email), ("password", password)],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.submit(
            "/user/login",
            "/user/login",
            &[("email", email), ("password", password)],
        )
        .await
    }

    /// Create an account and log into it.
    pub async fn logged_in_as(&mut self, email: &str) {
        let response = self.signup("Alice", email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }

    pub fn has_session_cookie(&self) -> bool {
        self.cookies.contains_key("snippetbox_session")
    }
}

/// Defaults with plain-HTTP cookies so the client can send them back.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.cookie_secure = false;
    config
}

pub fn memory_users() -> Arc<MemoryUserStore> {
    Arc::new(MemoryUserStore::new(Arc::new(Credentials::new(
        MIN_BCRYPT_COST,
    ))))
}

pub fn extract_csrf_token(body: &str) -> String {
    CSRF_RX
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_owned())
        .expect("page embeds a CSRF token")
}
