#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use flasky::{
    config::AppConfig,
    test_utils::test_helpers::{self, RecordingEmailService},
    AppState,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tower::ServiceExt;

static CSRF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="csrf_token" value="([^"]+)""#).unwrap());

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn assert_redirect(&self, to: &str) {
        assert!(
            self.status.is_redirection(),
            "expected redirect to {to}, got {} with body {}",
            self.status,
            self.body
        );
        assert_eq!(self.location(), Some(to));
    }
}

/// A browser-like client over the router that keeps the session cookie.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mail: Arc<RecordingEmailService>,
    cookie: Option<String>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_testing()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let pool = test_helpers::create_test_db().await.unwrap();
        test_helpers::seed_roles(&pool).await.unwrap();
        let (state, mail) = test_helpers::test_app_state(pool, config);
        let app = test_helpers::build_test_app(state.clone());
        TestApp {
            app,
            state,
            mail,
            cookie: None,
        }
    }

    /// Same server, fresh browser.
    pub fn new_client(&self) -> Self {
        TestApp {
            app: self.app.clone(),
            state: self.state.clone(),
            mail: self.mail.clone(),
            cookie: None,
        }
    }

    pub async fn insert_user(&self, email: &str, username: &str, password: &str, confirmed: bool) -> i64 {
        test_helpers::insert_test_user(&self.state.pool, email, username, password, confirmed)
            .await
            .unwrap()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::builder().uri(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(body)).await
    }

    /// Loads `page` and submits its form with the embedded CSRF token.
    pub async fn submit(&mut self, page: &str, action: &str, fields: &[(&str, &str)]) -> TestResponse {
        let form_page = self.get(page).await;
        assert_eq!(form_page.status, StatusCode::OK, "GET {page}");
        let token = CSRF_RE
            .captures(&form_page.body)
            .map(|c| c[1].to_string())
            .expect("page has a csrf field");

        let mut fields = fields.to_vec();
        fields.push(("csrf_token", &token));
        self.post_form(action, &fields).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.submit(
            "/login",
            "/login",
            &[("email", email), ("password", password)],
        )
        .await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            self.cookie = if set_cookie.contains("Max-Age=0") {
                None
            } else {
                Some(pair)
            };
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// Pulls the token from the first `prefix<token>` link in `body`.
pub fn token_from(body: &str, prefix: &str) -> String {
    let start = body.find(prefix).expect("link present") + prefix.len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}
