// Shared harness for the router-level tests.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header::{AUTHORIZATION, CONTENT_TYPE}, Method, Request, StatusCode},
    Router,
};
use marketplace::{
    app,
    config::Config,
    db,
    store::{IndividualProfile, InvestorProfile, Profile, StartupProfile, Store, User},
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::local(dir.path().join("data.json"));
        config.admin_emails = vec!["admin@example.com".to_owned()];
        let db_pool = db::memory().await.unwrap();
        let store = Store::open(&config.data_file).await.unwrap();
        let state = AppState::new(config, db_pool, store);

        Self {
            router: app(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    /// Registers an account and returns `(id, token)`.
    pub async fn register(&self, name: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": "correct horse",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        (
            body["user"]["id"].as_str().unwrap().to_owned(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }

    /// Puts users straight into the flat-file store.
    pub async fn seed(&self, users: Vec<User>) {
        self.state
            .store
            .write(move |data| {
                data.users.extend(users);
                Ok(())
            })
            .await
            .unwrap();
    }
}

pub fn user(id: &str, profile: Profile) -> User {
    User {
        id: id.to_owned(),
        name: id.to_uppercase(),
        email: format!("{id}@example.com"),
        inbox: Vec::new(),
        profile,
    }
}

pub fn individual(id: &str, skills: &[&str]) -> User {
    user(
        id,
        Profile::Individual(IndividualProfile {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }),
    )
}

pub fn startup(id: &str) -> User {
    user(id, Profile::Startup(StartupProfile::default()))
}

pub fn investor(id: &str, portfolio: &[&str]) -> User {
    user(
        id,
        Profile::Investor(InvestorProfile {
            portfolio: portfolio.iter().map(|s| s.to_string()).collect(),
        }),
    )
}
