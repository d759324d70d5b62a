//! Helpers for driving the router in handler tests.
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::config::{AppConfig, AuthConfig};
use crate::domain::email_service::testing::RecordingMailer;
use crate::domain::models::{Session, User};
use crate::storage::test_utils::seed_account;
use crate::storage::{DbConnection, SessionRepository};
use crate::{create_router, AppState};

pub struct TestApp {
    pub db: DbConnection,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn test_app() -> TestApp {
    let db = DbConnection::init_test().await.expect("Failed to create test database");
    let config = AppConfig {
        auth: AuthConfig {
            password_hash_cost: 4,
            ..AuthConfig::default()
        },
        ..AppConfig::default()
    };
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(db.clone(), config, mailer.clone());
    TestApp { db, state, mailer }
}

impl TestApp {
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Create a funded user with an open session and return the session token
    pub async fn login_as(&self, username: &str, balance: f64) -> String {
        self.login_user(username, balance).await.1
    }

    pub async fn login_user(&self, username: &str, balance: f64) -> (User, String) {
        let (user, _) = seed_account(&self.db, username, balance).await;
        let now = Utc::now();
        let session = Session {
            token: format!("token-{}", username),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        SessionRepository::new(self.db.clone())
            .store_session(&session)
            .await
            .expect("Failed to open session");
        (user, session.token)
    }

    /// Like `login_as`, for a staff member
    pub async fn login_staff(&self, username: &str) -> String {
        let (user, token) = self.login_user(username, 0.0).await;
        sqlx::query("UPDATE users SET is_staff = 1 WHERE id = ?")
            .bind(user.id)
            .execute(self.db.pool())
            .await
            .expect("Failed to promote user");
        token
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("sessionid={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("sessionid={}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
