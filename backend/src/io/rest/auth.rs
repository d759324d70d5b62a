//! Session cookie handling and the logged-in user extractor.
use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::error::AppError;
use super::{LOGIN_PATH, REPORT_PATH};
use crate::domain::models::{Account, User};
use crate::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

/// The user behind the request's session cookie.
///
/// Anonymous requests are redirected to the login page with `next` set to the
/// requested path.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub account: Account,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let next = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let next = next.path_and_query().map(|pq| pq.as_str()).unwrap_or("/").to_string();

        let Some(token) = session_token(&parts.headers) else {
            return Err(login_redirect(&next));
        };

        match state.account_service.resolve_session(&token).await {
            Ok(Some(holder)) => Ok(CurrentUser {
                user: holder.user,
                account: holder.account,
                token,
            }),
            Ok(None) => {
                debug!("Unknown or expired session, redirecting to login");
                Err(login_redirect(&next))
            }
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}

/// Read the session token from the `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

pub fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("{}?next={}", LOGIN_PATH, urlencoding::encode(next))).into_response()
}

/// Only local absolute paths are followed after login
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => REPORT_PATH.to_string(),
    }
}
