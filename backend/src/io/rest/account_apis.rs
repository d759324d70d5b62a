//! # Account endpoints
//!
//! Registration, login and logout.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use shared::{LoginForm, RegisterForm};
use tracing::{info, warn};

use super::auth::{expired_session_cookie, safe_next, session_cookie, session_token};
use super::error::AppError;
use super::pages;
use super::{LOGIN_PATH, REPORT_PATH};
use crate::domain::commands::accounts::RegisterCommand;
use crate::domain::DomainError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub async fn index() -> Redirect {
    Redirect::to(REPORT_PATH)
}

pub async fn register_form() -> Html<String> {
    pages::register_page(&RegisterForm::default(), &[])
}

/// Register, log the new user in and send them to their report
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Result<Response, AppError> {
    info!("POST /accounts/register - username: {}", form.username);

    let command = RegisterCommand {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        password: form.password.clone(),
        confirm_password: form.confirm_password.clone(),
    };

    match state.account_service.register(command).await {
        Ok(holder) => {
            let session = state.account_service.create_session(&holder.user).await?;
            Ok(logged_in_redirect(&state, &session.token, REPORT_PATH))
        }
        Err(e) if e.is_form_error() => {
            let form = RegisterForm {
                password: String::new(),
                confirm_password: String::new(),
                ..form
            };
            Ok(pages::register_page(&form, &[e.to_string()]).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
    pages::login_page(&safe_next(query.next.as_deref()), "", &[])
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, AppError> {
    info!("POST /accounts/login - username: {}", form.username);
    let next = safe_next(form.next.as_deref());

    match state.account_service.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            let session = state.account_service.create_session(&user).await?;
            Ok(logged_in_redirect(&state, &session.token, &next))
        }
        Err(e @ DomainError::InvalidCredentials) => {
            warn!("Failed login for username {}", form.username);
            Ok(pages::login_page(&next, &form.username, &[e.to_string()]).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        if state.account_service.logout(&token).await? {
            info!("Session closed");
        }
    }
    Ok(([(header::SET_COOKIE, expired_session_cookie())], Redirect::to(LOGIN_PATH)).into_response())
}

fn logged_in_redirect(state: &AppState, token: &str, target: &str) -> Response {
    let auth = &state.config.auth;
    let cookie = session_cookie(token, auth.session_ttl_hours * 3600, auth.secure_cookies);
    ([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response()
}
