//! Registration, login and session handling.
//!
//! Passwords are hashed with bcrypt on the blocking pool. Sessions are opaque
//! uuid tokens stored in SQLite and carried by the `sessionid` cookie.
use anyhow::anyhow;
use chrono::{Duration, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::commands::accounts::{AccountHolder, RegisterCommand};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Account, NewUser, Session, User};
use crate::storage::{AccountRepository, DbConnection, SessionRepository, UserRepository};

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct AccountService {
    user_repository: UserRepository,
    account_repository: AccountRepository,
    session_repository: SessionRepository,
    auth: AuthConfig,
}

impl AccountService {
    pub fn new(db: DbConnection, auth: AuthConfig) -> Self {
        Self {
            user_repository: UserRepository::new(db.clone()),
            account_repository: AccountRepository::new(db.clone()),
            session_repository: SessionRepository::new(db),
            auth,
        }
    }

    /// Register a user and open their account
    pub async fn register(&self, command: RegisterCommand) -> DomainResult<AccountHolder> {
        let username = command.username.trim().to_string();
        let email = command.email.trim().to_string();
        validate_registration(&username, &email, &command.password, &command.confirm_password)?;

        if self.user_repository.username_exists(&username).await? {
            return Err(DomainError::UsernameTaken);
        }

        let password = command.password;
        let cost = self.auth.password_hash_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| anyhow!("Password hashing task failed: {}", e))?
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

        let is_staff = self.auth.staff_usernames.iter().any(|s| s == &username);
        let new_user = NewUser {
            username,
            email,
            password_hash,
            first_name: command.first_name.trim().to_string(),
            last_name: command.last_name.trim().to_string(),
            is_staff,
        };

        let (user, account) = self.user_repository.create_user(&new_user).await?;
        info!(
            "Registered user {} (id={}, account_no={}, staff={})",
            user.username, user.id, account.account_no, user.is_staff
        );
        Ok(AccountHolder { user, account })
    }

    /// Check a username/password pair
    pub async fn authenticate(&self, username: &str, password: &str) -> DomainResult<User> {
        let Some((user, password_hash)) = self.user_repository.find_credentials(username.trim()).await? else {
            return Err(DomainError::InvalidCredentials);
        };

        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
            .await
            .map_err(|e| anyhow!("Password verification task failed: {}", e))?;

        match verified {
            Ok(true) => Ok(user),
            Ok(false) => Err(DomainError::InvalidCredentials),
            Err(e) => {
                warn!("Unreadable password hash for user {}: {}", user.username, e);
                Err(DomainError::InvalidCredentials)
            }
        }
    }

    pub async fn create_session(&self, user: &User) -> DomainResult<Session> {
        let now = Utc::now().trunc_subsecs(0);
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            created_at: now,
            expires_at: now + Duration::hours(self.auth.session_ttl_hours),
        };
        self.session_repository.store_session(&session).await?;
        info!("Opened session for user {}", user.username);
        Ok(session)
    }

    /// Look up the user behind a session token. Expired sessions are removed.
    pub async fn resolve_session(&self, token: &str) -> DomainResult<Option<AccountHolder>> {
        let Some(session) = self.session_repository.get_session(token).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.session_repository.delete_session(token).await?;
            return Ok(None);
        }

        let Some(user) = self.user_repository.get_user(session.user_id).await? else {
            return Ok(None);
        };
        let account = self.get_account(&user).await?;
        Ok(Some(AccountHolder { user, account }))
    }

    pub async fn logout(&self, token: &str) -> DomainResult<bool> {
        Ok(self.session_repository.delete_session(token).await?)
    }

    pub async fn purge_expired_sessions(&self) -> DomainResult<u64> {
        let purged = self.session_repository.delete_expired(Utc::now()).await?;
        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        Ok(purged)
    }

    pub async fn get_account(&self, user: &User) -> DomainResult<Account> {
        self.account_repository
            .get_by_user(user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account"))
    }
}

fn validate_registration(username: &str, email: &str, password: &str, confirm_password: &str) -> DomainResult<()> {
    if username.is_empty() {
        return Err(DomainError::InvalidRegistration("Username is required.".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN
        || !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::InvalidRegistration(
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.".to_string(),
        ));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {}
        _ => {
            return Err(DomainError::InvalidRegistration(
                "Enter a valid email address.".to_string(),
            ))
        }
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::InvalidRegistration(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm_password {
        return Err(DomainError::InvalidRegistration(
            "The two password fields didn't match.".to_string(),
        ));
    }
    Ok(())
}
