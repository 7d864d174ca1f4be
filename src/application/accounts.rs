//! Registration, password log-in and cookie sessions.
//!
//! Session tokens are random 256-bit values handed to the browser; only their
//! SHA-256 digest is persisted.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::slug::is_valid_username;
use crate::domain::viewer::Viewer;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("sign-up form is invalid")]
    Invalid(SignupErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.password_confirm.is_none()
    }
}

/// A freshly issued session. `token` goes into the cookie and is never stored.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn signup(
        &self,
        form: &SignupForm,
    ) -> Result<(UserRecord, IssuedSession), AccountError> {
        let mut errors = SignupErrors::default();
        let username = form.username.trim();

        if !is_valid_username(username) {
            errors.username = Some(
                "Enter a valid username: up to 150 letters, digits and @/./+/-/_ characters."
                    .to_string(),
            );
        } else if self.users.find_user_by_username(username).await?.is_some() {
            errors.username = Some("A user with that username already exists.".to_string());
        }

        if form.password.chars().count() < MIN_PASSWORD_LEN {
            errors.password = Some(format!(
                "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
            ));
        }
        if form.password != form.password_confirm {
            errors.password_confirm = Some("The two password fields didn't match.".to_string());
        }

        if !errors.is_empty() {
            return Err(AccountError::Invalid(errors));
        }

        let password_hash = hash_password(&form.password).await?;
        let user = match self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => {
                return Err(AccountError::Invalid(SignupErrors {
                    username: Some("A user with that username already exists.".to_string()),
                    ..SignupErrors::default()
                }));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "postboard::application::accounts",
            user_id = %user.id,
            username = %user.username,
            "user registered"
        );

        let session = self.issue_session(&user).await?;
        Ok((user, session))
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserRecord, IssuedSession), AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        verify_password(password, &user.password_hash).await?;

        let session = self.issue_session(&user).await?;
        debug!(
            target = "postboard::application::accounts",
            user_id = %user.id,
            "session issued"
        );
        Ok((user, session))
    }

    /// Start a new session for `user`.
    pub async fn issue_session(&self, user: &UserRecord) -> Result<IssuedSession, AccountError> {
        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;
        self.sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                token_hash: hash_token(&token),
                expires_at,
            })
            .await?;
        Ok(IssuedSession { token, expires_at })
    }

    /// Resolve a cookie token to a viewer. Unknown or expired tokens are anonymous.
    pub async fn authenticate(&self, token: &str) -> Result<Viewer, AccountError> {
        let token_hash = hash_token(token);
        let Some(session) = self.sessions.find_session(&token_hash).await? else {
            return Ok(Viewer::Anonymous);
        };

        if session.is_expired(OffsetDateTime::now_utc()) {
            self.sessions.delete_session(&token_hash).await?;
            return Ok(Viewer::Anonymous);
        }

        match self.users.find_user_by_id(session.user_id).await? {
            Some(user) => Ok(Viewer::authenticated(user.id, user.username)),
            None => Ok(Viewer::Anonymous),
        }
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(&hash_token(token)).await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AccountError> {
        Ok(self
            .sessions
            .purge_expired_sessions(OffsetDateTime::now_utc())
            .await?)
    }
}

/// Argon2id hash of `password`, computed on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AccountError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AccountError::Hashing(format!("hashing task failed: {err}")))?
}

async fn verify_password(password: &str, stored: &str) -> Result<(), AccountError> {
    let (password, stored) = (password.to_owned(), stored.to_owned());
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|_| AccountError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AccountError::InvalidCredentials)
    })
    .await
    .map_err(|err| AccountError::Hashing(format!("verification task failed: {err}")))?
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
