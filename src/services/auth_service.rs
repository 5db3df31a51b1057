//! Domain service for login and user lookup.
//!
//! Handles credential checks, first-login account creation, and bearer
//! token issuance and verification.

use serde::Serialize;
use thiserror::Error;

use crate::auth::TokenError;
use crate::db::{User, UserStatus};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Store failure, keeping the context chain for the server-side log.
    pub(crate) fn database(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::TokenInvalid,
        }
    }
}

/// User info DTO for responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub nickname: String,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// How a login concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Credentials matched an existing account.
    Success,
    /// No account existed for the username; one was registered with the
    /// supplied credentials and logged straight in.
    FirstLoginRegistered,
}

/// Login result: the account, a fresh bearer token, and how it went.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserInfo,
    pub token: String,
    pub expires_at: String,
    pub outcome: LoginOutcome,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks credentials and returns a fresh bearer token.
    ///
    /// An unknown username registers a new enabled account and counts
    /// as a successful first login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on a password mismatch
    /// and [`AuthError::AccountDisabled`] for disabled accounts.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Verifies a bearer token and returns the subject username.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] or [`AuthError::TokenInvalid`],
    /// keeping the two cases distinguishable for clients.
    async fn verify_token(&self, token: &str) -> Result<String, AuthError>;

    /// Gets information for a specific user.
    async fn get_user(&self, id: i32) -> Result<UserInfo, AuthError>;

    /// Gets information for a user by username.
    async fn get_user_by_username(&self, username: &str) -> Result<UserInfo, AuthError>;
}
