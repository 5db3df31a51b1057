//! `SeaORM` implementation of the `AuthService` trait.

use anyhow::Context;
use async_trait::async_trait;
use tokio::task;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::db::{InsertUserOutcome, Store, User};
use crate::services::auth_service::{AuthError, AuthService, LoginOutcome, LoginResult, UserInfo};

pub struct SeaOrmAuthService {
    store: Store,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    default_nickname: String,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        default_nickname: String,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            default_nickname,
        }
    }

    /// Hash a password on a blocking thread.
    /// Note: Argon2 is CPU-intensive and would stall the async runtime
    /// if run directly.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        let hash = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task panicked")??;

        Ok(hash)
    }

    /// Verify a password against a stored hash on a blocking thread.
    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        let is_valid = task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .context("Password verification task panicked")?;

        Ok(is_valid)
    }

    /// Login path for an account that already exists.
    async fn login_existing(
        &self,
        user: User,
        stored_hash: &str,
        password: &str,
    ) -> Result<LoginResult, AuthError> {
        if !self.verify_password(password, stored_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if user.status.is_disabled() {
            return Err(AuthError::AccountDisabled);
        }

        self.finish_login(user, LoginOutcome::Success)
    }

    /// Login path for an unknown username: register it and log in.
    async fn register_and_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResult, AuthError> {
        let password_hash = self.hash_password(password).await?;

        match self
            .store
            .insert_user(username, &password_hash, &self.default_nickname)
            .await
            .map_err(AuthError::database)?
        {
            InsertUserOutcome::Created(user) => {
                tracing::info!("Registered new account on first login: {username}");
                self.finish_login(user, LoginOutcome::FirstLoginRegistered)
            }
            InsertUserOutcome::UsernameTaken => {
                // Lost the race against a concurrent first login for the
                // same username. The row that won is authoritative, so
                // fall back to verifying against it.
                let (user, stored_hash) = self
                    .store
                    .get_user_by_username_with_password(username)
                    .await
                    .map_err(AuthError::database)?
                    .ok_or_else(|| {
                        AuthError::Internal(
                            "User disappeared after unique-constraint conflict".to_string(),
                        )
                    })?;

                self.login_existing(user, &stored_hash, password).await
            }
        }
    }

    /// Issue a token and assemble the result.
    fn finish_login(&self, user: User, outcome: LoginOutcome) -> Result<LoginResult, AuthError> {
        let issued = self.tokens.issue(&user.username)?;

        Ok(LoginResult {
            user: UserInfo::from(user),
            token: issued.token,
            expires_at: issued.expires_at.to_rfc3339(),
            outcome,
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Username and password must not be empty".to_string(),
            ));
        }

        match self
            .store
            .get_user_by_username_with_password(username)
            .await
            .map_err(AuthError::database)?
        {
            Some((user, stored_hash)) => self.login_existing(user, &stored_hash, password).await,
            None => self.register_and_login(username, password).await,
        }
    }

    async fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify(token)?;
        Ok(claims.sub)
    }

    async fn get_user(&self, id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_id(id)
            .await
            .map_err(AuthError::database)?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo::from(user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await
            .map_err(AuthError::database)?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo::from(user))
    }
}
