use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::Serialize;

use crate::entities::users;

/// Account state stored as an integer column: zero is disabled, anything
/// else is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Enabled,
    Disabled,
}

impl UserStatus {
    #[must_use]
    pub const fn from_i16(raw: i16) -> Self {
        if raw == 0 { Self::Disabled } else { Self::Enabled }
    }

    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Enabled => 1,
            Self::Disabled => 0,
        }
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub nickname: String,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            nickname: model.nickname,
            status: UserStatus::from_i16(model.status),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Result of inserting a user that may race another first login for the
/// same username.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(User),
    UsernameTaken,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by username together with the stored password hash
    pub async fn get_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Insert a new enabled user and return the stored row.
    ///
    /// A unique-constraint violation on the username maps to
    /// `UsernameTaken` so concurrent first logins can fall back to the
    /// lookup-and-verify path instead of failing.
    pub async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<InsertUserOutcome> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            nickname: Set(nickname.to_string()),
            status: Set(UserStatus::Enabled.as_i16()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(InsertUserOutcome::Created(User::from(model))),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Ok(InsertUserOutcome::UsernameTaken),
                _ => Err(err).context("Failed to insert user"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_zero_is_disabled() {
        assert_eq!(UserStatus::from_i16(0), UserStatus::Disabled);
        assert!(UserStatus::from_i16(0).is_disabled());
    }

    #[test]
    fn any_nonzero_status_is_enabled() {
        assert_eq!(UserStatus::from_i16(1), UserStatus::Enabled);
        assert_eq!(UserStatus::from_i16(7), UserStatus::Enabled);
        assert_eq!(UserStatus::from_i16(-1), UserStatus::Enabled);
    }

    #[test]
    fn status_roundtrips_through_storage_value() {
        for status in [UserStatus::Enabled, UserStatus::Disabled] {
            assert_eq!(UserStatus::from_i16(status.as_i16()), status);
        }
    }
}
