use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::auth;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            login: model.login,
            display_name: model.display_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user with a freshly hashed password.
    ///
    /// The insert error is passed through without extra context so callers
    /// can recognize a duplicate-login unique violation.
    pub async fn create(
        &self,
        login: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || auth::hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            login: Set(login.to_string()),
            password_hash: Set(password_hash),
            display_name: Set(display_name.map(ToString::to_string)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = active.insert(&self.conn).await?;
        Ok(User::from(created))
    }

    /// Get user by login
    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(&self.conn)
            .await
            .context("Failed to query user by login")?;

        Ok(user.map(User::from))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Check login + password together, returning the user only on a match.
    ///
    /// Unknown login and wrong password are indistinguishable from the
    /// outside: both come back as `None`.
    ///
    /// Note: uses `spawn_blocking` because bcrypt verification is
    /// CPU-intensive and would block the async runtime if run directly.
    pub async fn verify_credentials(&self, login: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(&self.conn)
            .await
            .context("Failed to query user for credential verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        // Run CPU-intensive password verification in a blocking task
        let is_valid =
            task::spawn_blocking(move || auth::verify_password(&password, &password_hash))
                .await
                .context("Password verification task panicked")??;

        Ok(is_valid.then(|| User::from(user)))
    }

    /// Verify a password for a user found by ID.
    ///
    /// Returns `None` when no such user exists, `Some(valid)` otherwise.
    pub async fn verify_password_by_id(&self, id: i32, password: &str) -> Result<Option<bool>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid =
            task::spawn_blocking(move || auth::verify_password(&password, &password_hash))
                .await
                .context("Password verification task panicked")??;

        Ok(Some(is_valid))
    }

    /// Overwrite the stored hash for a user found by ID (hashes the new password).
    ///
    /// Returns `false` when no such user exists.
    pub async fn set_password_by_id(&self, id: i32, new_password: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        self.store_new_hash(user, new_password).await?;
        Ok(true)
    }

    /// Overwrite the stored hash for a user found by login (hashes the new password).
    ///
    /// Returns `false` when no such user exists.
    pub async fn set_password_by_login(&self, login: &str, new_password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Login.eq(login))
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        self.store_new_hash(user, new_password).await?;
        Ok(true)
    }

    async fn store_new_hash(&self, user: users::Model, new_password: &str) -> Result<()> {
        let password = new_password.to_string();
        let new_hash = task::spawn_blocking(move || auth::hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }
}
