//! User repository for vasvault.
//!
//! This module provides CRUD operations for users in the database.

use sqlx::QueryBuilder;

use super::user::{NewUser, User, UserUpdate};
use super::DbPool;
use crate::{Result, VaultError};

const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";

/// Map a unique-constraint violation on `users` to a conflict error.
fn map_user_write_error(e: sqlx::Error) -> VaultError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("email") {
                return VaultError::Conflict("email".to_string());
            }
            if message.contains("username") {
                return VaultError::Conflict("username".to_string());
            }
        }
    }
    VaultError::Database(e.to_string())
}

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID. A duplicate username
    /// or email yields [`VaultError::Conflict`].
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .execute(self.pool)
            .await
            .map_err(map_user_write_error)?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }


    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref username) = update.username {
            separated.push("username = ");
            separated.push_bind_unseparated(username);
        }
        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email);
        }
        if let Some(ref password) = update.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password);
        }
        separated.push("updated_at = datetime('now')");

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(map_user_write_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }


    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Check if a username is already taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password, "hash");
    }

    #[tokio::test]
    async fn test_create_duplicate_email_is_conflict() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();
        let result = repo
            .create(&NewUser::new("bob", "ALICE@example.com", "hash"))
            .await;

        match result {
            Err(VaultError::Conflict(field)) => assert_eq!(field, "email"),
            other => panic!("Expected email conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_username_is_conflict() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();
        let result = repo
            .create(&NewUser::new("Alice", "other@example.com", "hash"))
            .await;

        match result {
            Err(VaultError::Conflict(field)) => assert_eq!(field, "username"),
            other => panic!("Expected username conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();

        let by_email = repo.get_by_email("Alice@Example.com").await.unwrap();
        assert_eq!(by_email.unwrap().username, "alice");

        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();

        let updated = repo
            .update(user.id, &UserUpdate::new().username("alice2").password("newhash"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.password, "newhash");
        assert_eq!(updated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_update_nonexistent_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = repo
            .update(999, &UserUpdate::new().username("ghost"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_conflict() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();
        let bob = repo
            .create(&NewUser::new("bob", "bob@example.com", "hash"))
            .await
            .unwrap();

        let result = repo
            .update(bob.id, &UserUpdate::new().email("alice@example.com"))
            .await;
        assert!(matches!(result, Err(VaultError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_exists_checks() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "alice@example.com", "hash"))
            .await
            .unwrap();

        assert!(repo.email_exists("alice@example.com").await.unwrap());
        assert!(repo.username_exists("ALICE").await.unwrap());
        assert!(!repo.email_exists("bob@example.com").await.unwrap());
        assert!(!repo.username_exists("bob").await.unwrap());
    }
}
