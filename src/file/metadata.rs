//! File metadata records and their persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::{Result, VaultError};

const FILE_COLUMNS: &str =
    "id, user_id, folder_id, stored_name, stored_path, mime_type, size, uploaded_at";

/// Metadata row describing one uploaded file.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FileRecord {
    /// Database-assigned file ID.
    pub id: i64,
    /// Uploading user.
    #[sqlx(rename = "user_id")]
    pub owner_id: i64,
    /// Optional folder/grouping reference.
    #[sqlx(rename = "folder_id")]
    pub group_id: Option<i64>,
    /// Generated name on disk.
    pub stored_name: String,
    /// Path where the bytes live.
    pub stored_path: String,
    /// Caller-supplied MIME type.
    #[sqlx(rename = "mime_type")]
    pub content_type: String,
    /// Size in bytes.
    pub size: i64,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// Data for inserting a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: i64,
    pub group_id: Option<i64>,
    pub stored_name: String,
    pub stored_path: String,
    pub content_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Persistence contract for file metadata.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert a record. Fails on constraint violation.
    async fn create(&self, file: &NewFileRecord) -> Result<FileRecord>;

    /// Get a record by ID, or [`VaultError::NotFound`].
    async fn find_by_id(&self, id: i64) -> Result<FileRecord>;

    /// List records owned by a user, ordered by ID. Empty when none.
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>>;

    /// Delete a record by ID.
    async fn delete(&self, id: i64) -> Result<()>;

    /// List every record, ordered by ID.
    async fn list_all(&self) -> Result<Vec<FileRecord>>;
}

/// SQLite-backed [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: DbPool,
}

impl FileRepository {
    /// Create a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for FileRepository {
    async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (user_id, folder_id, stored_name, stored_path, mime_type, size, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(file.owner_id)
        .bind(file.group_id)
        .bind(&file.stored_name)
        .bind(&file.stored_path)
        .bind(&file.content_type)
        .bind(file.size)
        .bind(file.uploaded_at)
        .fetch_one(&self.pool)
        .await?;

        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: i64) -> Result<FileRecord> {
        sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("owner", "owner@example.com", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    fn new_record(owner_id: i64, stored_name: &str) -> NewFileRecord {
        NewFileRecord {
            owner_id,
            group_id: None,
            stored_name: stored_name.to_string(),
            stored_path: format!("/srv/uploads/{stored_name}"),
            content_type: "text/plain".to_string(),
            size: 42,
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (db, owner_id) = setup().await;
        let repo = FileRepository::new(db.pool().clone());

        let mut new_file = new_record(owner_id, "a.txt");
        new_file.group_id = Some(3);
        let created = repo.create(&new_file).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.owner_id, owner_id);
        assert_eq!(created.group_id, Some(3));
        assert_eq!(created.stored_name, "a.txt");
        assert_eq!(created.stored_path, "/srv/uploads/a.txt");
        assert_eq!(created.content_type, "text/plain");
        assert_eq!(created.size, 42);
        assert_eq!(
            created.uploaded_at.timestamp(),
            new_file.uploaded_at.timestamp()
        );

        let found = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let (db, _) = setup().await;
        let repo = FileRepository::new(db.pool().clone());

        let result = repo.find_by_id(999).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_duplicate_stored_name_fails() {
        let (db, owner_id) = setup().await;
        let repo = FileRepository::new(db.pool().clone());

        repo.create(&new_record(owner_id, "dup.txt")).await.unwrap();
        let result = repo.create(&new_record(owner_id, "dup.txt")).await;
        assert!(matches!(result, Err(VaultError::Database(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_owner_fails() {
        let (db, _) = setup().await;
        let repo = FileRepository::new(db.pool().clone());

        let result = repo.create(&new_record(999, "orphan.txt")).await;
        assert!(matches!(result, Err(VaultError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let (db, owner_id) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("other", "other@example.com", "hash"))
            .await
            .unwrap();
        let repo = FileRepository::new(db.pool().clone());

        repo.create(&new_record(owner_id, "1.txt")).await.unwrap();
        repo.create(&new_record(other.id, "2.txt")).await.unwrap();
        repo.create(&new_record(owner_id, "3.txt")).await.unwrap();

        let files = repo.list_by_owner(owner_id).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.stored_name.as_str()).collect();
        assert_eq!(names, vec!["1.txt", "3.txt"]);

        assert!(repo.list_by_owner(12345).await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, owner_id) = setup().await;
        let repo = FileRepository::new(db.pool().clone());

        let created = repo.create(&new_record(owner_id, "gone.txt")).await.unwrap();
        repo.delete(created.id).await.unwrap();

        assert!(matches!(
            repo.find_by_id(created.id).await,
            Err(VaultError::NotFound(_))
        ));
        // Deleting a missing row is not a store error
        repo.delete(created.id).await.unwrap();
    }
}
