//! Comment storage seam.
//!
//! The annotation core only needs list / create / delete by id. The binary and
//! the integration tests talk to SQLite through [`SqliteStore`]; unit tests use
//! [`MemoryStore`].

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_rusqlite::Connection;

use crate::db;
use crate::error::StoreError;
use crate::types::{Comment, Review, ReviewStatus, Session};

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Every stored comment, in creation order.
    async fn list(&self) -> Result<Vec<Comment>, StoreError>;

    /// Persists `comment` and returns the stored copy.
    async fn create(&self, comment: Comment) -> Result<Comment, StoreError>;

    /// Deletes by id. Unknown ids are [`StoreError::NotFound`].
    async fn delete(&self, comment_id: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store scoped to one review session.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
    session: Session,
}

impl SqliteStore {
    /// Opens the database at `db_path` and resumes (or starts) the session for `repo_path`.
    pub async fn open(db_path: &str, repo_path: &str) -> Result<Self, StoreError> {
        let conn = db::open_db(db_path).await?;
        let session = db::detect_or_create_session(&conn, repo_path).await?;
        Ok(Self { conn, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn load_review(&self) -> Result<Review, StoreError> {
        db::load_review(&self.conn, &self.session.id).await
    }

    pub async fn save_review(
        &self,
        status: ReviewStatus,
        summary: &str,
    ) -> Result<Review, StoreError> {
        db::save_review(&self.conn, &self.session.id, status, summary).await
    }

    /// Bumps the session timestamp; called on quit.
    pub async fn touch(&self) -> Result<(), StoreError> {
        db::update_session_timestamp(&self.conn, &self.session.id).await
    }
}

#[async_trait]
impl CommentStore for SqliteStore {
    async fn list(&self) -> Result<Vec<Comment>, StoreError> {
        db::list_comments(&self.conn, &self.session.id).await
    }

    async fn create(&self, comment: Comment) -> Result<Comment, StoreError> {
        db::insert_comment(&self.conn, &self.session.id, &comment).await?;
        log::debug!("stored comment {} at {}:{}", comment.id, comment.file_name, comment.start_line);
        Ok(comment)
    }

    async fn delete(&self, comment_id: &str) -> Result<(), StoreError> {
        db::delete_comment(&self.conn, &self.session.id, comment_id).await
    }
}

/// In-process store, for headless use and tests.
#[derive(Default)]
pub struct MemoryStore {
    comments: Mutex<Vec<Comment>>,
}

impl MemoryStore {
    pub fn with_comments(comments: Vec<Comment>) -> Self {
        Self { comments: Mutex::new(comments) }
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(self.comments.lock().clone())
    }

    async fn create(&self, comment: Comment) -> Result<Comment, StoreError> {
        self.comments.lock().push(comment.clone());
        Ok(comment)
    }

    async fn delete(&self, comment_id: &str) -> Result<(), StoreError> {
        let mut comments = self.comments.lock();
        let before = comments.len();
        comments.retain(|c| c.id != comment_id);
        if comments.len() == before {
            return Err(StoreError::NotFound(comment_id.to_owned()));
        }
        Ok(())
    }
}
