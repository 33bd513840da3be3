use std::time::Duration;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::StoreError;
use crate::types::{now_secs, Comment, CommentKind, Review, ReviewStatus, Session};

/// Opens (or creates) the database at `path`, configures WAL mode and applies
/// schema migrations.
///
/// `busy_timeout` is set through the connection method rather than a PRAGMA
/// string so it survives pragma caching.
pub async fn open_db(path: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        // Leftover WAL from a crashed run.
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        crate::schema::migrate(db)
    })
    .await?;

    log::debug!("opened review database at {path}");
    Ok(conn)
}

/// Resumes the most recent session for `repo_path`, or creates one.
///
/// Resuming bumps `updated_at`. Both paths write inside `BEGIN IMMEDIATE`.
pub async fn detect_or_create_session(
    conn: &Connection,
    repo_path: &str,
) -> Result<Session, StoreError> {
    let repo_path = repo_path.to_owned();

    let session = conn
        .call(move |db| -> rusqlite::Result<Session> {
            let existing: Option<Session> = db
                .query_row(
                    "SELECT id, repo_path, created_at, updated_at
                     FROM sessions
                     WHERE repo_path = ?1
                     ORDER BY updated_at DESC
                     LIMIT 1",
                    rusqlite::params![&repo_path],
                    |r| {
                        Ok(Session {
                            id: r.get(0)?,
                            repo_path: r.get(1)?,
                            created_at: r.get(2)?,
                            updated_at: r.get(3)?,
                        })
                    },
                )
                .optional()?;

            let now = now_secs();
            let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let session = match existing {
                Some(mut session) => {
                    tx.execute(
                        "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
                        rusqlite::params![now, &session.id],
                    )?;
                    session.updated_at = now;
                    session
                }
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO sessions (id, repo_path, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        rusqlite::params![&id, &repo_path, now],
                    )?;
                    Session { id, repo_path, created_at: now, updated_at: now }
                }
            };
            tx.commit()?;
            Ok(session)
        })
        .await?;

    log::info!("review session {} for {}", session.id, session.repo_path);
    Ok(session)
}

/// Touches the session so the next launch resumes it.
pub async fn update_session_timestamp(
    conn: &Connection,
    session_id: &str,
) -> Result<(), StoreError> {
    let session_id = session_id.to_owned();

    conn.call(move |db| -> rusqlite::Result<()> {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now_secs(), &session_id],
        )?;
        tx.commit()
    })
    .await?;
    Ok(())
}

/// Raw comment columns; the kind is validated after leaving the connection thread.
struct CommentRow {
    id: String,
    file_name: String,
    start_line: u32,
    end_line: u32,
    kind: String,
    body: String,
    created_at: i64,
}

impl CommentRow {
    fn into_comment(self) -> Result<Comment, StoreError> {
        let kind = CommentKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("comment type {:?}", self.kind)))?;
        Ok(Comment {
            id: self.id,
            file_name: self.file_name,
            start_line: self.start_line,
            end_line: self.end_line,
            text: self.body,
            kind,
            created_at: self.created_at,
        })
    }
}

/// All comments of a session in insertion order.
pub async fn list_comments(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<Comment>, StoreError> {
    let session_id = session_id.to_owned();

    let rows = conn
        .call(move |db| -> rusqlite::Result<Vec<CommentRow>> {
            let mut stmt = db.prepare(
                "SELECT id, file_name, start_line, end_line, comment_type, body, created_at
                 FROM comments
                 WHERE session_id = ?1
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![&session_id], |r| {
                    Ok(CommentRow {
                        id: r.get(0)?,
                        file_name: r.get(1)?,
                        start_line: r.get(2)?,
                        end_line: r.get(3)?,
                        kind: r.get(4)?,
                        body: r.get(5)?,
                        created_at: r.get(6)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;

    rows.into_iter().map(CommentRow::into_comment).collect()
}

pub async fn insert_comment(
    conn: &Connection,
    session_id: &str,
    comment: &Comment,
) -> Result<(), StoreError> {
    let session_id = session_id.to_owned();
    let comment = comment.clone();

    conn.call(move |db| -> rusqlite::Result<()> {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO comments (id, session_id, file_name, start_line, end_line,
                                   comment_type, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &comment.id,
                &session_id,
                &comment.file_name,
                comment.start_line,
                comment.end_line,
                comment.kind.as_str(),
                &comment.text,
                comment.created_at,
            ],
        )?;
        tx.commit()
    })
    .await?;
    Ok(())
}

/// Deletes one comment. Unknown ids fail with [`StoreError::NotFound`].
pub async fn delete_comment(
    conn: &Connection,
    session_id: &str,
    comment_id: &str,
) -> Result<(), StoreError> {
    let session_id = session_id.to_owned();
    let id = comment_id.to_owned();

    let removed = conn
        .call(move |db| -> rusqlite::Result<usize> {
            let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let n = tx.execute(
                "DELETE FROM comments WHERE id = ?1 AND session_id = ?2",
                rusqlite::params![&id, &session_id],
            )?;
            tx.commit()?;
            Ok(n)
        })
        .await?;

    if removed == 0 {
        return Err(StoreError::NotFound(comment_id.to_owned()));
    }
    Ok(())
}

/// The session's review, or a pending review with an empty summary if none was saved.
pub async fn load_review(conn: &Connection, session_id: &str) -> Result<Review, StoreError> {
    let session_id = session_id.to_owned();

    let row = conn
        .call(move |db| -> rusqlite::Result<Option<(String, String, i64)>> {
            db.query_row(
                "SELECT status, summary, updated_at FROM reviews WHERE session_id = ?1",
                rusqlite::params![&session_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
        })
        .await?;

    match row {
        None => Ok(Review::default()),
        Some((status, summary, updated_at)) => {
            let status = ReviewStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("review status {status:?}")))?;
            Ok(Review { status, summary, updated_at })
        }
    }
}

/// Upserts the session's review and returns it with the new timestamp.
pub async fn save_review(
    conn: &Connection,
    session_id: &str,
    status: ReviewStatus,
    summary: &str,
) -> Result<Review, StoreError> {
    let session_id = session_id.to_owned();
    let summary = summary.trim().to_owned();
    let now = now_secs();
    let stored = summary.clone();

    conn.call(move |db| -> rusqlite::Result<()> {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO reviews (session_id, status, summary, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id)
             DO UPDATE SET status = excluded.status,
                           summary = excluded.summary,
                           updated_at = excluded.updated_at",
            rusqlite::params![&session_id, status.as_str(), &stored, now],
        )?;
        tx.commit()
    })
    .await?;

    Ok(Review { status, summary, updated_at: now })
}
