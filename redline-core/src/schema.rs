/// DDL for the version tracking table. Safe to run on every open.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// Tables left behind by unversioned databases. Dropped before v1 is applied.
const LEGACY_DROP_SQL: &str = "
    DROP TABLE IF EXISTS comments;
    DROP TABLE IF EXISTS sessions;
";

/// v1: sessions and line comments.
///
/// A comment is anchored by `(file_name, start_line)`; `end_line` equals
/// `start_line` for single-line comments. Deleting a session cascades.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        id          TEXT    PRIMARY KEY,
        repo_path   TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS comments (
        id           TEXT    PRIMARY KEY,
        session_id   TEXT    NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        file_name    TEXT    NOT NULL,
        start_line   INTEGER NOT NULL CHECK(start_line > 0),
        end_line     INTEGER NOT NULL,
        comment_type TEXT    NOT NULL
                             CHECK(comment_type IN ('suggestion','issue','question','praise')),
        body         TEXT    NOT NULL CHECK(length(trim(body)) > 0),
        created_at   INTEGER NOT NULL,
        CHECK(end_line >= start_line)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS comments_by_session ON comments(session_id);
";

/// v2: the overall review verdict, one row per session.
pub const SCHEMA_V2_SQL: &str = "
    CREATE TABLE IF NOT EXISTS reviews (
        session_id  TEXT    PRIMARY KEY REFERENCES sessions(id) ON DELETE CASCADE,
        status      TEXT    NOT NULL DEFAULT 'pending'
                            CHECK(status IN ('pending','approved','changes_requested')),
        summary     TEXT    NOT NULL DEFAULT '',
        updated_at  INTEGER NOT NULL
    ) STRICT;
";

pub const LATEST_VERSION: i64 = 2;

/// Forward-only migration to [`LATEST_VERSION`]. Idempotent.
///
/// Version 0 means the file predates versioning, so any tables with our names
/// are treated as legacy and dropped before v1 is created. Each step runs in
/// its own `BEGIN IMMEDIATE` transaction and records its version.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(LEGACY_DROP_SQL)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
        log::info!("schema migrated to v1");
    }

    if version < 2 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V2_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
        tx.commit()?;
        log::info!("schema migrated to v2");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_twice_is_a_no_op() {
        let mut db = rusqlite::Connection::open_in_memory().unwrap();
        migrate(&mut db).unwrap();
        migrate(&mut db).unwrap();
        let rows: i64 = db
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, LATEST_VERSION);
    }

    #[test]
    fn comment_checks_reject_bad_ranges() {
        let mut db = rusqlite::Connection::open_in_memory().unwrap();
        migrate(&mut db).unwrap();
        db.execute(
            "INSERT INTO sessions (id, repo_path, created_at, updated_at) VALUES ('s', '/r', 0, 0)",
            [],
        )
        .unwrap();
        let inverted = db.execute(
            "INSERT INTO comments (id, session_id, file_name, start_line, end_line,
                                   comment_type, body, created_at)
             VALUES ('c', 's', 'a.txt', 9, 4, 'issue', 'x', 0)",
            [],
        );
        assert!(inverted.is_err());
        let bad_kind = db.execute(
            "INSERT INTO comments (id, session_id, file_name, start_line, end_line,
                                   comment_type, body, created_at)
             VALUES ('c', 's', 'a.txt', 4, 4, 'nitpick', 'x', 0)",
            [],
        );
        assert!(bad_kind.is_err());
    }
}
