//! Schema creation and in-place upgrades
//!
//! Upgrades are idempotent and run on every open:
//! - databases created before the publication lifecycle get a `published_at` column
//! - duplicate URLs that entered before the dedup gate are repaired before the
//!   unique URL index is created

use rusqlite::Connection;
use tracing::info;

use crate::LedgerResult;

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        url TEXT NOT NULL,
        author_id TEXT NOT NULL DEFAULT '',
        author_username TEXT NOT NULL DEFAULT '',
        author_name TEXT NOT NULL DEFAULT '',
        author_followers INTEGER NOT NULL DEFAULT 0,
        likes INTEGER NOT NULL DEFAULT 0,
        shares INTEGER NOT NULL DEFAULT 0,
        replies INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        score REAL NOT NULL DEFAULT 0.0,
        topics TEXT NOT NULL DEFAULT '[]',
        categories TEXT NOT NULL DEFAULT '[]',
        summary TEXT,
        ingested_at TEXT NOT NULL,
        published_at TEXT
    );

    CREATE TABLE IF NOT EXISTS feedback (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id TEXT NOT NULL REFERENCES items (id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        feedback_type TEXT NOT NULL CHECK (feedback_type IN (
            'like', 'dislike',
            'rating_1', 'rating_2', 'rating_3', 'rating_4', 'rating_5',
            'approved', 'rejected', 'edited', 'skipped'
        )),
        created_at TEXT NOT NULL,
        UNIQUE (item_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS topics (
        name TEXT PRIMARY KEY,
        frequency INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS category_preferences (
        name TEXT PRIMARY KEY,
        preference REAL NOT NULL,
        weight REAL NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_items_score ON items (score DESC);
    CREATE INDEX IF NOT EXISTS idx_items_created_at ON items (created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_items_author_id ON items (author_id);
    CREATE INDEX IF NOT EXISTS idx_feedback_item_id ON feedback (item_id);
    CREATE INDEX IF NOT EXISTS idx_topics_frequency ON topics (frequency DESC);
";

/// Apply connection pragmas
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u64) -> LedgerResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        "
    ))?;
    Ok(())
}

/// Create tables and bring older databases up to date
pub fn run_migrations(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(CREATE_TABLES)?;

    if !has_column(conn, "items", "published_at")? {
        info!("Adding published_at column to items");
        conn.execute_batch("ALTER TABLE items ADD COLUMN published_at TEXT")?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_items_published_at ON items (published_at)",
    )?;

    let repaired = delete_duplicate_urls(conn)?;
    if repaired > 0 {
        info!("Removed {} duplicate URL rows before indexing", repaired);
    }
    conn.execute_batch("CREATE UNIQUE INDEX IF NOT EXISTS idx_items_url ON items (url)")?;

    Ok(())
}

/// Keep the lowest-rowid item per URL, delete the rest
pub fn delete_duplicate_urls(conn: &Connection) -> LedgerResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM items
         WHERE rowid NOT IN (
             SELECT MIN(rowid) FROM items GROUP BY url
         )",
        [],
    )?;
    Ok(deleted)
}

fn has_column(conn: &Connection, table: &str, column: &str) -> LedgerResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert!(has_column(&conn, "items", "published_at").unwrap());
        assert!(has_column(&conn, "category_preferences", "weight").unwrap());
    }

    #[test]
    fn test_legacy_table_gains_published_at_and_unique_urls() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                url TEXT NOT NULL,
                author_id TEXT NOT NULL DEFAULT '',
                author_username TEXT NOT NULL DEFAULT '',
                author_name TEXT NOT NULL DEFAULT '',
                author_followers INTEGER NOT NULL DEFAULT 0,
                likes INTEGER NOT NULL DEFAULT 0,
                shares INTEGER NOT NULL DEFAULT 0,
                replies INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                score REAL NOT NULL DEFAULT 0.0,
                topics TEXT NOT NULL DEFAULT '[]',
                categories TEXT NOT NULL DEFAULT '[]',
                summary TEXT,
                ingested_at TEXT NOT NULL
            );
            INSERT INTO items (id, text, url, created_at, ingested_at)
                VALUES ('a', 't', 'https://dup', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');
            INSERT INTO items (id, text, url, created_at, ingested_at)
                VALUES ('b', 't', 'https://dup', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');
            INSERT INTO items (id, text, url, created_at, ingested_at)
                VALUES ('c', 't', 'https://other', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        assert!(has_column(&conn, "items", "published_at").unwrap());
        let ids: Vec<String> = conn
            .prepare("SELECT id FROM items ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);

        let err = conn.execute(
            "INSERT INTO items (id, text, url, created_at, ingested_at)
             VALUES ('d', 't', 'https://other', 'x', 'x')",
            [],
        );
        assert!(err.is_err());
    }
}
