//! State ledger
//!
//! One SQLite connection behind a mutex, commit per operation. Items are keyed
//! by `id` with a unique index on `url`; `published_at` drives the only state
//! transition an item ever makes:
//!
//! ```text
//! [created, unpublished] --mark_published()--> [published]   (terminal)
//! ```
//!
//! Ranking queries order by `score DESC, created_at DESC, id ASC` so equal
//! scores resolve newest first, deterministically.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use radar_core::{ContentItem, FeedbackRecord, FeedbackTally, FeedbackType};

use crate::{schema, LedgerResult, StorageConfig, FRESH_WINDOW_HOURS};

pub(crate) const ITEM_COLUMNS: &str = "id, text, url, author_id, author_username, author_name, \
     author_followers, likes, shares, replies, created_at, score, topics, categories, summary, \
     published_at";

const RANK_ORDER: &str = "ORDER BY score DESC, created_at DESC, id ASC";

/// Durable record of items, feedback and the publish lifecycle
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open (or create) the database described by `config`
    pub fn open(config: &StorageConfig) -> LedgerResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.path)?;
        info!("Opened ledger at {}", config.path.display());
        Self::initialize(conn, config.busy_timeout_ms)
    }

    /// Open a database file with default settings
    pub fn open_path(path: &Path) -> LedgerResult<Self> {
        Self::open(&StorageConfig {
            path: path.to_path_buf(),
            ..Default::default()
        })
    }

    /// Open a private in-memory ledger (for testing)
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, StorageConfig::default().busy_timeout_ms)
    }

    fn initialize(conn: Connection, busy_timeout_ms: u64) -> LedgerResult<Self> {
        schema::apply_pragmas(&conn, busy_timeout_ms)?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Connection) -> LedgerResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Persist a new item and bump its topic frequencies
    ///
    /// Fails with [`crate::LedgerError::Conflict`] when the id or URL is already
    /// stored, so a duplicate that slipped past the gate is still rejected.
    pub fn insert(&self, item: &ContentItem) -> LedgerResult<()> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO items (
                    id, text, url, author_id, author_username, author_name,
                    author_followers, likes, shares, replies, created_at, score,
                    topics, categories, summary, ingested_at, published_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    item.id,
                    item.text,
                    item.url,
                    item.author_id,
                    item.author_username,
                    item.author_name,
                    to_i64(item.author_followers),
                    to_i64(item.likes),
                    to_i64(item.shares),
                    to_i64(item.replies),
                    to_sql_ts(item.created_at),
                    item.score.max(0.0),
                    serde_json::to_string(&item.topics)?,
                    serde_json::to_string(&item.categories)?,
                    item.summary,
                    to_sql_ts(now),
                    item.published_at.map(to_sql_ts),
                ],
            )?;

            for topic in &item.topics {
                tx.execute(
                    "INSERT INTO topics (name, frequency, updated_at) VALUES (?1, 1, ?2)
                     ON CONFLICT(name) DO UPDATE SET
                        frequency = frequency + 1,
                        updated_at = excluded.updated_at",
                    params![topic, to_sql_ts(now)],
                )?;
            }

            tx.commit()?;
            debug!(item = %item.id, score = item.score, "inserted");
            Ok(())
        })
    }

    pub fn get(&self, id: &str) -> LedgerResult<Option<ContentItem>> {
        self.with_conn(|conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                    [id],
                    row_to_item,
                )
                .optional()?;
            Ok(item)
        })
    }

    pub fn exists(&self, id: &str) -> LedgerResult<bool> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM items WHERE id = ?1", [id], |r| r.get(0))?;
            Ok(count > 0)
        })
    }

    pub fn url_exists(&self, url: &str) -> LedgerResult<bool> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM items WHERE url = ?1", [url], |r| r.get(0))?;
            Ok(count > 0)
        })
    }

    /// Texts of the most recently created items, newest first
    pub fn recent_texts(&self, limit: usize) -> LedgerResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT text FROM items ORDER BY created_at DESC LIMIT ?1")?;
            let texts = stmt
                .query_map([to_limit(limit)], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(texts)
        })
    }

    /// Overwrite an item's score (clamped at zero); false if the item is unknown
    pub fn update_score(&self, id: &str, score: f64) -> LedgerResult<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE items SET score = ?2 WHERE id = ?1",
                params![id, score.max(0.0)],
            )?;
            Ok(updated > 0)
        })
    }

    /// Every stored item, ranked
    pub fn all(&self) -> LedgerResult<Vec<ContentItem>> {
        self.query_items(&format!("SELECT {ITEM_COLUMNS} FROM items {RANK_ORDER}"), [])
    }

    pub fn top_by_score(&self, limit: usize) -> LedgerResult<Vec<ContentItem>> {
        self.query_items(
            &format!("SELECT {ITEM_COLUMNS} FROM items {RANK_ORDER} LIMIT ?1"),
            [to_limit(limit)],
        )
    }

    /// Most recently created items
    pub fn recent(&self, limit: usize) -> LedgerResult<Vec<ContentItem>> {
        self.query_items(
            &format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at DESC, id ASC LIMIT ?1"),
            [to_limit(limit)],
        )
    }

    pub fn unpublished(&self, limit: usize) -> LedgerResult<Vec<ContentItem>> {
        self.query_items(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE published_at IS NULL {RANK_ORDER} LIMIT ?1"
            ),
            [to_limit(limit)],
        )
    }

    pub fn next_to_publish(&self) -> LedgerResult<Option<ContentItem>> {
        self.next_to_publish_at(Utc::now())
    }

    /// Two-tier selection as of `now`
    ///
    /// Best unpublished item created in the last two hours, otherwise the best
    /// unpublished item overall.
    pub fn next_to_publish_at(&self, now: DateTime<Utc>) -> LedgerResult<Option<ContentItem>> {
        self.next_to_publish_within(now, Duration::hours(FRESH_WINDOW_HOURS))
    }

    /// Same as [`Ledger::next_to_publish_at`] with a custom fresh window
    pub fn next_to_publish_within(
        &self,
        now: DateTime<Utc>,
        fresh_window: Duration,
    ) -> LedgerResult<Option<ContentItem>> {
        // A window reaching past year 1 covers every stored item
        let cutoff = now
            .checked_sub_signed(fresh_window)
            .filter(|ts| (1..=9999).contains(&ts.year()))
            .map(to_sql_ts)
            .unwrap_or_default();
        self.with_conn(|conn| {
            let fresh = conn
                .query_row(
                    &format!(
                        "SELECT {ITEM_COLUMNS} FROM items
                         WHERE published_at IS NULL AND created_at >= ?1
                         {RANK_ORDER} LIMIT 1"
                    ),
                    [&cutoff],
                    row_to_item,
                )
                .optional()?;
            if fresh.is_some() {
                return Ok(fresh);
            }

            let backlog = conn
                .query_row(
                    &format!(
                        "SELECT {ITEM_COLUMNS} FROM items WHERE published_at IS NULL {RANK_ORDER} LIMIT 1"
                    ),
                    [],
                    row_to_item,
                )
                .optional()?;
            Ok(backlog)
        })
    }

    pub fn mark_published(&self, id: &str) -> LedgerResult<bool> {
        self.mark_published_at(id, Utc::now())
    }

    /// Move an item to the published state
    ///
    /// Re-marking a published item leaves `published_at` untouched. Returns
    /// false only when no item has this id.
    pub fn mark_published_at(&self, id: &str, now: DateTime<Utc>) -> LedgerResult<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE items SET published_at = ?2 WHERE id = ?1 AND published_at IS NULL",
                params![id, to_sql_ts(now)],
            )?;
            if updated > 0 {
                info!(item = %id, "marked published");
                return Ok(true);
            }
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM items WHERE id = ?1", [id], |r| r.get(0))?;
            Ok(count > 0)
        })
    }

    /// Top half by score plus top half by recency, merged and re-ranked
    pub fn diverse_selection(&self, limit: usize) -> LedgerResult<Vec<ContentItem>> {
        let half = limit / 2;
        let mut merged = self.top_by_score(half)?;
        for item in self.recent(half)? {
            if !merged.iter().any(|m| m.id == item.id) {
                merged.push(item);
            }
        }

        merged.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        merged.truncate(limit);
        Ok(merged)
    }

    pub fn add_feedback(
        &self,
        item_id: &str,
        user_id: &str,
        feedback_type: FeedbackType,
    ) -> LedgerResult<()> {
        self.add_feedback_at(item_id, user_id, feedback_type, Utc::now())
    }

    /// Record feedback; a later submission by the same user replaces the earlier one
    pub fn add_feedback_at(
        &self,
        item_id: &str,
        user_id: &str,
        feedback_type: FeedbackType,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (item_id, user_id, feedback_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(item_id, user_id) DO UPDATE SET
                    feedback_type = excluded.feedback_type,
                    created_at = excluded.created_at",
                params![item_id, user_id, feedback_type.as_str(), to_sql_ts(now)],
            )?;
            Ok(())
        })
    }

    /// Like/dislike counts for one item
    pub fn feedback_tally(&self, item_id: &str) -> LedgerResult<FeedbackTally> {
        self.with_conn(|conn| {
            let (like, dislike): (i64, i64) = conn.query_row(
                "SELECT
                    COALESCE(SUM(feedback_type = 'like'), 0),
                    COALESCE(SUM(feedback_type = 'dislike'), 0)
                 FROM feedback WHERE item_id = ?1",
                [item_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(FeedbackTally::new(like.max(0) as u64, dislike.max(0) as u64))
        })
    }

    pub fn feedback_for(&self, item_id: &str) -> LedgerResult<Vec<FeedbackRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, user_id, feedback_type, created_at
                 FROM feedback WHERE item_id = ?1 ORDER BY created_at DESC",
            )?;
            let records = stmt
                .query_map([item_id], row_to_feedback)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    /// Repair sweep: keep one row (lowest internal id) per URL
    pub fn delete_duplicate_urls(&self) -> LedgerResult<usize> {
        let deleted = self.with_conn(schema::delete_duplicate_urls)?;
        info!("Deleted {} duplicate items", deleted);
        Ok(deleted)
    }

    /// Remove every item, feedback record and topic
    pub fn clear(&self) -> LedgerResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "DELETE FROM feedback;
                 DELETE FROM items;
                 DELETE FROM topics;",
            )?;
            Ok(())
        })
    }

    fn query_items<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> LedgerResult<Vec<ContentItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let items = stmt
                .query_map(params, row_to_item)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }
}

#[derive(Debug, Error)]
#[error("invalid stored value: {0}")]
struct ColumnError(String);

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(ColumnError(msg)))
}

pub(crate) fn row_to_item(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    let created_at: String = row.get(10)?;
    let topics: String = row.get(12)?;
    let categories: String = row.get(13)?;
    let published_at: Option<String> = row.get(15)?;

    Ok(ContentItem {
        id: row.get(0)?,
        text: row.get(1)?,
        url: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        author_name: row.get(5)?,
        author_followers: from_i64(row.get(6)?),
        likes: from_i64(row.get(7)?),
        shares: from_i64(row.get(8)?),
        replies: from_i64(row.get(9)?),
        created_at: parse_ts(&created_at).ok_or_else(|| conversion_error(10, created_at.clone()))?,
        score: row.get(11)?,
        topics: serde_json::from_str(&topics).map_err(|e| conversion_error(12, e.to_string()))?,
        categories: serde_json::from_str(&categories)
            .map_err(|e| conversion_error(13, e.to_string()))?,
        summary: row.get(14)?,
        published_at: match published_at {
            Some(ts) => Some(parse_ts(&ts).ok_or_else(|| conversion_error(15, ts.clone()))?),
            None => None,
        },
    })
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    let feedback_type: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(FeedbackRecord {
        item_id: row.get(0)?,
        user_id: row.get(1)?,
        feedback_type: feedback_type
            .parse()
            .map_err(|e: radar_core::CoreError| conversion_error(2, e.to_string()))?,
        created_at: parse_ts(&created_at).ok_or_else(|| conversion_error(3, created_at.clone()))?,
    })
}

/// Fixed-width RFC 3339 so text comparison matches time order
pub(crate) fn to_sql_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp; naive values are taken as UTC
pub(crate) fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_i64(value: i64) -> u64 {
    value.max(0) as u64
}

pub(crate) fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
