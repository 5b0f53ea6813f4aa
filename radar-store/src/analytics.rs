//! Read-only aggregate views over the ledger

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use radar_core::{FeedbackRecord, FeedbackType, Polarity};

use crate::ledger::{parse_ts, to_limit, to_sql_ts};
use crate::{Ledger, LedgerResult};

/// Ledger-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_items: u64,
    pub published: u64,
    pub unpublished: u64,
    pub distinct_authors: u64,
    pub average_score: f64,
    pub items_last_24h: u64,
    pub total_feedback: u64,
}

/// Feedback counts by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Histogram of 1..=5 star ratings (index 0 is one star)
    pub ratings: [u64; 5],
    pub likes: u64,
    pub dislikes: u64,
    pub approved: u64,
    pub rejected: u64,
    pub edited: u64,
    pub skipped: u64,
    pub total: u64,
    /// Positive share of all polarized feedback, `None` without any
    pub positive_ratio: Option<f64>,
}

impl FeedbackStats {
    fn record(&mut self, feedback_type: FeedbackType, count: u64) {
        match feedback_type {
            FeedbackType::Like => self.likes += count,
            FeedbackType::Dislike => self.dislikes += count,
            FeedbackType::Approved => self.approved += count,
            FeedbackType::Rejected => self.rejected += count,
            FeedbackType::Edited => self.edited += count,
            FeedbackType::Skipped => self.skipped += count,
            other => {
                if let Some(stars) = other.rating() {
                    self.ratings[usize::from(stars) - 1] += count;
                }
            }
        }
        self.total += count;
    }

    /// Mean star rating, `None` when nobody rated
    pub fn average_rating(&self) -> Option<f64> {
        let count: u64 = self.ratings.iter().sum();
        if count == 0 {
            return None;
        }
        let weighted: u64 = self
            .ratings
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u64 + 1) * n)
            .sum();
        Some(weighted as f64 / count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: u64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCount {
    pub name: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorStats {
    pub author_id: String,
    pub username: String,
    pub items: u64,
    pub average_score: f64,
    pub total_engagement: u64,
}

/// Activity for one UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEngagement {
    /// `YYYY-MM-DD`
    pub day: String,
    pub items: u64,
    pub average_score: f64,
    pub total_engagement: u64,
}

impl Ledger {
    pub fn summary(&self) -> LedgerResult<LedgerSummary> {
        self.summary_at(Utc::now())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> LedgerResult<LedgerSummary> {
        let since = to_sql_ts(now - Duration::hours(24));
        self.with_conn(|conn| {
            let summary = conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(published_at IS NOT NULL), 0),
                    COUNT(DISTINCT NULLIF(author_id, '')),
                    COALESCE(AVG(score), 0.0),
                    COALESCE(SUM(created_at >= ?1), 0),
                    (SELECT COUNT(*) FROM feedback)
                 FROM items",
                [&since],
                |row| {
                    let total = count(row.get(0)?);
                    let published = count(row.get(1)?);
                    Ok(LedgerSummary {
                        total_items: total,
                        published,
                        unpublished: total.saturating_sub(published),
                        distinct_authors: count(row.get(2)?),
                        average_score: row.get(3)?,
                        items_last_24h: count(row.get(4)?),
                        total_feedback: count(row.get(5)?),
                    })
                },
            )?;
            Ok(summary)
        })
    }

    pub fn feedback_stats(&self) -> LedgerResult<FeedbackStats> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT feedback_type, COUNT(*) FROM feedback GROUP BY feedback_type")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut stats = FeedbackStats::default();
        let (mut positive, mut negative) = (0u64, 0u64);
        for (name, n) in rows {
            // The CHECK constraint keeps unknown names out
            let Ok(feedback_type) = name.parse::<FeedbackType>() else {
                continue;
            };
            let n = count(n);
            stats.record(feedback_type, n);
            match feedback_type.polarity() {
                Polarity::Positive => positive += n,
                Polarity::Negative => negative += n,
                Polarity::Neutral => {}
            }
        }
        if positive + negative > 0 {
            stats.positive_ratio = Some(positive as f64 / (positive + negative) as f64);
        }
        Ok(stats)
    }

    /// Item count and average score per category, most populated first
    pub fn category_rollup(&self, limit: usize) -> LedgerResult<Vec<CategoryStats>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.value, COUNT(*), AVG(items.score)
                 FROM items, json_each(items.categories) AS c
                 GROUP BY c.value
                 ORDER BY COUNT(*) DESC, c.value ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([to_limit(limit)], |row| {
                    Ok(CategoryStats {
                        category: row.get(0)?,
                        count: count(row.get(1)?),
                        average_score: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn trending_topics(&self, limit: usize) -> LedgerResult<Vec<TopicCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, frequency FROM topics
                 ORDER BY frequency DESC, updated_at DESC, name ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([to_limit(limit)], |row| {
                    Ok(TopicCount {
                        name: row.get(0)?,
                        frequency: count(row.get(1)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Authors ranked by average item score
    pub fn top_authors(&self, limit: usize) -> LedgerResult<Vec<AuthorStats>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT author_id, MAX(author_username), COUNT(*), AVG(score),
                        SUM(likes + shares + replies)
                 FROM items
                 WHERE author_id != ''
                 GROUP BY author_id
                 ORDER BY AVG(score) DESC, COUNT(*) DESC, author_id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([to_limit(limit)], |row| {
                    Ok(AuthorStats {
                        author_id: row.get(0)?,
                        username: row.get(1)?,
                        items: count(row.get(2)?),
                        average_score: row.get(3)?,
                        total_engagement: count(row.get(4)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn engagement_trends(&self, days: u32) -> LedgerResult<Vec<DailyEngagement>> {
        self.engagement_trends_at(days, Utc::now())
    }

    /// Per-day activity over the last `days` days, oldest day first
    pub fn engagement_trends_at(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<DailyEngagement>> {
        let since = to_sql_ts(now - Duration::days(i64::from(days)));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT substr(created_at, 1, 10) AS day, COUNT(*), AVG(score),
                        SUM(likes + shares + replies)
                 FROM items
                 WHERE created_at >= ?1
                 GROUP BY day
                 ORDER BY day ASC",
            )?;
            let rows = stmt
                .query_map([&since], |row| {
                    Ok(DailyEngagement {
                        day: row.get(0)?,
                        items: count(row.get(1)?),
                        average_score: row.get(2)?,
                        total_engagement: count(row.get(3)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recent moderation decisions (approved/rejected/edited/skipped)
    pub fn review_statuses(&self, limit: usize) -> LedgerResult<Vec<FeedbackRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT item_id, user_id, feedback_type, created_at FROM feedback
                 WHERE feedback_type IN (?1, ?2, ?3, ?4)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?5",
            )?;
            let [a, r, e, s] = FeedbackType::REVIEW_STATUSES.map(|t| t.as_str());
            let raw = stmt
                .query_map(params![a, r, e, s, to_limit(limit)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let records = raw
                .into_iter()
                .filter_map(|(item_id, user_id, kind, created_at)| {
                    Some(FeedbackRecord {
                        item_id,
                        user_id,
                        feedback_type: kind.parse().ok()?,
                        created_at: parse_ts(&created_at)?,
                    })
                })
                .collect();
            Ok(records)
        })
    }
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}
