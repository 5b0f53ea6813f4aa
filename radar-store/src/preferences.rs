//! Learned category preferences
//!
//! Rating feedback moves category weights in memory; the ledger keeps the
//! latest value per category so the next process starts from it.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::debug;

use radar_core::ScoringConfig;

use crate::ledger::{parse_ts, to_sql_ts};
use crate::{Ledger, LedgerResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPreference {
    pub category: String,
    /// Unclamped learned value
    pub preference: f64,
    /// Effective multiplier at the time it was saved
    pub weight: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ledger {
    pub fn save_preference(
        &self,
        category: &str,
        preference: f64,
        weight: f64,
    ) -> LedgerResult<()> {
        self.save_preference_at(category, preference, weight, Utc::now())
    }

    /// Upsert the learned state of one category
    pub fn save_preference_at(
        &self,
        category: &str,
        preference: f64,
        weight: f64,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO category_preferences (name, preference, weight, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    preference = excluded.preference,
                    weight = excluded.weight,
                    updated_at = excluded.updated_at",
                params![category, preference, weight, to_sql_ts(now)],
            )?;
            Ok(())
        })?;
        debug!(category, preference, weight, "preference saved");
        Ok(())
    }

    pub fn category_preferences(&self) -> LedgerResult<Vec<StoredPreference>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, preference, weight, updated_at
                 FROM category_preferences ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(StoredPreference {
                        category: row.get(0)?,
                        preference: row.get(1)?,
                        weight: row.get(2)?,
                        updated_at: parse_ts(&row.get::<_, String>(3)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overlay stored preferences onto `config`; returns how many were applied
    ///
    /// Learned values win over weights from the settings file.
    pub fn load_preferences_into(&self, config: &mut ScoringConfig) -> LedgerResult<usize> {
        let applied = self
            .category_preferences()?
            .into_iter()
            .filter(|p| config.restore_preference(&p.category, p.preference))
            .count();
        Ok(applied)
    }
}
