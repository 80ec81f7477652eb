use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::error::{EdgeError, Result, StoreError};
use crate::models::{CheckIn, Chronotype, SleepRecord, UserProfile};
use crate::prediction::PredictionResult;
use crate::store::HistoryStore;

/// SQLite-backed history and prediction cache
pub struct Database {
    conn: Connection,
}

/// Row counts across all users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub sleep_records: usize,
    pub check_ins: usize,
    pub user_profiles: usize,
    pub predictions: usize,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let db = Self { conn };
        db.init_schema()?;
        debug!("opened database at {}", path.display());
        Ok(db)
    }

    /// Private database that disappears with the connection
    pub fn in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory().map_err(StoreError::from)?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        // In-memory databases report "memory" and keep their journal mode
        let journal_mode: String = self
            .conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(StoreError::from)?;
        self.conn
            .pragma_update(None, "synchronous", "NORMAL")
            .map_err(StoreError::from)?;
        debug!(journal_mode = %journal_mode, "schema check");

        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS sleep_records (
                user_id TEXT NOT NULL,
                date DATE NOT NULL,
                duration_minutes INTEGER,
                quality_rating INTEGER,
                bedtime DATETIME,
                wake_time DATETIME,
                caffeine_after_2pm INTEGER,
                alcohol_tonight INTEGER,
                exercise_today INTEGER,
                screen_time_minutes INTEGER,
                nap_duration_minutes INTEGER,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, date)
            );

            CREATE TABLE IF NOT EXISTS check_ins (
                user_id TEXT NOT NULL,
                date DATE NOT NULL,
                sleep_quality INTEGER,
                mental_clarity INTEGER,
                energy_rating INTEGER,
                stress_level INTEGER,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, date)
            );

            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                chronotype TEXT NOT NULL DEFAULT 'intermediate',
                age INTEGER,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS predictions (
                user_id TEXT NOT NULL,
                date DATE NOT NULL,
                edge_score INTEGER NOT NULL,
                risk_level TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, date)
            );

            CREATE INDEX IF NOT EXISTS idx_sleep_records_user_date ON sleep_records(user_id, date DESC);
            CREATE INDEX IF NOT EXISTS idx_check_ins_user_date ON check_ins(user_id, date DESC);
            "#,
            )
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Insert or replace the night filed under `record.date`.
    ///
    /// Cached predictions from that date on are dropped, since each one was
    /// computed from a window that included the old row.
    pub fn upsert_sleep_record(&mut self, user: &str, record: &SleepRecord) -> Result<()> {
        record.validate()?;
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        tx.execute(
                r#"
            INSERT OR REPLACE INTO sleep_records (
                user_id, date, duration_minutes, quality_rating, bedtime, wake_time,
                caffeine_after_2pm, alcohol_tonight, exercise_today, screen_time_minutes,
                nap_duration_minutes, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, CURRENT_TIMESTAMP)
            "#,
                params![
                    user,
                    record.date,
                    record.duration_minutes,
                    record.quality_rating,
                    record.bedtime,
                    record.wake_time,
                    record.caffeine_after_2pm,
                    record.alcohol_tonight,
                    record.exercise_today,
                    record.screen_time_minutes,
                    record.nap_duration_minutes,
                ],
            )
            .map_err(StoreError::from)?;
        Self::drop_predictions_from(&tx, user, Some(record.date))?;
        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }

    /// Insert or replace a check-in; invalidates cached predictions like
    /// [`Database::upsert_sleep_record`]
    pub fn upsert_checkin(&mut self, user: &str, checkin: &CheckIn) -> Result<()> {
        checkin.validate()?;
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        tx.execute(
                r#"
            INSERT OR REPLACE INTO check_ins (
                user_id, date, sleep_quality, mental_clarity, energy_rating, stress_level, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
            "#,
                params![
                    user,
                    checkin.date,
                    checkin.sleep_quality,
                    checkin.mental_clarity,
                    checkin.energy_rating,
                    checkin.stress_level,
                ],
            )
            .map_err(StoreError::from)?;
        Self::drop_predictions_from(&tx, user, Some(checkin.date))?;
        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }

    /// Chronotype and age feed every estimate, so all cached predictions go
    pub fn update_profile(&mut self, user: &str, profile: &UserProfile) -> Result<()> {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        tx.execute(
                r#"
            INSERT OR REPLACE INTO user_profiles (user_id, timezone, chronotype, age, updated_at)
            VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
            "#,
                params![
                    user,
                    profile.timezone,
                    profile.chronotype.as_str(),
                    profile.age
                ],
            )
            .map_err(StoreError::from)?;
        Self::drop_predictions_from(&tx, user, None)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }

    fn drop_predictions_from(conn: &Connection, user: &str, from: Option<NaiveDate>) -> Result<()> {
        let dropped = match from {
            Some(date) => conn.execute(
                "DELETE FROM predictions WHERE user_id = ?1 AND date >= ?2",
                params![user, date],
            ),
            None => conn.execute("DELETE FROM predictions WHERE user_id = ?1", params![user]),
        }
        .map_err(StoreError::from)?;
        if dropped > 0 {
            debug!(user, dropped, "cached predictions invalidated");
        }
        Ok(())
    }

    /// Cache a computed prediction; a later save for the same date replaces it
    pub fn save_prediction(&mut self, result: &PredictionResult) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        self.conn
            .execute(
                r#"
            INSERT OR REPLACE INTO predictions (user_id, date, edge_score, risk_level, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)
            "#,
                params![
                    result.user_id,
                    result.date,
                    result.edge_score,
                    result.risk_level.to_string(),
                    payload,
                ],
            )
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub fn load_prediction(&self, user: &str, date: NaiveDate) -> Result<Option<PredictionResult>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM predictions WHERE user_id = ?1 AND date = ?2",
                params![user, date],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)?;

        payload
            .map(|p| {
                serde_json::from_str(&p).map_err(|e| {
                    EdgeError::Store(StoreError::Corrupt {
                        table: "predictions".to_string(),
                        column: "payload".to_string(),
                        reason: e.to_string(),
                    })
                })
            })
            .transpose()
    }

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .map_err(StoreError::from)?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            sleep_records: count("sleep_records")?,
            check_ins: count("check_ins")?,
            user_profiles: count("user_profiles")?,
            predictions: count("predictions")?,
        })
    }

    fn sleep_record_from_row(row: &Row) -> rusqlite::Result<SleepRecord> {
        Ok(SleepRecord {
            date: row.get("date")?,
            duration_minutes: row.get("duration_minutes")?,
            quality_rating: row.get("quality_rating")?,
            bedtime: row.get::<_, Option<NaiveDateTime>>("bedtime")?,
            wake_time: row.get::<_, Option<NaiveDateTime>>("wake_time")?,
            caffeine_after_2pm: row.get("caffeine_after_2pm")?,
            alcohol_tonight: row.get("alcohol_tonight")?,
            exercise_today: row.get("exercise_today")?,
            screen_time_minutes: row.get("screen_time_minutes")?,
            nap_duration_minutes: row.get("nap_duration_minutes")?,
        })
    }

    fn checkin_from_row(row: &Row) -> rusqlite::Result<CheckIn> {
        Ok(CheckIn {
            date: row.get("date")?,
            sleep_quality: row.get("sleep_quality")?,
            mental_clarity: row.get("mental_clarity")?,
            energy_rating: row.get("energy_rating")?,
            stress_level: row.get("stress_level")?,
        })
    }
}

impl HistoryStore for Database {
    fn fetch_sleep_history(
        &self,
        user: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<SleepRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
            SELECT date, duration_minutes, quality_rating, bedtime, wake_time,
                   caffeine_after_2pm, alcohol_tonight, exercise_today,
                   screen_time_minutes, nap_duration_minutes
            FROM sleep_records
            WHERE user_id = ?1 AND date <= ?2
            ORDER BY date DESC
            LIMIT ?3
            "#,
            )
            .map_err(StoreError::from)?;

        let records = stmt
            .query_map(params![user, as_of, limit as i64], Self::sleep_record_from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(records)
    }

    fn fetch_checkins(&self, user: &str, as_of: NaiveDate, limit: usize) -> Result<Vec<CheckIn>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
            SELECT date, sleep_quality, mental_clarity, energy_rating, stress_level
            FROM check_ins
            WHERE user_id = ?1 AND date <= ?2
            ORDER BY date DESC
            LIMIT ?3
            "#,
            )
            .map_err(StoreError::from)?;

        let checkins = stmt
            .query_map(params![user, as_of, limit as i64], Self::checkin_from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(checkins)
    }

    fn fetch_profile(&self, user: &str) -> Result<Option<UserProfile>> {
        let row: Option<(String, String, Option<u32>)> = self
            .conn
            .query_row(
                "SELECT timezone, chronotype, age FROM user_profiles WHERE user_id = ?1",
                params![user],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(StoreError::from)?;

        row.map(|(timezone, chronotype, age)| {
            let chronotype = chronotype.parse::<Chronotype>().map_err(|e| StoreError::Corrupt {
                table: "user_profiles".to_string(),
                column: "chronotype".to_string(),
                reason: e.to_string(),
            })?;
            Ok(UserProfile {
                timezone,
                chronotype,
                age,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Duration::days(offset)
    }

    fn night(offset: i64) -> SleepRecord {
        let bedtime = day(offset - 1).and_hms_opt(23, 15, 0).unwrap();
        SleepRecord {
            duration_minutes: Some(450),
            quality_rating: Some(4),
            bedtime: Some(bedtime),
            wake_time: Some(bedtime + Duration::minutes(450)),
            caffeine_after_2pm: Some(false),
            screen_time_minutes: Some(30),
            ..SleepRecord::new(day(offset))
        }
    }

    #[test]
    fn test_sleep_round_trip_newest_first() {
        let mut db = Database::in_memory().unwrap();
        for offset in 0..5 {
            db.upsert_sleep_record("u1", &night(offset)).unwrap();
        }

        let records = db.fetch_sleep_history("u1", day(3), 14).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], night(3));
        assert_eq!(records[3].date, day(0));

        let limited = db.fetch_sleep_history("u1", day(4), 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_upsert_replaces_by_date() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_sleep_record("u1", &night(0)).unwrap();
        let shorter = SleepRecord {
            duration_minutes: Some(300),
            ..night(0)
        };
        db.upsert_sleep_record("u1", &shorter).unwrap();

        let records = db.fetch_sleep_history("u1", day(0), 14).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration_minutes, Some(300));
    }

    #[test]
    fn test_invalid_record_rejected() {
        let mut db = Database::in_memory().unwrap();
        let bad = SleepRecord {
            quality_rating: Some(9),
            ..night(0)
        };
        let err = db.upsert_sleep_record("u1", &bad).unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)));
        assert_eq!(db.get_stats().unwrap().sleep_records, 0);
    }

    #[test]
    fn test_checkins_and_profile() {
        let mut db = Database::in_memory().unwrap();
        let checkin = CheckIn {
            mental_clarity: Some(7),
            energy_rating: Some(4),
            ..CheckIn::new(day(1))
        };
        db.upsert_checkin("u1", &checkin).unwrap();
        assert_eq!(db.fetch_checkins("u1", day(1), 14).unwrap(), vec![checkin]);
        assert!(db.fetch_checkins("u1", day(0), 14).unwrap().is_empty());

        assert!(db.fetch_profile("u1").unwrap().is_none());
        let profile = UserProfile {
            timezone: "Europe/Berlin".to_string(),
            chronotype: Chronotype::Late,
            age: Some(41),
        };
        db.update_profile("u1", &profile).unwrap();
        assert_eq!(db.fetch_profile("u1").unwrap(), Some(profile));
    }

    #[test]
    fn test_new_entries_invalidate_later_predictions() {
        let mut db = Database::in_memory().unwrap();
        for offset in 0..5 {
            db.upsert_sleep_record("u1", &night(offset)).unwrap();
        }
        let (earlier, later) = {
            let engine = crate::prediction::PredictionEngine::new(&db);
            let evaluate = |date| engine.evaluate("u1", date).unwrap().into_result().unwrap();
            (evaluate(day(2)), evaluate(day(4)))
        };
        db.save_prediction(&earlier).unwrap();
        db.save_prediction(&later).unwrap();
        let other_user = PredictionResult {
            user_id: "u2".to_string(),
            ..later.clone()
        };
        db.save_prediction(&other_user).unwrap();
        assert_eq!(db.get_stats().unwrap().predictions, 3);

        // A check-in on day 3 changes the day 4 window only
        db.upsert_checkin("u1", &CheckIn::new(day(3))).unwrap();
        assert!(db.load_prediction("u1", day(2)).unwrap().is_some());
        assert!(db.load_prediction("u1", day(4)).unwrap().is_none());

        let shorter = SleepRecord {
            duration_minutes: Some(300),
            ..night(1)
        };
        db.upsert_sleep_record("u1", &shorter).unwrap();
        assert!(db.load_prediction("u1", day(2)).unwrap().is_none());

        // Other users keep their cache until their own profile changes
        assert!(db.load_prediction("u2", day(4)).unwrap().is_some());
        db.update_profile("u2", &UserProfile::default()).unwrap();
        assert_eq!(db.get_stats().unwrap().predictions, 0);
    }

    #[test]
    fn test_stats() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_sleep_record("u1", &night(0)).unwrap();
        db.upsert_sleep_record("u2", &night(0)).unwrap();
        db.update_profile("u1", &UserProfile::default()).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.sleep_records, 2);
        assert_eq!(stats.user_profiles, 1);
        assert_eq!(stats.check_ins, 0);
        assert_eq!(stats.predictions, 0);
    }
}
