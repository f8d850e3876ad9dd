//! SQLite persistence layer for candle history and live decisions.
//!
//! - `candles`: one OHLCV row per (asset, open_time); inserts are upserts
//! - `decisions`: every live inference, so it can be replayed later

use crate::types::{Candle, Decision};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Candle store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("SQLite connection lock poisoned")]
    Poisoned,
}

/// A recorded live decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDecision {
    pub asset: String,
    pub open_time: i64,
    pub decision: Decision,
    pub created_at: i64,
}

/// SQLite store for candle history.
pub struct CandleStore {
    conn: Mutex<Connection>,
}

impl CandleStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite candle store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS candles (
                asset TEXT NOT NULL,
                open_time INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (asset, open_time)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset TEXT NOT NULL,
                open_time INTEGER NOT NULL,
                decision TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_decisions_asset_time ON decisions(asset, open_time)",
            [],
        )?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    // ========== Candle Methods ==========

    /// Insert or replace candles for an asset. Returns the number written.
    pub fn upsert_candles(&self, asset: &str, candles: &[Candle]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO candles (asset, open_time, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(asset, open_time) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume",
            )?;
            for c in candles {
                stmt.execute(params![
                    asset,
                    c.open_time,
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume
                ])?;
            }
        }
        tx.commit()?;
        debug!("Upserted {} candles for {}", candles.len(), asset);
        Ok(candles.len())
    }

    /// The most recent `limit` candles, ascending by open time.
    pub fn latest_candles(&self, asset: &str, limit: usize) -> Result<Vec<Candle>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT open_time, open, high, low, close, volume
             FROM candles WHERE asset = ?1
             ORDER BY open_time DESC LIMIT ?2",
        )?;
        let mut candles = stmt
            .query_map(params![asset, limit as i64], row_to_candle)?
            .collect::<Result<Vec<_>, _>>()?;
        candles.reverse();
        Ok(candles)
    }

    /// Candles with `start <= open_time < end`, ascending.
    pub fn candles_between(
        &self,
        asset: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<Candle>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT open_time, open, high, low, close, volume
             FROM candles WHERE asset = ?1 AND open_time >= ?2 AND open_time < ?3
             ORDER BY open_time ASC",
        )?;
        let candles = stmt
            .query_map(params![asset, start, end], row_to_candle)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(candles)
    }

    /// Full history for an asset, ascending.
    pub fn all_candles(&self, asset: &str) -> Result<Vec<Candle>, StoreError> {
        self.candles_between(asset, i64::MIN, i64::MAX)
    }

    pub fn candle_count(&self, asset: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM candles WHERE asset = ?1",
            params![asset],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Open time of the newest stored candle.
    pub fn last_open_time(&self, asset: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let last: Option<i64> = conn.query_row(
            "SELECT MAX(open_time) FROM candles WHERE asset = ?1",
            params![asset],
            |row| row.get(0),
        )?;
        Ok(last)
    }

    // ========== Decision Methods ==========

    pub fn record_decision(
        &self,
        asset: &str,
        open_time: i64,
        decision: Decision,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO decisions (asset, open_time, decision, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                asset,
                open_time,
                decision.as_str(),
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Recorded decisions for an asset, oldest first.
    pub fn decisions(&self, asset: &str, limit: usize) -> Result<Vec<StoredDecision>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT asset, open_time, decision, created_at FROM decisions
             WHERE asset = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let mut decisions = stmt
            .query_map(params![asset, limit as i64], |row| {
                let decision: String = row.get(2)?;
                Ok(StoredDecision {
                    asset: row.get(0)?,
                    open_time: row.get(1)?,
                    decision: Decision::from_str(&decision).unwrap_or_default(),
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        decisions.reverse();
        Ok(decisions)
    }
}

fn row_to_candle(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candle> {
    Ok(Candle {
        open_time: row.get(0)?,
        open: row.get(1)?,
        high: row.get(2)?,
        low: row.get(3)?,
        close: row.get(4)?,
        volume: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_time: i64, close: f64) -> Candle {
        Candle {
            open_time,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn test_upsert_and_count() {
        let store = CandleStore::new_in_memory().unwrap();
        let candles: Vec<Candle> = (0..5).map(|i| candle(i * 60_000, 100.0 + i as f64)).collect();
        assert_eq!(store.upsert_candles("BTCUSDT", &candles).unwrap(), 5);
        assert_eq!(store.candle_count("BTCUSDT").unwrap(), 5);
        assert_eq!(store.candle_count("ETHUSDT").unwrap(), 0);

        // Same key replaces the row
        store.upsert_candles("BTCUSDT", &[candle(0, 42.0)]).unwrap();
        assert_eq!(store.candle_count("BTCUSDT").unwrap(), 5);
        assert_eq!(store.all_candles("BTCUSDT").unwrap()[0].close, 42.0);
    }

    #[test]
    fn test_latest_candles_are_ascending() {
        let store = CandleStore::new_in_memory().unwrap();
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, i as f64)).collect();
        store.upsert_candles("BTCUSDT", &candles).unwrap();

        let latest = store.latest_candles("BTCUSDT", 3).unwrap();
        let times: Vec<i64> = latest.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![7, 8, 9]);
        assert_eq!(store.last_open_time("BTCUSDT").unwrap(), Some(9));
        assert_eq!(store.last_open_time("ETHUSDT").unwrap(), None);
    }

    #[test]
    fn test_candles_between() {
        let store = CandleStore::new_in_memory().unwrap();
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, i as f64)).collect();
        store.upsert_candles("BTCUSDT", &candles).unwrap();
        let range = store.candles_between("BTCUSDT", 2, 5).unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range[0].open_time, 2);
    }

    #[test]
    fn test_record_decisions() {
        let store = CandleStore::new_in_memory().unwrap();
        store.record_decision("BTCUSDT", 1, Decision::Buy).unwrap();
        store.record_decision("BTCUSDT", 2, Decision::Sell).unwrap();
        store.record_decision("ETHUSDT", 2, Decision::Hold).unwrap();

        let decisions = store.decisions("BTCUSDT", 10).unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].decision, Decision::Buy);
        assert_eq!(decisions[1].open_time, 2);
    }
}
