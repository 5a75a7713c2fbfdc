//! SQLite tick store.

use super::{IngestError, TickSource, WireEndpoint, WireTick};
use crate::models::EndpointState;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe tick store backed by SQLite.
///
/// Aggregation only reads from it; the write methods exist for the probing
/// side and for fixtures.
#[derive(Clone)]
pub struct SqliteTickStore {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl SqliteTickStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let display = path.as_ref().display().to_string();
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: display,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), IngestError> {
        let conn = self.lock()?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| IngestError::Database(format!("migration 1 failed: {}", e)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IngestError> {
        self.conn
            .lock()
            .map_err(|_| IngestError::Database("connection lock poisoned".to_string()))
    }

    // --- Endpoints ---

    /// Add a monitored endpoint.
    pub fn add_endpoint(&self, id: &str, url: &str) -> Result<(), IngestError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO websites (id, url, disabled) VALUES (?1, ?2, 0)",
            params![id, url],
        )?;
        Ok(())
    }

    /// Soft-delete or restore an endpoint.
    pub fn set_disabled(&self, id: &str, disabled: bool) -> Result<(), IngestError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE websites SET disabled = ?1 WHERE id = ?2",
            params![disabled, id],
        )?;
        if changed == 0 {
            return Err(IngestError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // --- Ticks ---

    /// Record a tick exactly as the prober reported it.
    pub fn add_tick(&self, website_id: &str, tick: &WireTick) -> Result<(), IngestError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ticks (id, website_id, created_at, status, latency) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tick.id, website_id, tick.created_at, tick.status, tick.latency],
        )?;
        Ok(())
    }

    fn load_ticks(conn: &Connection, website_id: &str) -> Result<Vec<WireTick>, IngestError> {
        let mut stmt = conn.prepare(
            "SELECT id, created_at, status, latency FROM ticks WHERE website_id = ?1",
        )?;

        let ticks = stmt
            .query_map(params![website_id], |row| {
                Ok(WireTick {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    status: row.get(2)?,
                    latency: row.get(3)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(ticks)
    }
}

#[async_trait]
impl TickSource for SqliteTickStore {
    async fn fetch_endpoint_ticks(&self, endpoint_id: &str) -> Result<EndpointState, IngestError> {
        let conn = self.lock()?;
        let url: Option<String> = conn
            .query_row(
                "SELECT url FROM websites WHERE id = ?1",
                params![endpoint_id],
                |row| row.get(0),
            )
            .optional()?;

        let url = url.ok_or_else(|| IngestError::NotFound(endpoint_id.to_string()))?;
        let ticks = Self::load_ticks(&conn, endpoint_id)?;

        Ok(WireEndpoint {
            id: endpoint_id.to_string(),
            url,
            ticks: Some(ticks),
        }
        .into_state())
    }

    async fn fetch_all_endpoints(&self) -> Result<Vec<EndpointState>, IngestError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, url FROM websites WHERE disabled = 0 ORDER BY id")?;
        let websites = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqlResult<Vec<_>>>()?;

        let mut endpoints = Vec::with_capacity(websites.len());
        for (id, url) in websites {
            let ticks = Self::load_ticks(&conn, &id)?;
            endpoints.push(
                WireEndpoint {
                    id,
                    url,
                    ticks: Some(ticks),
                }
                .into_state(),
            );
        }

        Ok(endpoints)
    }

    fn description(&self) -> String {
        format!("sqlite: {}", self.path)
    }
}
