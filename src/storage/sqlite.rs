// SQLite document store
//
// rusqlite is synchronous, so every query runs on the blocking pool behind a
// shared connection.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{ApiKeyStore, TicketStore, UsageStore, UserStore};
use crate::dashboard::UsageLog;
use crate::errors::StoreError;
use crate::keys::{ApiKeyRecord, KeyStatus};
use crate::tickets::{NewTicket, Ticket, TicketStatus};
use crate::users::UserRecord;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    contact TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    closed_at TEXT
);
CREATE TABLE IF NOT EXISTS api_keys (
    key_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    api TEXT,
    api_key TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    expires_at TEXT
);
CREATE TABLE IF NOT EXISTS usage_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    api TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    user_id TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    country TEXT NOT NULL,
    api_version TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    latency_ms REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets (status, created_at);
CREATE INDEX IF NOT EXISTS idx_api_keys_user ON api_keys (user_id);
CREATE INDEX IF NOT EXISTS idx_usage_logs_timestamp ON usage_logs (timestamp);
";

const TICKET_COLUMNS: &str =
    "id, title, description, contact, status, created_at, last_updated, closed_at";
const KEY_COLUMNS: &str =
    "key_id, user_id, api, api_key, status, created_at, updated_at, expires_at";

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed(format!("timestamp {:?}: {}", raw, e)))
}

fn decode_optional_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.as_deref().map(decode_time).transpose()
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Task(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn ticket_from_row(row: &Row<'_>) -> Result<Ticket, StoreError> {
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let last_updated: String = row.get(6)?;
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        contact: row.get(3)?,
        status: status.parse().map_err(StoreError::Malformed)?,
        created_at: decode_time(&created_at)?,
        last_updated: decode_time(&last_updated)?,
        closed_at: decode_optional_time(row.get(7)?)?,
    })
}

fn key_from_row(row: &Row<'_>) -> Result<ApiKeyRecord, StoreError> {
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(ApiKeyRecord {
        key_id: row.get(0)?,
        user_id: row.get(1)?,
        api: row.get(2)?,
        api_key: row.get(3)?,
        status: status.parse().map_err(StoreError::Malformed)?,
        created_at: decode_time(&created_at)?,
        updated_at: decode_time(&updated_at)?,
        expires_at: decode_optional_time(row.get(7)?)?,
    })
}

fn usage_from_row(row: &Row<'_>) -> Result<UsageLog, StoreError> {
    let timestamp: String = row.get(1)?;
    let status_code: i64 = row.get(3)?;
    Ok(UsageLog {
        api: row.get(0)?,
        timestamp: decode_time(&timestamp)?,
        user_id: row.get(2)?,
        status_code: u16::try_from(status_code)
            .map_err(|_| StoreError::Malformed(format!("status code {}", status_code)))?,
        country: row.get(4)?,
        api_version: row.get(5)?,
        endpoint: row.get(6)?,
        latency_ms: row.get(7)?,
    })
}

fn user_from_row(row: &Row<'_>) -> Result<UserRecord, StoreError> {
    let role: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let last_login: String = row.get(4)?;
    Ok(UserRecord {
        user_id: row.get(0)?,
        email: row.get(1)?,
        role: role.parse().map_err(StoreError::Malformed)?,
        created_at: decode_time(&created_at)?,
        last_login: decode_time(&last_login)?,
    })
}

fn query_tickets(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Ticket>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tickets = Vec::new();
    while let Some(row) = rows.next()? {
        tickets.push(ticket_from_row(row)?);
    }
    Ok(tickets)
}

fn fetch_ticket(conn: &Connection, id: &str) -> Result<Option<Ticket>, StoreError> {
    let sql = format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS);
    Ok(query_tickets(conn, &sql, params![id])?.into_iter().next())
}

fn fetch_key(conn: &Connection, key_id: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
    let sql = format!("SELECT {} FROM api_keys WHERE key_id = ?1", KEY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![key_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(key_from_row(row)?)),
        None => Ok(None),
    }
}

fn write_key(conn: &Connection, record: &ApiKeyRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO api_keys (key_id, user_id, api, api_key, status, created_at, updated_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.key_id,
            record.user_id,
            record.api,
            record.api_key,
            record.status.as_str(),
            encode_time(record.created_at),
            encode_time(record.updated_at),
            record.expires_at.map(encode_time),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl TicketStore for SqliteStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let now = Utc::now().trunc_subsecs(6);
        let stored = Ticket {
            id: Uuid::new_v4().simple().to_string(),
            title: ticket.title,
            description: ticket.description,
            contact: ticket.contact,
            status: TicketStatus::Open,
            created_at: now,
            last_updated: now,
            closed_at: None,
        };

        let row = stored.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tickets (id, title, description, contact, status, created_at, last_updated, closed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
                params![
                    row.id,
                    row.title,
                    row.description,
                    row.contact,
                    row.status.as_str(),
                    encode_time(row.created_at),
                    encode_time(row.last_updated),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| fetch_ticket(conn, &id)).await
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tickets WHERE status = ?1 ORDER BY created_at DESC, rowid DESC",
                TICKET_COLUMNS
            );
            query_tickets(conn, &sql, params![TicketStatus::Open.as_str()])
        })
        .await
    }

    async fn closed_tickets(&self, limit: usize) -> Result<Vec<Ticket>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM tickets WHERE status = ?1 ORDER BY closed_at DESC, rowid DESC LIMIT ?2",
                TICKET_COLUMNS
            );
            query_tickets(conn, &sql, params![TicketStatus::Closed.as_str(), limit])
        })
        .await
    }

    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
    ) -> Result<Ticket, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let current =
                fetch_ticket(conn, &id)?.ok_or_else(|| StoreError::TicketNotFound(id.clone()))?;
            if current.status == status {
                return Ok(current);
            }

            let now = encode_time(Utc::now());
            let closed_at = match status {
                TicketStatus::Closed => Some(now.clone()),
                TicketStatus::Open => None,
            };
            conn.execute(
                "UPDATE tickets SET status = ?1, last_updated = ?2, closed_at = ?3 WHERE id = ?4",
                params![status.as_str(), now, closed_at, id],
            )?;

            fetch_ticket(conn, &id)?.ok_or(StoreError::TicketNotFound(id))
        })
        .await
    }
}

#[async_trait]
impl ApiKeyStore for SqliteStore {
    async fn save_user_key(
        &self,
        user_id: &str,
        api_key: &str,
    ) -> Result<ApiKeyRecord, StoreError> {
        let fresh = ApiKeyRecord::user_saved(user_id, api_key);
        self.with_conn(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT key_id FROM api_keys WHERE user_id = ?1 AND api IS NULL",
                    params![fresh.user_id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(key_id) => {
                    conn.execute(
                        "UPDATE api_keys SET api_key = ?1, status = ?2, updated_at = ?3 WHERE key_id = ?4",
                        params![
                            fresh.api_key,
                            KeyStatus::Active.as_str(),
                            encode_time(fresh.updated_at),
                            key_id,
                        ],
                    )?;
                    fetch_key(conn, &key_id)?.ok_or(StoreError::KeyNotFound(key_id))
                }
                None => {
                    write_key(conn, &fresh)?;
                    Ok(fresh)
                }
            }
        })
        .await
    }

    async fn insert_key(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        self.with_conn(move |conn| write_key(conn, &record)).await
    }

    async fn keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM api_keys WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                KEY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![user_id])?;
            let mut keys = Vec::new();
            while let Some(row) = rows.next()? {
                keys.push(key_from_row(row)?);
            }
            Ok(keys)
        })
        .await
    }

    async fn set_key_status(
        &self,
        key_id: &str,
        status: KeyStatus,
    ) -> Result<ApiKeyRecord, StoreError> {
        let key_id = key_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE api_keys SET status = ?1, updated_at = ?2 WHERE key_id = ?3",
                params![status.as_str(), encode_time(Utc::now()), key_id],
            )?;
            if changed == 0 {
                return Err(StoreError::KeyNotFound(key_id));
            }
            fetch_key(conn, &key_id)?.ok_or(StoreError::KeyNotFound(key_id))
        })
        .await
    }
}

#[async_trait]
impl UsageStore for SqliteStore {
    async fn record_usage(&self, log: UsageLog) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO usage_logs (api, timestamp, user_id, status_code, country, api_version, endpoint, latency_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    log.api,
                    encode_time(log.timestamp),
                    log.user_id,
                    i64::from(log.status_code),
                    log.country,
                    log.api_version,
                    log.endpoint,
                    log.latency_ms,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn usage_between(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageLog>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT api, timestamp, user_id, status_code, country, api_version, endpoint, latency_ms
                 FROM usage_logs
                 WHERE (?1 IS NULL OR timestamp >= ?1) AND (?2 IS NULL OR timestamp <= ?2)
                 ORDER BY timestamp",
            )?;
            let mut rows = stmt.query(params![start.map(encode_time), end.map(encode_time)])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(usage_from_row(row)?);
            }
            Ok(logs)
        })
        .await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let taken: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM users WHERE user_id = ?1",
                    params![user.user_id],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::DuplicateUser(user.user_id));
            }

            conn.execute(
                "INSERT INTO users (user_id, email, role, created_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.user_id,
                    user.email,
                    user.role.as_str(),
                    encode_time(user.created_at),
                    encode_time(user.last_login),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, email, role, created_at, last_login
                 FROM users ORDER BY created_at, rowid",
            )?;
            let mut rows = stmt.query([])?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(user_from_row(row)?);
            }
            Ok(users)
        })
        .await
    }
}
