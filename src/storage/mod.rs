// Document store collaborators
//
// Tickets, API keys, users and usage logs live behind async traits so the service
// can run against SQLite in production and an in-memory store in tests.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dashboard::UsageLog;
use crate::errors::StoreError;
use crate::keys::{ApiKeyRecord, KeyStatus};
use crate::tickets::{NewTicket, Ticket, TicketStatus};
use crate::users::UserRecord;

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Store a new open ticket and return it with its assigned id
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Open tickets, newest first
    async fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError>;

    /// Closed tickets, most recently closed first
    async fn closed_tickets(&self, limit: usize) -> Result<Vec<Ticket>, StoreError>;

    /// Set the status of a ticket. Re-applying the current status changes nothing.
    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
    ) -> Result<Ticket, StoreError>;
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Replace the user's saved key, or create it
    async fn save_user_key(&self, user_id: &str, api_key: &str)
        -> Result<ApiKeyRecord, StoreError>;

    async fn insert_key(&self, record: ApiKeyRecord) -> Result<(), StoreError>;

    /// Every key owned by a user, newest first
    async fn keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError>;

    async fn set_key_status(
        &self,
        key_id: &str,
        status: KeyStatus,
    ) -> Result<ApiKeyRecord, StoreError>;
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record_usage(&self, log: UsageLog) -> Result<(), StoreError>;

    /// Logs with `start <= timestamp <= end`; open bounds when None
    async fn usage_between(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageLog>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateUser` when the user id is taken
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError>;

    /// Every user, oldest first
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}

/// Everything the service needs from one backing store
pub trait DocumentStore: TicketStore + ApiKeyStore + UsageStore + UserStore {}

impl<T> DocumentStore for T where T: TicketStore + ApiKeyStore + UsageStore + UserStore {}
