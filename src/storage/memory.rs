// In-memory document store for tests and local runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ApiKeyStore, TicketStore, UsageStore, UserStore};
use crate::dashboard::UsageLog;
use crate::errors::StoreError;
use crate::keys::{ApiKeyRecord, KeyStatus};
use crate::tickets::{NewTicket, Ticket, TicketStatus};
use crate::users::UserRecord;

#[derive(Default)]
pub struct MemoryStore {
    tickets: RwLock<Vec<Ticket>>,
    keys: RwLock<Vec<ApiKeyRecord>>,
    usage: RwLock<Vec<UsageLog>>,
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ticket_count(&self) -> usize {
        self.tickets.read().await.len()
    }

    /// Every stored ticket in insertion order
    pub async fn all_tickets(&self) -> Vec<Ticket> {
        self.tickets.read().await.clone()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let now = Utc::now();
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
        self.tickets.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tickets.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .rev()
            .filter(|t| t.is_open())
            .cloned()
            .collect())
    }

    async fn closed_tickets(&self, limit: usize) -> Result<Vec<Ticket>, StoreError> {
        let mut closed: Vec<Ticket> = self
            .tickets
            .read()
            .await
            .iter()
            .filter(|t| !t.is_open())
            .cloned()
            .collect();
        closed.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        closed.truncate(limit);
        Ok(closed)
    }

    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
    ) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::TicketNotFound(id.to_string()))?;

        if ticket.status != status {
            let now = Utc::now();
            ticket.status = status;
            ticket.last_updated = now;
            ticket.closed_at = match status {
                TicketStatus::Closed => Some(now),
                TicketStatus::Open => None,
            };
        }
        Ok(ticket.clone())
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn save_user_key(
        &self,
        user_id: &str,
        api_key: &str,
    ) -> Result<ApiKeyRecord, StoreError> {
        let mut keys = self.keys.write().await;
        if let Some(existing) = keys
            .iter_mut()
            .find(|k| k.user_id == user_id && k.api.is_none())
        {
            existing.api_key = api_key.to_string();
            existing.status = KeyStatus::Active;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let record = ApiKeyRecord::user_saved(user_id, api_key);
        keys.push(record.clone());
        Ok(record)
    }

    async fn insert_key(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        self.keys.write().await.push(record);
        Ok(())
    }

    async fn keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        Ok(self
            .keys
            .read()
            .await
            .iter()
            .rev()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_key_status(
        &self,
        key_id: &str,
        status: KeyStatus,
    ) -> Result<ApiKeyRecord, StoreError> {
        let mut keys = self.keys.write().await;
        let record = keys
            .iter_mut()
            .find(|k| k.key_id == key_id)
            .ok_or_else(|| StoreError::KeyNotFound(key_id.to_string()))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn record_usage(&self, log: UsageLog) -> Result<(), StoreError> {
        self.usage.write().await.push(log);
        Ok(())
    }

    async fn usage_between(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageLog>, StoreError> {
        let mut logs: Vec<UsageLog> = self
            .usage
            .read()
            .await
            .iter()
            .filter(|log| start.map_or(true, |start| log.timestamp >= start))
            .filter(|log| end.map_or(true, |end| log.timestamp <= end))
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.timestamp);
        Ok(logs)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.user_id == user.user_id) {
            return Err(StoreError::DuplicateUser(user.user_id));
        }
        users.push(user);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.read().await.clone())
    }
}
