// Support ticket records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }

    /// Display form used in ticket tables ("Open", "Closed")
    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// A stored support ticket. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub contact: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Last six characters of the id, as shown to users
    pub fn short_id(&self) -> &str {
        let start = self
            .id
            .char_indices()
            .rev()
            .nth(5)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &self.id[start..]
    }

    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }

    /// Hours from creation until closing (or `now` while open), 2 decimals
    pub fn hours_open(&self, now: DateTime<Utc>) -> f64 {
        let end = self.closed_at.unwrap_or(now);
        let hours = (end - self.created_at).num_seconds() as f64 / 3600.0;
        (hours * 100.0).round() / 100.0
    }
}

/// Fields supplied when opening a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub contact: String,
}

impl NewTicket {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            contact: contact.into(),
        }
    }
}
