// Ticket desk: stores escalations and tells the support line about them

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::errors::{ServiceError, StoreError};
use crate::metrics::ServiceMetrics;
use crate::notify::Notifier;
use crate::storage::TicketStore;

use super::types::{NewTicket, Ticket, TicketStatus};

/// Contact recorded on tickets the router opens
pub const ROUTER_CONTACT: &str = "anonymous user";
/// Contact recorded when the manual form leaves it blank
pub const MANUAL_CONTACT: &str = "anonymous";
/// Closed tickets shown in the operator view
pub const RECENTLY_CLOSED_LIMIT: usize = 20;

const MANUAL_TICKET_INCOMPLETE: &str =
    "Please provide both a Subject and a Full Description for the ticket.";

/// Why a ticket was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscalationReason {
    #[serde(rename = "non_api")]
    NonApiQuestion,
    #[serde(rename = "llm_failure")]
    LlmFailure,
    #[serde(rename = "manual")]
    Manual,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::NonApiQuestion => "non_api",
            EscalationReason::LlmFailure => "llm_failure",
            EscalationReason::Manual => "manual",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct TicketDesk {
    store: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
    metrics: ServiceMetrics,
}

impl TicketDesk {
    pub fn new(
        store: Arc<dyn TicketStore>,
        notifier: Arc<dyn Notifier>,
        metrics: ServiceMetrics,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics,
        }
    }

    /// Store a ticket, then notify the support line.
    ///
    /// A failed notification is logged and does not undo the ticket.
    pub async fn create(
        &self,
        ticket: NewTicket,
        reason: EscalationReason,
    ) -> Result<Ticket, StoreError> {
        let stored = self.store.insert_ticket(ticket).await?;
        self.metrics.record_ticket(reason.as_str());
        tracing::info!(ticket_id = %stored.id, reason = %reason, "Support ticket created");

        if let Err(e) = self.notifier.notify(&stored).await {
            self.metrics.record_notification_failure();
            tracing::warn!(
                ticket_id = %stored.id,
                notifier = self.notifier.name(),
                "Failed to send ticket notification: {:#}",
                e
            );
        }

        Ok(stored)
    }

    /// Open a ticket from the manual form
    pub async fn submit_manual(
        &self,
        subject: &str,
        description: &str,
        contact: Option<&str>,
    ) -> Result<Ticket, ServiceError> {
        if subject.trim().is_empty() || description.trim().is_empty() {
            return Err(ServiceError::Validation(MANUAL_TICKET_INCOMPLETE.to_string()));
        }

        let contact = contact
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(MANUAL_CONTACT);
        let ticket = NewTicket::new(subject, description, contact);
        Ok(self.create(ticket, EscalationReason::Manual).await?)
    }

    /// Close a ticket. Closing twice returns the already-closed ticket.
    pub async fn close(&self, id: &str) -> Result<Ticket, StoreError> {
        let ticket = self
            .store
            .update_ticket_status(id, TicketStatus::Closed)
            .await?;
        tracing::info!(ticket_id = %ticket.id, "Ticket closed");
        Ok(ticket)
    }

    pub async fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        self.store.open_tickets().await
    }

    pub async fn recently_closed(&self, limit: usize) -> Result<Vec<Ticket>, StoreError> {
        self.store.closed_tickets(limit).await
    }
}

/// Chat reply after a manual ticket is filed
pub fn manual_ticket_reply(ticket: &Ticket) -> String {
    format!(
        "Manual ticket #{} has been created. Our team will get back to you shortly.",
        ticket.id
    )
}
