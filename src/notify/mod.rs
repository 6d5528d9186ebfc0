// Support-channel notifications for new tickets
//
// Delivery is best effort: the ticket desk logs failures and carries on.

mod twilio;

pub use twilio::TwilioNotifier;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::tickets::Ticket;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, ticket: &Ticket) -> Result<()>;

    fn name(&self) -> &str;
}

/// Message body sent to the support line
pub fn format_notification(ticket: &Ticket) -> String {
    let contact = if ticket.contact.trim().is_empty() {
        "Not provided"
    } else {
        ticket.contact.as_str()
    };

    format!(
        "New Support Ticket #{}\nTitle: {}\nDescription:\n{}\nContact: {}\nOpened at: {}",
        ticket.id,
        ticket.title,
        ticket.description,
        contact,
        ticket.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Used when Twilio credentials are incomplete
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, ticket: &Ticket) -> Result<()> {
        tracing::warn!(
            ticket_id = %ticket.id,
            "Notifications disabled; support line not informed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Pick the notifier the configuration allows
pub fn create_notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    match &config.twilio {
        Some(twilio) => Ok(Box::new(TwilioNotifier::new(
            twilio.clone(),
            config.support_phone_number.clone(),
        )?)),
        None => Ok(Box::new(DisabledNotifier)),
    }
}
