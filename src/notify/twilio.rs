// WhatsApp delivery through the Twilio Messages API

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{format_notification, Notifier};
use crate::config::TwilioConfig;
use crate::tickets::Ticket;

const TWILIO_API_BASE: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub struct TwilioNotifier {
    client: Client,
    credentials: TwilioConfig,
    to_number: String,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(credentials: TwilioConfig, to_number: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
            to_number,
            base_url: TWILIO_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        )
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, ticket: &Ticket) -> Result<()> {
        let body = format_notification(ticket);
        let from = whatsapp_address(&self.credentials.from_number);
        let to = whatsapp_address(&self.to_number);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body.as_str())])
            .send()
            .await
            .context("Failed to send request to Twilio")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Twilio message request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        tracing::info!(ticket_id = %ticket.id, "Support line notified");
        Ok(())
    }

    fn name(&self) -> &str {
        "twilio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::TicketStatus;
    use chrono::Utc;
    use mockito::Matcher;

    fn credentials() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+14155238886".to_string(),
        }
    }

    fn ticket() -> Ticket {
        let now = Utc::now();
        Ticket {
            id: "abc123".to_string(),
            title: "AI Chatbot Failure: weather api".to_string(),
            description: "Error while processing".to_string(),
            contact: "anonymous user".to_string(),
            status: TicketStatus::Open,
            created_at: now,
            last_updated: now,
            closed_at: None,
        }
    }

    #[test]
    fn test_whatsapp_prefix_added_once() {
        assert_eq!(whatsapp_address("+15550001111"), "whatsapp:+15550001111");
        assert_eq!(whatsapp_address("whatsapp:+1555"), "whatsapp:+1555");
    }

    #[tokio::test]
    async fn test_notify_posts_whatsapp_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("From".to_string(), "whatsapp:+14155238886".to_string()),
                Matcher::UrlEncoded("To".to_string(), "whatsapp:+15550001111".to_string()),
                Matcher::Regex("New\\+Support\\+Ticket".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"sid":"SM1"}"#)
            .create_async()
            .await;

        let notifier = TwilioNotifier::new(credentials(), "+15550001111".to_string())
            .unwrap()
            .with_base_url(server.url());
        notifier.notify(&ticket()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .with_status(400)
            .with_body(r#"{"message":"Invalid To number"}"#)
            .create_async()
            .await;

        let notifier = TwilioNotifier::new(credentials(), "bogus".to_string())
            .unwrap()
            .with_base_url(server.url());
        let err = notifier.notify(&ticket()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid To number"));
    }
}
