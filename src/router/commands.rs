// Built-in chat commands and their canned responders

use chrono::{Duration, NaiveDate};
use std::fmt::Write;

use crate::keys::KEY_DASHBOARD_URL;
use crate::tickets::Ticket;

const SUBJECT_MAX_CHARS: usize = 50;
const SUBJECT_KEEP_CHARS: usize = 47;

/// Daily request volume shown by the usage statistics command, oldest first
const MOCK_DAILY_REQUESTS: [u32; 7] = [1500, 1800, 2200, 1900, 2500, 2300, 2700];

pub const MANUAL_FORM_REPLY: &str = "Alright, please fill out the details for your support ticket.";
pub const SHOW_KEYS_REPLY: &str = "Enter your User ID to see the API keys you have saved.";

pub const HELP_TEXT: &str = "### APIMAN Commands:
You can ask me to:
- `show recent support tickets` or `show tickets`: See a list of your latest support tickets.
- `show api usage statistics` or `show api stats`: Get an overview of your API consumption.
- `show contact information` or `show contact`: Find ways to reach our support team.
- `apikey` or `get api key`: Get your APIHub API key.
- `show api keys` or `my api keys`: List the API keys you have saved.
- `create manual support ticket` or `new ticket`: Open a form to submit a detailed support ticket.
- And of course, ask any question about APIHub endpoints, authentication, rate limits, errors, and data formats!";

pub const CONTACT_INFO: &str = "### APIHUB Contact Info
- whatsapp community: https://chat.whatsapp.com/J8iljiMAZcvB58RS9GYwjH
- discord community: https://discord.com/invite/Fj28zvaz
- linkedin: https://www.linkedin.com/in/apihub/

### APIMAN Contact Info
- email: apimancompany@gmail.com
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RecentTickets,
    UsageStats,
    ContactInfo,
    ShowApiKeys,
    ApiKeyHelp,
    Help,
    ManualTicket,
}

/// Trigger phrases in priority order
const TRIGGERS: &[(Command, &[&str])] = &[
    (Command::RecentTickets, &["show recent support tickets", "show tickets"]),
    (Command::UsageStats, &["show api usage statistics", "show api stats"]),
    (
        Command::ContactInfo,
        &["show contact information", "show contact", "contact support"],
    ),
    (Command::ShowApiKeys, &["show api keys", "my api keys"]),
    (Command::ApiKeyHelp, &["apikey", "api key", "get api key"]),
    (Command::Help, &["show help", "commands"]),
    (Command::ManualTicket, &["create manual support ticket", "new ticket"]),
];

impl Command {
    /// First command whose trigger appears in the normalized utterance
    pub fn detect(text: &str) -> Option<Command> {
        TRIGGERS
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|phrase| text.contains(phrase)))
            .map(|(command, _)| *command)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::RecentTickets => "recent_tickets",
            Command::UsageStats => "usage_stats",
            Command::ContactInfo => "contact_info",
            Command::ShowApiKeys => "show_api_keys",
            Command::ApiKeyHelp => "api_key_help",
            Command::Help => "help",
            Command::ManualTicket => "manual_ticket",
        }
    }
}

pub fn api_key_help() -> String {
    format!(
        "You can get your API key here: [APIHub Key Dashboard]({})",
        KEY_DASHBOARD_URL
    )
}

/// First line of the title, shortened for the ticket table
pub fn ticket_subject(title: &str) -> String {
    let first_line = title.lines().next().unwrap_or("");
    if first_line.chars().count() > SUBJECT_MAX_CHARS {
        let kept: String = first_line.chars().take(SUBJECT_KEEP_CHARS).collect();
        format!("{}...", kept)
    } else {
        first_line.to_string()
    }
}

/// Markdown table of open tickets, or the reason it could not be built
pub fn recent_tickets<E: std::fmt::Display>(tickets: Result<Vec<Ticket>, E>) -> String {
    let mut out = String::from("### Recent Support Tickets\n");
    match tickets {
        Ok(tickets) if tickets.is_empty() => {
            out.push_str("No open tickets found in the database.\n");
        }
        Ok(tickets) => {
            out.push_str("| ID | Subject | Status | Created |\n");
            out.push_str("|:---|:---|:---|:---|\n");
            for ticket in &tickets {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    ticket.short_id(),
                    ticket_subject(&ticket.title).replace('|', "\\|"),
                    ticket.status.label(),
                    ticket.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Could not load recent tickets: {}", e);
        }
    }
    out
}

/// Static usage overview with a week of request counts ending `today`
pub fn usage_stats(today: NaiveDate) -> String {
    let mut out = String::from("### API Usage Statistics\n");
    out.push_str("Insights into your API consumption (mock data):\n\n");
    out.push_str("**Total Requests (24h):** 1,245,678\n");
    out.push_str("**Avg Latency (ms):** 75\n\n");
    out.push_str("#### Daily Request Volume\n");
    out.push_str("```\n");
    out.push_str("Date          Requests\n");
    out.push_str("----------  ----------\n");

    let days = MOCK_DAILY_REQUESTS.len() as i64;
    for (offset, requests) in MOCK_DAILY_REQUESTS.iter().enumerate() {
        let date = today - Duration::days(days - 1 - offset as i64);
        let _ = writeln!(out, "{}  {}", date.format("%Y-%m-%d"), requests);
    }
    out.push_str("```\n");
    out
}
