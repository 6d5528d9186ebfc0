// Query routing: verdicts, command dispatch, LLM delegation and escalation

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use super::commands::{self, Command};
use super::phrases;
use super::prompt::SYSTEM_PROMPT;
use crate::conversation::{recent, ChatTurn};
use crate::metrics::{hash_query, ServiceMetrics};
use crate::providers::{LlmProvider, ProviderRequest};
use crate::tickets::{EscalationReason, NewTicket, TicketDesk, ROUTER_CONTACT};

pub const GREETING_REPLY: &str =
    "Hello! I'm APIMAN, your APIHub assistant. How can I help with our APIs today?";
pub const INTRODUCTION_REPLY: &str = "I'm APIMAN, the dedicated assistant for APIHub services. Ask me about our APIs, endpoints, or authentication!";
pub const OUT_OF_SCOPE_REPLY: &str = "I cannot resolve this. A support ticket has been created.";
pub const OUT_OF_SCOPE_NO_TICKET_REPLY: &str =
    "I cannot resolve this. Please contact support directly.";
pub const FAILURE_REPLY: &str = "An error occurred. A support ticket has been created.";
pub const FAILURE_NO_TICKET_REPLY: &str = "An error occurred. Please contact support directly.";

const NON_API_PREFIX: &str = "Non-API Question: ";
const NON_API_TITLE_CHARS: usize = 50;
const FAILURE_PREFIX: &str = "AI Chatbot Failure: ";
const FAILURE_TITLE_CHARS: usize = 30;

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*/?\s*div[^>]*>").expect("Failed to compile markup regex"));

/// Classification of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Greeting,
    Introduction,
    InScope,
    OutOfScope,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Greeting => "greeting",
            Verdict::Introduction => "introduction",
            Verdict::InScope => "in_scope",
            Verdict::OutOfScope => "out_of_scope",
        }
    }
}

/// Something the caller must act on besides showing the reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    TicketCreated {
        ticket_id: String,
        reason: EscalationReason,
    },
    OpenManualTicketForm,
    ShowApiKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteOutcome {
    pub verdict: Verdict,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<SideEffect>,
}

impl RouteOutcome {
    fn reply(verdict: Verdict, reply: impl Into<String>) -> Self {
        Self {
            verdict,
            reply: reply.into(),
            effect: None,
        }
    }

    fn with_effect(mut self, effect: SideEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn ticket_id(&self) -> Option<&str> {
        match &self.effect {
            Some(SideEffect::TicketCreated { ticket_id, .. }) => Some(ticket_id),
            _ => None,
        }
    }
}

/// Lower-case and trim an utterance
pub fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}

/// Verdict implied by the text alone (commands aside)
pub fn classify(text: &str) -> Verdict {
    if phrases::is_greeting(text) {
        Verdict::Greeting
    } else if phrases::is_introduction(text) {
        Verdict::Introduction
    } else if phrases::is_api_related(text) {
        Verdict::InScope
    } else {
        Verdict::OutOfScope
    }
}

/// Remove stray `<div>` tags the model sometimes emits
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").trim().to_string()
}

/// `prefix` + at most `max_chars` of `text`, with "..." when cut
pub fn truncate_title(prefix: &str, text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars).collect();
        format!("{}{}...", prefix, kept)
    } else {
        format!("{}{}", prefix, text)
    }
}

/// Routes user utterances to canned replies, commands, the LLM or a ticket
#[derive(Clone)]
pub struct QueryRouter {
    llm: Arc<dyn LlmProvider>,
    desk: TicketDesk,
    metrics: ServiceMetrics,
    history_window: usize,
    temperature: f32,
}

impl QueryRouter {
    pub fn new(llm: Arc<dyn LlmProvider>, desk: TicketDesk, metrics: ServiceMetrics) -> Self {
        Self {
            llm,
            desk,
            metrics,
            history_window: 5,
            temperature: 0.0,
        }
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Prior turns forwarded to the LLM
    pub fn history_window(&self) -> usize {
        self.history_window
    }

    pub fn desk(&self) -> &TicketDesk {
        &self.desk
    }

    /// Route one utterance. `history` holds the earlier turns only.
    pub async fn route(&self, utterance: &str, history: &[ChatTurn]) -> RouteOutcome {
        let text = normalize(utterance);
        let query_hash = hash_query(&text);

        let (path, outcome) = if phrases::is_greeting(&text) {
            ("greeting", RouteOutcome::reply(Verdict::Greeting, GREETING_REPLY))
        } else if phrases::is_introduction(&text) {
            (
                "introduction",
                RouteOutcome::reply(Verdict::Introduction, INTRODUCTION_REPLY),
            )
        } else if let Some(command) = Command::detect(&text) {
            ("command", self.run_command(command).await)
        } else {
            self.ask_llm(&text, history).await
        };

        self.metrics.record_turn(path);
        tracing::info!(
            query_hash = %query_hash,
            verdict = outcome.verdict.as_str(),
            path,
            ticket_id = outcome.ticket_id().unwrap_or(""),
            "Routed chat turn"
        );
        outcome
    }

    async fn run_command(&self, command: Command) -> RouteOutcome {
        tracing::debug!(command = command.as_str(), "Running chat command");
        let reply = |text: String| RouteOutcome::reply(Verdict::InScope, text);

        match command {
            Command::RecentTickets => reply(commands::recent_tickets(self.desk.open_tickets().await)),
            Command::UsageStats => reply(commands::usage_stats(Utc::now().date_naive())),
            Command::ContactInfo => reply(commands::CONTACT_INFO.to_string()),
            Command::ApiKeyHelp => reply(commands::api_key_help()),
            Command::Help => reply(commands::HELP_TEXT.to_string()),
            Command::ShowApiKeys => {
                reply(commands::SHOW_KEYS_REPLY.to_string()).with_effect(SideEffect::ShowApiKeys)
            }
            Command::ManualTicket => reply(commands::MANUAL_FORM_REPLY.to_string())
                .with_effect(SideEffect::OpenManualTicketForm),
        }
    }

    async fn ask_llm(&self, text: &str, history: &[ChatTurn]) -> (&'static str, RouteOutcome) {
        let mut messages = recent(history, self.history_window).to_vec();
        messages.push(ChatTurn::user(text));
        let request = ProviderRequest::new(messages)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(self.temperature);

        let verdict = classify(text);
        match self.llm.send_message(&request).await {
            Ok(response) => {
                if verdict == Verdict::OutOfScope {
                    // The answer is discarded even when the model produced one
                    let title = truncate_title(NON_API_PREFIX, text, NON_API_TITLE_CHARS);
                    let outcome = self
                        .escalate(
                            NewTicket::new(title, text, ROUTER_CONTACT),
                            EscalationReason::NonApiQuestion,
                            verdict,
                            OUT_OF_SCOPE_REPLY,
                            OUT_OF_SCOPE_NO_TICKET_REPLY,
                        )
                        .await;
                    ("non_api_ticket", outcome)
                } else {
                    (
                        "llm_answer",
                        RouteOutcome::reply(verdict, strip_markup(&response.text)),
                    )
                }
            }
            Err(e) => {
                self.metrics.record_llm_error();
                tracing::error!(provider = self.llm.name(), "LLM call failed: {:#}", e);

                let title = truncate_title(FAILURE_PREFIX, text, FAILURE_TITLE_CHARS);
                let description = format!("Error while processing: {}\n\nError: {}", text, e);
                let outcome = self
                    .escalate(
                        NewTicket::new(title, description, ROUTER_CONTACT),
                        EscalationReason::LlmFailure,
                        verdict,
                        FAILURE_REPLY,
                        FAILURE_NO_TICKET_REPLY,
                    )
                    .await;
                ("llm_failure", outcome)
            }
        }
    }

    async fn escalate(
        &self,
        ticket: NewTicket,
        reason: EscalationReason,
        verdict: Verdict,
        created_reply: &str,
        failed_reply: &str,
    ) -> RouteOutcome {
        match self.desk.create(ticket, reason).await {
            Ok(ticket) => RouteOutcome::reply(verdict, created_reply).with_effect(
                SideEffect::TicketCreated {
                    ticket_id: ticket.id,
                    reason,
                },
            ),
            Err(e) => {
                tracing::error!(reason = %reason, "Failed to create support ticket: {}", e);
                RouteOutcome::reply(verdict, failed_reply)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::notify::Notifier;
    use crate::providers::ProviderResponse;
    use crate::storage::{MemoryStore, TicketStore};
    use crate::tickets::{Ticket, TicketStatus};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed answer (or fails) and records every request
    struct ScriptedLlm {
        answer: Option<String>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedLlm {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.answer {
                Some(text) => Ok(ProviderResponse {
                    id: "resp-1".to_string(),
                    model: "scripted".to_string(),
                    text: text.clone(),
                    stop_reason: Some("stop".to_string()),
                    provider: "scripted".to_string(),
                }),
                None => anyhow::bail!("connection refused"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted"
        }
    }

    struct QuietNotifier;

    #[async_trait]
    impl Notifier for QuietNotifier {
        async fn notify(&self, _ticket: &Ticket) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "quiet"
        }
    }

    /// Ticket store that is always down
    struct BrokenStore;

    #[async_trait]
    impl TicketStore for BrokenStore {
        async fn insert_ticket(&self, _ticket: NewTicket) -> Result<Ticket, StoreError> {
            Err(StoreError::Task("store offline".to_string()))
        }

        async fn get_ticket(&self, _id: &str) -> Result<Option<Ticket>, StoreError> {
            Err(StoreError::Task("store offline".to_string()))
        }

        async fn open_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
            Err(StoreError::Task("store offline".to_string()))
        }

        async fn closed_tickets(&self, _limit: usize) -> Result<Vec<Ticket>, StoreError> {
            Err(StoreError::Task("store offline".to_string()))
        }

        async fn update_ticket_status(
            &self,
            id: &str,
            _status: TicketStatus,
        ) -> Result<Ticket, StoreError> {
            Err(StoreError::TicketNotFound(id.to_string()))
        }
    }

    fn router_with(llm: Arc<ScriptedLlm>) -> (QueryRouter, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let metrics = ServiceMetrics::new().unwrap();
        let desk = TicketDesk::new(store.clone(), Arc::new(QuietNotifier), metrics.clone());
        (QueryRouter::new(llm, desk, metrics), store)
    }

    fn broken_router(llm: Arc<ScriptedLlm>) -> QueryRouter {
        let metrics = ServiceMetrics::new().unwrap();
        let desk = TicketDesk::new(Arc::new(BrokenStore), Arc::new(QuietNotifier), metrics.clone());
        QueryRouter::new(llm, desk, metrics)
    }

    #[tokio::test]
    async fn test_hi_gets_greeting_without_llm_or_ticket() {
        let llm = ScriptedLlm::answering("unused");
        let (router, store) = router_with(llm.clone());

        let outcome = router.route("hi", &[]).await;

        assert_eq!(outcome.verdict, Verdict::Greeting);
        assert_eq!(outcome.reply, GREETING_REPLY);
        assert!(outcome.effect.is_none());
        assert_eq!(llm.calls(), 0);
        assert_eq!(store.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn test_introduction_question() {
        let llm = ScriptedLlm::answering("unused");
        let (router, store) = router_with(llm.clone());

        let outcome = router.route("  Who are you?  ", &[]).await;

        assert_eq!(outcome.verdict, Verdict::Introduction);
        assert_eq!(outcome.reply, INTRODUCTION_REPLY);
        assert_eq!(llm.calls(), 0);
        assert_eq!(store.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn test_cats_question_is_escalated() {
        let llm = ScriptedLlm::answering("Cats are lovely pets.");
        let (router, store) = router_with(llm.clone());

        let outcome = router.route("tell me about cats", &[]).await;

        assert_eq!(llm.calls(), 1);
        assert_eq!(outcome.verdict, Verdict::OutOfScope);
        assert_eq!(outcome.reply, OUT_OF_SCOPE_REPLY);
        let tickets = store.all_tickets().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "Non-API Question: tell me about cats");
        assert_eq!(tickets[0].description, "tell me about cats");
        assert_eq!(tickets[0].contact, ROUTER_CONTACT);
        assert_eq!(outcome.ticket_id(), Some(tickets[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_long_off_topic_title_is_truncated() {
        let llm = ScriptedLlm::answering("whatever");
        let (router, store) = router_with(llm);
        let question = "could you recommend a nice restaurant somewhere near the old town square";

        router.route(question, &[]).await;

        let title = &store.all_tickets().await[0].title;
        let expected: String = question.chars().take(50).collect();
        assert_eq!(title, &format!("Non-API Question: {}...", expected));
    }

    #[tokio::test]
    async fn test_api_question_returns_stripped_answer() {
        let llm = ScriptedLlm::answering(
            "<div>Send your key in the Authorization header.</div>\n",
        );
        let (router, store) = router_with(llm);

        let outcome = router
            .route("How do I authenticate with the Image API", &[])
            .await;

        assert_eq!(outcome.verdict, Verdict::InScope);
        assert_eq!(outcome.reply, "Send your key in the Authorization header.");
        assert!(outcome.effect.is_none());
        assert_eq!(store.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn test_llm_failure_opens_one_ticket() {
        let (router, store) = router_with(ScriptedLlm::failing());
        let question = "why does the weather api return 500 for paris";

        let outcome = router.route(question, &[]).await;

        assert_eq!(outcome.reply, FAILURE_REPLY);
        assert!(matches!(
            outcome.effect,
            Some(SideEffect::TicketCreated {
                reason: EscalationReason::LlmFailure,
                ..
            })
        ));
        let tickets = store.all_tickets().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "AI Chatbot Failure: why does the weather api retur...");
        assert!(tickets[0]
            .description
            .starts_with(&format!("Error while processing: {}\n\nError: ", question)));
        assert!(tickets[0].description.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_store_down_falls_back_to_contact_support() {
        let router = broken_router(ScriptedLlm::answering("cats!"));
        let outcome = router.route("tell me about cats", &[]).await;
        assert_eq!(outcome.reply, OUT_OF_SCOPE_NO_TICKET_REPLY);
        assert!(outcome.effect.is_none());

        let router = broken_router(ScriptedLlm::failing());
        let outcome = router.route("explain the jokes api", &[]).await;
        assert_eq!(outcome.reply, FAILURE_NO_TICKET_REPLY);
    }

    #[tokio::test]
    async fn test_history_window_is_capped() {
        let llm = ScriptedLlm::answering("Use GET /jokesapi");
        let (router, _) = router_with(llm.clone());
        let history: Vec<ChatTurn> = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("q{}", i))
                } else {
                    ChatTurn::assistant(format!("a{}", i))
                }
            })
            .collect();

        router.route("Which endpoint returns a joke?", &history).await;

        let requests = llm.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.system.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(sent.messages.len(), 6);
        assert_eq!(sent.messages[0], ChatTurn::assistant("a3"));
        assert_eq!(sent.messages[5], ChatTurn::user("which endpoint returns a joke?"));
        assert_eq!(sent.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_commands_never_create_tickets() {
        let llm = ScriptedLlm::answering("unused");
        let (router, store) = router_with(llm.clone());

        let outcome = router.route("show tickets", &[]).await;
        assert!(outcome.reply.contains("No open tickets found in the database."));

        let outcome = router.route("new ticket", &[]).await;
        assert_eq!(outcome.effect, Some(SideEffect::OpenManualTicketForm));

        let outcome = router.route("show api keys", &[]).await;
        assert_eq!(outcome.effect, Some(SideEffect::ShowApiKeys));

        let outcome = router.route("get api key", &[]).await;
        assert!(outcome.reply.contains("https://www.apihub.digital/dashboard/getkey"));

        assert_eq!(llm.calls(), 0);
        assert_eq!(store.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn test_ticket_table_failure_is_inline() {
        let router = broken_router(ScriptedLlm::answering("unused"));
        let outcome = router.route("show recent support tickets", &[]).await;
        assert!(outcome
            .reply
            .contains("Could not load recent tickets: storage task failed: store offline"));
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("P: ", "short", 30), "P: short");
        assert_eq!(truncate_title("P: ", &"a".repeat(31), 30), format!("P: {}...", "a".repeat(30)));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<DIV class=\"x\">Hello</ div >"), "Hello");
        assert_eq!(strip_markup("  plain  "), "plain");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("hey"), Verdict::Greeting);
        assert_eq!(classify("what can you do"), Verdict::Introduction);
        assert_eq!(classify("list endpoints"), Verdict::InScope);
        assert_eq!(classify("tell me about cats"), Verdict::OutOfScope);
    }
}
