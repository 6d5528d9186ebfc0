// Service metrics
// Prometheus counters for chat routing, escalations and collaborator failures

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use sha2::{Digest, Sha256};

/// Counters exposed at /metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    chat_turns: IntCounterVec,
    tickets_created: IntCounterVec,
    notification_failures: IntCounter,
    llm_errors: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("apiman".to_string()), None)
            .context("Failed to create metrics registry")?;

        let chat_turns = IntCounterVec::new(
            Opts::new("chat_turns_total", "Chat turns by routing path"),
            &["path"],
        )?;
        let tickets_created = IntCounterVec::new(
            Opts::new("tickets_created_total", "Support tickets created by reason"),
            &["reason"],
        )?;
        let notification_failures = IntCounter::new(
            "notification_failures_total",
            "Ticket notifications that could not be delivered",
        )?;
        let llm_errors = IntCounter::new("llm_errors_total", "Failed LLM calls")?;

        registry.register(Box::new(chat_turns.clone()))?;
        registry.register(Box::new(tickets_created.clone()))?;
        registry.register(Box::new(notification_failures.clone()))?;
        registry.register(Box::new(llm_errors.clone()))?;

        Ok(Self {
            registry,
            chat_turns,
            tickets_created,
            notification_failures,
            llm_errors,
        })
    }

    pub fn record_turn(&self, path: &str) {
        self.chat_turns.with_label_values(&[path]).inc();
    }

    pub fn record_ticket(&self, reason: &str) {
        self.tickets_created.with_label_values(&[reason]).inc();
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures.inc();
    }

    pub fn record_llm_error(&self) {
        self.llm_errors.inc();
    }

    pub fn turns(&self, path: &str) -> u64 {
        self.chat_turns.with_label_values(&[path]).get()
    }

    pub fn tickets(&self, reason: &str) -> u64 {
        self.tickets_created.with_label_values(&[reason]).get()
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output was not UTF-8")
    }
}

/// Hash an utterance so logs can correlate turns without storing the text
pub fn hash_query(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_query_is_stable_hex() {
        let hash = hash_query("how do i use the weather api");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_query("how do i use the weather api"));
        assert_ne!(hash, hash_query("hi"));
    }

    #[test]
    fn test_render_includes_recorded_counters() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.record_turn("greeting");
        metrics.record_ticket("non_api");
        metrics.record_llm_error();

        let text = metrics.render().unwrap();
        assert!(text.contains("apiman_chat_turns_total{path=\"greeting\"} 1"));
        assert!(text.contains("apiman_tickets_created_total{reason=\"non_api\"} 1"));
        assert!(text.contains("apiman_llm_errors_total 1"));
        assert_eq!(metrics.turns("greeting"), 1);
    }
}
