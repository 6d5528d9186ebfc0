// APIMAN - APIHub support assistant
// Library exports

pub mod config;
pub mod conversation;
pub mod dashboard; // Operator analytics over usage logs
pub mod errors;
pub mod keys;
pub mod metrics;
pub mod notify; // Ticket notifications (Twilio WhatsApp)
pub mod providers; // LLM providers
pub mod router;
pub mod server; // HTTP service
pub mod storage; // Document store backends
pub mod tickets;
pub mod users; // Dashboard user registry
