//! Fitness Funnel Bot Library
//!
//! A Telegram marketing funnel for a fitness coaching project:
//! - Conversation state machine: greeting, pitch, tariffs, reviews, email capture
//! - Optional self-reported payment step with a calorie estimate
//! - Lead persistence to CSV or MySQL with an explicit failure policy
//! - Health and Prometheus endpoint plus a keep-alive pinger for free hosting

pub mod bot;
pub mod config;
pub mod console;
pub mod error;
pub mod funnel;
pub mod health;
pub mod keepalive;
pub mod leads;
pub mod store;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use funnel::{Contact, Event, FunnelEngine, FunnelMode, Response, State, Tariff, Transition};
pub use leads::{LeadRecord, LeadRecorder, LeadSink, PersistencePolicy};
pub use store::{InMemorySessionStore, SessionStore};
