//! Conversation funnel: greeting → pitch → tariff → email → onboarding
//!
//! The engine keeps per-user state in a [`SessionStore`](crate::store::SessionStore)
//! and turns each inbound [`Event`] into a [`Transition`].

pub mod content;
pub mod engine;
pub mod response;
pub mod types;
pub mod validate;

pub use content::{Content, Links};
pub use engine::{FunnelEngine, FunnelMode};
pub use response::{Button, Effect, Menu, Response, TextFormat, Transition};
pub use types::{Choice, Contact, Event, Profile, Session, State, Tariff, UserId};
pub use validate::{calories, is_valid_email, is_valid_name, parse_measure};
