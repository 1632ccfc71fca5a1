//! Funnel state machine
//!
//! Maps `(session state, event)` to the next state, one response and at most one
//! effect. Never talks to Telegram or to lead storage; the caller does that with
//! the returned [`Transition`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::content::Content;
use super::response::{Effect, Response, Transition};
use super::types::{Choice, Contact, Event, Session, State, Tariff};
use super::validate::{calories, is_valid_email, is_valid_name, parse_measure};
use crate::leads::LeadRecord;
use crate::store::SessionStore;

const MIN_HEIGHT_CM: f64 = 100.0;
const MAX_HEIGHT_CM: f64 = 250.0;
const MIN_WEIGHT_KG: f64 = 30.0;
const MAX_WEIGHT_KG: f64 = 300.0;

/// What happens after a tariff is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelMode {
    /// Ask for an email and finish.
    #[default]
    EmailCapture,
    /// Self-reported payment, then name/height/weight. Payment is never verified.
    PaymentGate,
}

pub struct FunnelEngine<S> {
    store: S,
    content: Content,
    mode: FunnelMode,
}

impl<S: SessionStore> FunnelEngine<S> {
    pub fn new(store: S, content: Content, mode: FunnelMode) -> Self {
        Self {
            store,
            content,
            mode,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handle_event(&self, contact: &Contact, event: Event) -> Transition {
        self.handle_event_at(contact, event, Utc::now())
    }

    /// Events for one user must be applied in arrival order, one at a time.
    pub fn handle_event_at(&self, contact: &Contact, event: Event, now: DateTime<Utc>) -> Transition {
        let mut session = self.store.get(contact.id);
        let from = session.state;

        let (response, effect) = self.step(&mut session, contact, event, now);

        session.updated_at = now;
        let state = session.state;
        self.store.put(session);

        debug!(
            user_id = %contact.id,
            from = %from,
            to = %state,
            finalized = effect.is_some(),
            "Funnel transition"
        );

        Transition {
            from,
            state,
            response,
            effect,
        }
    }

    fn step(
        &self,
        session: &mut Session,
        contact: &Contact,
        event: Event,
        now: DateTime<Utc>,
    ) -> (Response, Option<Effect>) {
        match event {
            Event::Restart => self.greet(session),
            _ if session.state == State::Idle => self.greet(session),
            Event::Select(choice) => (self.on_select(session, choice), None),
            Event::Text(text) => self.on_text(session, contact, text.trim(), now),
        }
    }

    fn greet(&self, session: &mut Session) -> (Response, Option<Effect>) {
        session.begin_run();
        (self.content.greeting(), None)
    }

    fn on_select(&self, session: &mut Session, choice: Choice) -> Response {
        let state = session.state;
        match choice {
            Choice::Join | Choice::Tariffs | Choice::Reviews | Choice::Back
                if state.is_navigable() =>
            {
                if state == State::Completed {
                    session.begin_run();
                }
                match choice {
                    Choice::Join => self.content.project(),
                    Choice::Tariffs => self.content.tariffs(),
                    Choice::Reviews => self.content.reviews(),
                    _ => self.content.explore(),
                }
            }
            Choice::Tariff(tariff) if state.is_navigable() => self.select_tariff(session, tariff),
            Choice::Cancel if state.is_cancellable() => {
                session.begin_run();
                self.content.cancelled()
            }
            Choice::Paid if state == State::AwaitingPayment => {
                session.state = State::AwaitingName;
                self.content.name_prompt()
            }
            Choice::Continue if state == State::Completed => self.content.onboarding(),
            _ => self.content.fallback(),
        }
    }

    fn select_tariff(&self, session: &mut Session, tariff: Tariff) -> Response {
        if session.state == State::Completed {
            session.begin_run();
        }
        session.selected_tariff = Some(tariff);
        match self.mode {
            FunnelMode::EmailCapture => {
                session.state = State::AwaitingEmail;
                self.content.email_prompt()
            }
            FunnelMode::PaymentGate => {
                session.state = State::AwaitingPayment;
                self.content.payment_prompt(tariff)
            }
        }
    }

    fn on_text(
        &self,
        session: &mut Session,
        contact: &Contact,
        text: &str,
        now: DateTime<Utc>,
    ) -> (Response, Option<Effect>) {
        match session.state {
            State::AwaitingEmail => self.capture_email(session, contact, text, now),
            State::AwaitingName => {
                if !is_valid_name(text) {
                    return (self.content.invalid_name(), None);
                }
                session.profile.name = Some(text.to_string());
                session.state = State::AwaitingHeight;
                (self.content.height_prompt(), None)
            }
            State::AwaitingHeight => {
                match parse_measure(text).filter(|h| (MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(h)) {
                    Some(height) => {
                        session.profile.height_cm = Some(height);
                        session.state = State::AwaitingWeight;
                        (self.content.weight_prompt(), None)
                    }
                    None => (self.content.invalid_measure(), None),
                }
            }
            State::AwaitingWeight => self.capture_weight(session, contact, text, now),
            _ => (self.content.fallback(), None),
        }
    }

    fn capture_email(
        &self,
        session: &mut Session,
        contact: &Contact,
        text: &str,
        now: DateTime<Utc>,
    ) -> (Response, Option<Effect>) {
        let Some(tariff) = session.selected_tariff else {
            // unreachable while the engine is the only writer
            session.begin_run();
            return (self.content.fallback(), None);
        };
        if !is_valid_email(text) {
            return (self.content.invalid_email(), None);
        }

        session.email = Some(text.to_string());
        session.state = State::Completed;

        let record = LeadRecord::from_session(contact, session, tariff, now);
        (
            self.content.confirmation(tariff),
            Some(Effect::FinalizeLead(record)),
        )
    }

    fn capture_weight(
        &self,
        session: &mut Session,
        contact: &Contact,
        text: &str,
        now: DateTime<Utc>,
    ) -> (Response, Option<Effect>) {
        let weight = parse_measure(text).filter(|w| (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(w));
        let (Some(weight), Some(height), Some(tariff)) =
            (weight, session.profile.height_cm, session.selected_tariff)
        else {
            return (self.content.invalid_measure(), None);
        };

        session.profile.weight_kg = Some(weight);
        session.state = State::Completed;

        let name = session.profile.name.clone().unwrap_or_default();
        let kcal = calories(height, weight);
        let record = LeadRecord::from_session(contact, session, tariff, now);
        (
            self.content.profile_done(&name, kcal),
            Some(Effect::FinalizeLead(record)),
        )
    }
}
