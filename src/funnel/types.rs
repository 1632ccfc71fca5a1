//! Session, event and selection types of the funnel

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Opaque chat-platform user identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent an event. Only `id` keys the session; the rest lands in the lead record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl Contact {
    pub fn new(id: i64) -> Self {
        Self {
            id: UserId(id),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        let username = username.strip_prefix('@').unwrap_or(username);
        self.username = Some(username.to_string());
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }
}

/// The three subscription offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tariff {
    #[serde(rename = "15-day")]
    FifteenDays,
    #[serde(rename = "30-day")]
    OneMonth,
    #[serde(rename = "90-day")]
    ThreeMonths,
}

impl Tariff {
    pub const ALL: [Tariff; 3] = [Tariff::FifteenDays, Tariff::OneMonth, Tariff::ThreeMonths];

    /// Selection identifier carried by the tariff button.
    pub fn id(self) -> &'static str {
        match self {
            Tariff::FifteenDays => "tariff_15",
            Tariff::OneMonth => "tariff_30",
            Tariff::ThreeMonths => "tariff_90",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Canonical value stored in the session.
    pub fn code(self) -> &'static str {
        match self {
            Tariff::FifteenDays => "15-day",
            Tariff::OneMonth => "30-day",
            Tariff::ThreeMonths => "90-day",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tariff::FifteenDays => "15 дней (1990 ₽)",
            Tariff::OneMonth => "1 месяц (3000 ₽)",
            Tariff::ThreeMonths => "3 месяца (6990 ₽)",
        }
    }

    pub fn price_rub(self) -> u32 {
        match self {
            Tariff::FifteenDays => 1990,
            Tariff::OneMonth => 3000,
            Tariff::ThreeMonths => 6990,
        }
    }

    /// Duration phrase substituted into the confirmation message.
    pub fn duration(self) -> &'static str {
        match self {
            Tariff::FifteenDays => "15 дней",
            Tariff::OneMonth => "1 месяц",
            Tariff::ThreeMonths => "3 месяца",
        }
    }
}

impl fmt::Display for Tariff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A button's selection identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Choice {
    Join,
    Tariffs,
    Reviews,
    Back,
    Tariff(Tariff),
    Cancel,
    Continue,
    Paid,
    Unknown(String),
}

impl Choice {
    /// Every choice that has a button of its own.
    pub fn catalogue() -> Vec<Choice> {
        let mut all = vec![Choice::Join, Choice::Tariffs, Choice::Reviews, Choice::Back];
        all.extend(Tariff::ALL.into_iter().map(Choice::Tariff));
        all.extend([Choice::Cancel, Choice::Continue, Choice::Paid]);
        all
    }

    /// Never fails: unrecognised ids become `Unknown`.
    pub fn parse(id: &str) -> Self {
        match id.trim() {
            "join" => Choice::Join,
            "tariffs" => Choice::Tariffs,
            "reviews" => Choice::Reviews,
            "back" => Choice::Back,
            "cancel" => Choice::Cancel,
            "continue" => Choice::Continue,
            "paid" => Choice::Paid,
            other => match Tariff::from_id(other) {
                Some(tariff) => Choice::Tariff(tariff),
                None => Choice::Unknown(other.to_string()),
            },
        }
    }

    /// Reverse lookup used by reply keyboards, which only echo the label back.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::catalogue()
            .into_iter()
            .find(|choice| choice.label() == Some(label))
    }

    pub fn id(&self) -> &str {
        match self {
            Choice::Join => "join",
            Choice::Tariffs => "tariffs",
            Choice::Reviews => "reviews",
            Choice::Back => "back",
            Choice::Tariff(tariff) => tariff.id(),
            Choice::Cancel => "cancel",
            Choice::Continue => "continue",
            Choice::Paid => "paid",
            Choice::Unknown(raw) => raw,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        let label = match self {
            Choice::Join => "Хочу в проект 💪",
            Choice::Tariffs => "Тарифы 💰",
            Choice::Reviews => "Отзывы 🥹",
            Choice::Back => "⬅️ Назад",
            Choice::Tariff(tariff) => tariff.label(),
            Choice::Cancel => "❌ Отмена",
            Choice::Continue => "Продолжить ▶️",
            Choice::Paid => "✅ Оплатил",
            Choice::Unknown(_) => return None,
        };
        Some(label)
    }
}

impl Serialize for Choice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// Inbound user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Event {
    Restart,
    Select(Choice),
    Text(String),
}

impl Event {
    pub fn select(id: &str) -> Self {
        Event::Select(Choice::parse(id))
    }

    pub fn text(text: &str) -> Self {
        Event::Text(text.to_string())
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Restart => "restart",
            Event::Select(Choice::Unknown(_)) => "select_unknown",
            Event::Select(_) => "select",
            Event::Text(_) => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Idle,
    Engaged,
    AwaitingEmail,
    AwaitingPayment,
    AwaitingName,
    AwaitingHeight,
    AwaitingWeight,
    Completed,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Engaged => "engaged",
            State::AwaitingEmail => "awaiting_email",
            State::AwaitingPayment => "awaiting_payment",
            State::AwaitingName => "awaiting_name",
            State::AwaitingHeight => "awaiting_height",
            State::AwaitingWeight => "awaiting_weight",
            State::Completed => "completed",
        }
    }

    /// States from which the pitch/tariffs/reviews menu can be browsed.
    pub fn is_navigable(self) -> bool {
        matches!(
            self,
            State::Engaged | State::AwaitingEmail | State::AwaitingPayment | State::Completed
        )
    }

    /// States in the middle of a purchase that `cancel` backs out of.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            State::AwaitingEmail
                | State::AwaitingPayment
                | State::AwaitingName
                | State::AwaitingHeight
                | State::AwaitingWeight
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers collected by the payment-gate questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub name: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

/// Per-user conversation state.
///
/// `state == AwaitingEmail` implies `selected_tariff.is_some()`; the engine is the
/// only writer and keeps it that way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub state: State,
    pub selected_tariff: Option<Tariff>,
    pub email: Option<String>,
    pub profile: Profile,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: State::Idle,
            selected_tariff: None,
            email: None,
            profile: Profile::default(),
            updated_at: Utc::now(),
        }
    }

    /// Drop everything collected so far and start over at the pitch.
    pub fn begin_run(&mut self) {
        self.state = State::Engaged;
        self.selected_tariff = None;
        self.email = None;
        self.profile = Profile::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tariff_ids_round_trip_through_choice() {
        for tariff in Tariff::ALL {
            assert_eq!(Choice::parse(tariff.id()), Choice::Tariff(tariff));
        }
    }

    #[test]
    fn tariff_codes_and_prices() {
        assert_eq!(Tariff::FifteenDays.code(), "15-day");
        assert_eq!(Tariff::OneMonth.code(), "30-day");
        assert_eq!(Tariff::ThreeMonths.code(), "90-day");
        assert_eq!(Tariff::OneMonth.price_rub(), 3000);
        assert_eq!(Tariff::ThreeMonths.duration(), "3 месяца");
        assert_eq!(Tariff::OneMonth.to_string(), "30-day");
    }

    #[test]
    fn unknown_selection_is_preserved() {
        let choice = Choice::parse("tariff_45");
        assert_eq!(choice, Choice::Unknown("tariff_45".to_string()));
        assert_eq!(choice.id(), "tariff_45");
        assert!(choice.label().is_none());
    }

    #[test]
    fn labels_resolve_back_to_choices() {
        assert_eq!(Choice::from_label("Хочу в проект 💪"), Some(Choice::Join));
        assert_eq!(
            Choice::from_label(" 1 месяц (3000 ₽) "),
            Some(Choice::Tariff(Tariff::OneMonth))
        );
        assert_eq!(Choice::from_label("привет"), None);
    }

    #[test]
    fn catalogue_labels_are_unique() {
        let labels: Vec<_> = Choice::catalogue().iter().filter_map(Choice::label).collect();
        let mut deduped = labels.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len());
    }

    #[test]
    fn event_kind_labels() {
        assert_eq!(Event::Restart.kind(), "restart");
        assert_eq!(Event::select("join").kind(), "select");
        assert_eq!(Event::select("nope").kind(), "select_unknown");
        assert_eq!(Event::text("hi").kind(), "text");
    }

    #[test]
    fn event_serializes_with_tag() {
        let json = serde_json::to_string(&Event::select("tariff_30")).unwrap();
        assert_eq!(json, r#"{"kind":"select","value":"tariff_30"}"#);
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let session = Session::new(UserId(7));
        assert_eq!(session.state, State::Idle);
        assert!(session.selected_tariff.is_none());
        assert!(session.email.is_none());
    }

    #[test]
    fn begin_run_clears_collected_data() {
        let mut session = Session::new(UserId(7));
        session.state = State::Completed;
        session.selected_tariff = Some(Tariff::OneMonth);
        session.email = Some("a@b.c".to_string());
        session.profile.name = Some("Аня".to_string());

        session.begin_run();

        assert_eq!(session.state, State::Engaged);
        assert!(session.selected_tariff.is_none());
        assert!(session.email.is_none());
        assert_eq!(session.profile, Profile::default());
    }

    #[test]
    fn contact_strips_at_from_username() {
        let contact = Contact::new(5).with_username("@polina");
        assert_eq!(contact.username.as_deref(), Some("polina"));
        assert_eq!(contact.id, UserId(5));
    }
}
