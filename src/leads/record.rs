//! The row appended for every completed funnel run

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::funnel::{calories, Contact, Session, Tariff, UserId};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Write-once lead. Height, weight and calories are only filled by the
/// payment-gate questionnaire; email only by email capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub user_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub calories: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub tariff: Tariff,
    pub email: Option<String>,
}

impl LeadRecord {
    pub const HEADER: [&'static str; 9] = [
        "user_id",
        "username",
        "display_name",
        "height",
        "weight",
        "calories",
        "timestamp",
        "tariff",
        "email",
    ];

    pub fn from_session(
        contact: &Contact,
        session: &Session,
        tariff: Tariff,
        now: DateTime<Utc>,
    ) -> Self {
        let profile = &session.profile;
        let display_name = profile
            .name
            .clone()
            .or_else(|| contact.display_name.clone());
        let calories = match (profile.height_cm, profile.weight_kg) {
            (Some(h), Some(w)) => Some(calories(h, w)),
            _ => None,
        };

        Self {
            user_id: contact.id,
            username: contact.username.clone(),
            display_name,
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            calories,
            timestamp: now,
            tariff,
            email: session.email.clone(),
        }
    }

    /// Spreadsheet columns, in [`Self::HEADER`] order; missing values are empty.
    pub fn to_row(&self) -> Vec<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            self.user_id.to_string(),
            opt(&self.username),
            opt(&self.display_name),
            opt(&self.height_cm),
            opt(&self.weight_kg),
            opt(&self.calories),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.tariff.label().to_string(),
            opt(&self.email),
        ]
    }
}
