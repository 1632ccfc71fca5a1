//! Outgoing response descriptors and engine results

use serde::Serialize;

use super::types::{Choice, State};
use crate::leads::LeadRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub choice: Choice,
}

impl Button {
    /// Button with the catalogue label of `choice` (falls back to its id).
    pub fn new(choice: Choice) -> Self {
        let label = choice
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| choice.id().to_string());
        Self { label, choice }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    pub fn new(rows: Vec<Vec<Choice>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Button::new).collect())
                .collect(),
        }
    }

    pub fn single(choice: Choice) -> Self {
        Self::new(vec![vec![choice]])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn contains(&self, choice: &Choice) -> bool {
        self.buttons().any(|b| &b.choice == choice)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// Exactly one of these is produced per handled event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    pub text: String,
    pub photos: Vec<String>,
    pub menu: Option<Menu>,
    pub format: TextFormat,
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_photo(mut self, url: impl Into<String>) -> Self {
        self.photos.push(url.into());
        self
    }

    pub fn with_photos<I, T>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.photos.extend(urls.into_iter().map(Into::into));
        self
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn html(mut self) -> Self {
        self.format = TextFormat::Html;
        self
    }
}

/// Side effect the caller must carry out after delivering the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Effect {
    FinalizeLead(LeadRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: State,
    pub state: State,
    pub response: Response,
    pub effect: Option<Effect>,
}

impl Transition {
    pub fn lead(&self) -> Option<&LeadRecord> {
        match &self.effect {
            Some(Effect::FinalizeLead(record)) => Some(record),
            None => None,
        }
    }
}
