//! Mapping between Telegram updates and funnel events/menus

use serde::Deserialize;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use crate::funnel::{Choice, Event, Menu};

/// How menus are shown: a reply keyboard echoes the label back as text,
/// an inline keyboard sends the choice id as callback data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardMode {
    #[default]
    Reply,
    Inline,
}

/// `/start` (with or without a payload) restarts; a known button label selects;
/// anything else is free text.
pub fn event_from_text(text: &str) -> Event {
    let text = text.trim();
    if text == "/start" || text.starts_with("/start ") || text.starts_with("/start@") {
        return Event::Restart;
    }
    match Choice::from_label(text) {
        Some(choice) => Event::Select(choice),
        None => Event::Text(text.to_string()),
    }
}

pub fn event_from_callback(data: &str) -> Event {
    Event::select(data)
}

pub fn render_markup(menu: &Menu, mode: KeyboardMode) -> ReplyMarkup {
    match mode {
        KeyboardMode::Reply => {
            let rows = menu.rows.iter().map(|row| {
                row.iter()
                    .map(|button| KeyboardButton::new(button.label.clone()))
                    .collect::<Vec<_>>()
            });
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard(true))
        }
        KeyboardMode::Inline => {
            let rows = menu.rows.iter().map(|row| {
                row.iter()
                    .map(|button| {
                        InlineKeyboardButton::callback(
                            button.label.clone(),
                            button.choice.id().to_string(),
                        )
                    })
                    .collect::<Vec<_>>()
            });
            ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows))
        }
    }
}
