//! Telegram front end
//!
//! Turns updates into funnel events, delivers the resulting [`Response`] and runs
//! the lead effect. The dispatcher processes updates of one chat sequentially, which
//! is what the engine needs for per-user ordering.

pub mod render;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, InputFile, Message, ParseMode, User};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::funnel::{Contact, Effect, Event, FunnelEngine, Response, TextFormat, Transition};
use crate::health;
use crate::leads::{LeadRecorder, PersistOutcome};
use crate::store::{InMemorySessionStore, SessionStore};

pub use render::{event_from_callback, event_from_text, render_markup, KeyboardMode};

const SAVE_FAILED_TEXT: &str =
    "Не получилось сохранить заявку. Пожалуйста, напиши нам ещё раз чуть позже 🙏";

pub struct AppState {
    pub engine: FunnelEngine<Arc<InMemorySessionStore>>,
    pub recorder: LeadRecorder,
    pub keyboard: KeyboardMode,
}

impl AppState {
    pub fn new(
        engine: FunnelEngine<Arc<InMemorySessionStore>>,
        recorder: LeadRecorder,
        keyboard: KeyboardMode,
    ) -> Self {
        Self {
            engine,
            recorder,
            keyboard,
        }
    }
}

/// Long-polls until Ctrl+C.
pub async fn run(bot: Bot, state: Arc<AppState>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(
            |bot: Bot, msg: Message, state: Arc<AppState>| async move {
                if let Err(err) = handle_message(bot, state, msg).await {
                    error!("Message handler error: {err:?}");
                }
                Ok::<_, teloxide::RequestError>(())
            },
        ))
        .branch(Update::filter_callback_query().endpoint(
            |bot: Bot, q: CallbackQuery, state: Arc<AppState>| async move {
                if let Err(err) = handle_callback(bot, state, q).await {
                    error!("Callback handler error: {err:?}");
                }
                Ok::<_, teloxide::RequestError>(())
            },
        ));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(bot: Bot, state: Arc<AppState>, msg: Message) -> Result<()> {
    // stickers, photos and other non-text messages are ignored
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let contact = contact_from_user(msg.from(), msg.chat.id);
    let event = event_from_text(text);
    process(&bot, &state, msg.chat.id, &contact, event).await
}

async fn handle_callback(bot: Bot, state: Arc<AppState>, q: CallbackQuery) -> Result<()> {
    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback: {err}");
    }

    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.message.as_ref().map(|m| m.chat.id))
    else {
        return Ok(());
    };
    let contact = contact_from_user(Some(&q.from), chat_id);
    process(&bot, &state, chat_id, &contact, event_from_callback(data)).await
}

/// Falls back to the chat id for anonymous senders (channels, anonymous admins).
pub fn contact_from_user(user: Option<&User>, chat_id: ChatId) -> Contact {
    match user {
        Some(user) => {
            let mut contact = Contact::new(user.id.0 as i64).with_display_name(&user.full_name());
            if let Some(username) = &user.username {
                contact = contact.with_username(username);
            }
            contact
        }
        None => Contact::new(chat_id.0),
    }
}

async fn process(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    contact: &Contact,
    event: Event,
) -> Result<()> {
    let kind = event.kind();
    let transition = state.engine.handle_event(contact, event);
    health::record_event(kind, transition.from, transition.state);
    health::set_sessions(state.engine.store().len());

    // the lead is recorded even when the reply cannot be delivered
    let delivered = deliver(bot, chat_id, &transition.response, state.keyboard).await;
    if let Err(err) = &delivered {
        warn!(user_id = %contact.id, "Failed to deliver response: {}", err);
    }
    finalize(bot, state, chat_id, &transition).await?;
    delivered
}

async fn finalize(bot: &Bot, state: &AppState, chat_id: ChatId, transition: &Transition) -> Result<()> {
    let Some(Effect::FinalizeLead(record)) = &transition.effect else {
        return Ok(());
    };

    match state.recorder.record(record).await {
        Ok(PersistOutcome::Persisted) => {}
        Ok(PersistOutcome::Dropped { reason }) => {
            debug!(user_id = %record.user_id, %reason, "Lead dropped under best-effort policy");
        }
        Err(err) => {
            error!(user_id = %record.user_id, "Failed to record lead: {}", err);
            bot.send_message(chat_id, SAVE_FAILED_TEXT).await?;
        }
    }
    Ok(())
}

/// Photos first (a broken photo never blocks the text), then the text with its menu.
pub async fn deliver(bot: &Bot, chat_id: ChatId, response: &Response, keyboard: KeyboardMode) -> Result<()> {
    for url in &response.photos {
        let parsed = match url.parse::<reqwest::Url>() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%url, "Skipping photo with invalid URL: {}", err);
                continue;
            }
        };
        if let Err(err) = bot.send_photo(chat_id, InputFile::url(parsed)).await {
            warn!(%url, "Failed to send photo: {}", err);
        }
    }

    if response.text.is_empty() {
        return Ok(());
    }

    let markup = response.menu.as_ref().map(|menu| render_markup(menu, keyboard));

    let mut request = bot.send_message(chat_id, response.text.clone());
    if response.format == TextFormat::Html {
        request = request.parse_mode(ParseMode::Html);
    }
    if let Some(markup) = markup.clone() {
        request = request.reply_markup(markup);
    }

    match request.await {
        Ok(_) => Ok(()),
        Err(err) if response.format == TextFormat::Html => {
            warn!("HTML message rejected, resending as plain text: {}", err);
            let mut plain = bot.send_message(chat_id, response.text.clone());
            if let Some(markup) = markup {
                plain = plain.reply_markup(markup);
            }
            plain.await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Drops sessions idle for longer than `ttl`, checking every `ttl / 4` (at least once a minute).
pub fn spawn_session_purge(store: Arc<InMemorySessionStore>, ttl: Duration) -> Result<JoinHandle<()>> {
    let max_idle = chrono::Duration::from_std(ttl)
        .map_err(|e| Error::ConfigError(format!("Session TTL {:?} is out of range: {}", ttl, e)))?;
    let every = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));

    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
                warn!(ttl_secs = ttl.as_secs(), "Session TTL reaches before the epoch, purge skipped");
                continue;
            };
            let removed = store.purge_idle(cutoff);
            if removed > 0 {
                info!(removed, remaining = store.len(), "Purged idle sessions");
            }
        }
    }))
}
