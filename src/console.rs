//! Line-based driver for trying the funnel without Telegram
//!
//! Input lines: `/start` restarts, `#<id>` presses a button by id (`#tariff_30`),
//! an exact button label presses that button, anything else is typed text.

use crate::bot::event_from_text;
use crate::funnel::{Event, Transition};

pub fn parse_line(line: &str) -> Event {
    let line = line.trim();
    match line.strip_prefix('#') {
        Some(id) if !id.trim().is_empty() => Event::select(id),
        _ => event_from_text(line),
    }
}

/// Human-readable rendering of a transition for a terminal.
pub fn render_plain(transition: &Transition) -> String {
    let mut out = Vec::new();
    out.push(format!("[{} -> {}]", transition.from, transition.state));

    for photo in &transition.response.photos {
        out.push(format!("(photo) {}", photo));
    }
    if !transition.response.text.is_empty() {
        out.push(transition.response.text.clone());
    }
    if let Some(menu) = &transition.response.menu {
        for row in &menu.rows {
            let buttons: Vec<String> = row
                .iter()
                .map(|b| format!("[{}] #{}", b.label, b.choice.id()))
                .collect();
            out.push(buttons.join("  "));
        }
    }
    if let Some(lead) = transition.lead() {
        out.push(format!(
            "(lead) user={} tariff={} email={}",
            lead.user_id,
            lead.tariff,
            lead.email.as_deref().unwrap_or("-")
        ));
    }
    out.join("\n")
}
