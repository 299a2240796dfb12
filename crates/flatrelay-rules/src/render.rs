// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message rendering for delivered events.

use flatrelay_core::FeedEvent;

const MARKDOWN_SPECIAL: &[char] = &[
    '*', '_', '~', '`', '|', '>', '[', ']', '(', ')', '#', '-', '+', '.',
];

/// Backslash-escapes Discord markdown control characters.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Link target for an event, empty when the type has none.
pub fn event_url(event: &FeedEvent) -> String {
    match event.kind() {
        "scoreComment" => match (event.score_url(), event.score_comment()) {
            (Some(url), Some(comment)) => format!("{url}#c-{comment}"),
            (Some(url), None) => url.to_string(),
            _ => String::new(),
        },
        "scorePublication" | "scoreStar" | "scoreInvitation" => {
            event.score_url().unwrap_or_default().to_string()
        }
        "userFollow" => event.actor_url().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

/// Renders the triggered rule list as `['a', 'b']`.
pub fn format_triggered(triggered: &[String]) -> String {
    let items: Vec<String> = triggered.iter().map(|t| format!("'{t}'")).collect();
    format!("[{}]", items.join(", "))
}

/// Full notification text for one delivered event.
pub fn render_notification(event: &FeedEvent, triggered: &[String]) -> String {
    let actor = event.actor_printable_name().unwrap_or("Someone");
    format!(
        "{}: {} [(Open on Flat)]({})\n-# Rule(s): {}",
        escape_markdown(actor),
        escape_markdown(event.kind()),
        event_url(event),
        escape_markdown(&format_triggered(triggered)),
    )
}
