// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule evaluation for a single feed event.
//!
//! Categories are visited in rule-set order. For each one the event field
//! is resolved by path; missing fields skip the category. An exclusion hit
//! short-circuits the remaining categories unless override is on, and an
//! excluded event is never important regardless of inclusion hits.

use flatrelay_core::{FeedEvent, Rule, RuleSet, Sign};
use tracing::debug;

/// Outcome of evaluating one event against one rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Matched an include selector and no exclude selector.
    pub important: bool,
    /// Human-readable `category: ±value` entries in evaluation order.
    pub triggered: Vec<String>,
    /// An actor display name was updated in the rule set.
    pub names_refreshed: bool,
}

impl Evaluation {
    /// Whether the event is delivered to the user.
    pub fn delivers(&self, override_rules: bool) -> bool {
        self.important || override_rules
    }
}

/// Evaluates `event` against `rules`.
///
/// The only mutation is the cached actor display name; the returned
/// decision does not depend on it.
pub fn evaluate(event: &FeedEvent, rules: &mut RuleSet, override_rules: bool) -> Evaluation {
    let mut included = false;
    let mut excluded = false;
    let mut triggered = Vec::new();
    let mut names_refreshed = false;

    for rule in rules.iter_mut() {
        let Some(value) = event.lookup(rule.category.field_path()) else {
            continue;
        };

        let exclude_key = Sign::Exclude.key(&value);
        if rule.selectors.contains(&exclude_key) {
            excluded = true;
            let shown = shown_value(rule, &exclude_key, &value, event, &mut names_refreshed);
            triggered.push(format!("{}: -{shown}", rule.category));
            if !override_rules {
                break;
            }
        }

        let include_key = Sign::Include.key(&value);
        let matched_key = if rule.selectors.contains(&include_key) {
            Some(include_key)
        } else if rule.selectors.contains(&value) {
            Some(value.clone())
        } else {
            None
        };
        if let Some(key) = matched_key {
            included = true;
            let shown = shown_value(rule, &key, &value, event, &mut names_refreshed);
            triggered.push(format!("{}: +{shown}", rule.category));
        }
    }

    let important = included && !excluded;
    debug!(
        event_id = %event.id(),
        kind = event.kind(),
        important,
        triggered = ?triggered,
        "evaluated feed event"
    );

    Evaluation {
        important,
        triggered,
        names_refreshed,
    }
}

/// Value shown in the triggered list. Actor selectors show the cached
/// username, refreshed from the event first.
fn shown_value(
    rule: &mut Rule,
    key: &str,
    value: &str,
    event: &FeedEvent,
    refreshed: &mut bool,
) -> String {
    if !rule.category.is_named() {
        return value.to_string();
    }
    if let Some(username) = event.actor_username() {
        if rule.selectors.refresh_name(key, username) {
            debug!(key, username, "refreshed cached actor username");
            *refreshed = true;
        }
    }
    rule.selectors
        .display_name(key)
        .unwrap_or(value)
        .to_string()
}
