// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule categories, signed selectors, and per-user rule sets.
//!
//! A selector is a value prefixed with `+` (include) or `-` (exclude). Bare
//! values from older snapshots are kept as-is and count as includes.
//!
//! The actor category stores its selectors against the feed's internal user
//! id while remembering the last seen username for display. Every other
//! category is a plain set of signed values.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The canonical rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum Category {
    /// Who triggered the event. Selectors key on the actor id.
    #[strum(serialize = "actor.username")]
    Actor,
    /// Notification type.
    #[strum(serialize = "type")]
    Type,
    /// Score attached to the event.
    #[strum(serialize = "attachments.score.id")]
    Score,
}

impl Category {
    /// User-facing category name.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Field path walked on a feed event to obtain the compared value.
    pub fn field_path(self) -> &'static [&'static str] {
        match self {
            Category::Actor => &["actor", "id"],
            Category::Type => &["type"],
            Category::Score => &["attachments", "score", "id"],
        }
    }

    /// Whether selectors of this category carry a cached display name.
    pub fn is_named(self) -> bool {
        matches!(self, Category::Actor)
    }

    /// Empty selector container of the right kind for this category.
    pub fn empty_selectors(self) -> Selectors {
        if self.is_named() {
            Selectors::Named(Vec::new())
        } else {
            Selectors::Plain(Vec::new())
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Include or exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Include,
    Exclude,
}

impl Sign {
    pub fn prefix(self) -> char {
        match self {
            Sign::Include => '+',
            Sign::Exclude => '-',
        }
    }

    /// Builds the stored selector key for `value`.
    pub fn key(self, value: &str) -> String {
        format!("{}{value}", self.prefix())
    }
}

/// Selector container for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selectors {
    /// Signed values.
    Plain(Vec<String>),
    /// Signed actor ids mapped to the last seen username.
    Named(Vec<(String, String)>),
}

impl Selectors {
    pub fn contains(&self, key: &str) -> bool {
        match self {
            Selectors::Plain(keys) => keys.iter().any(|k| k == key),
            Selectors::Named(pairs) => pairs.iter().any(|(k, _)| k == key),
        }
    }

    /// Inserts `key`; returns false if it was already present.
    ///
    /// `display` is only kept by named containers.
    pub fn insert(&mut self, key: String, display: &str) -> bool {
        if self.contains(&key) {
            return false;
        }
        match self {
            Selectors::Plain(keys) => keys.push(key),
            Selectors::Named(pairs) => pairs.push((key, display.to_string())),
        }
        true
    }

    /// Removes `key`; returns false if it was absent.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.len();
        match self {
            Selectors::Plain(keys) => keys.retain(|k| k != key),
            Selectors::Named(pairs) => pairs.retain(|(k, _)| k != key),
        }
        self.len() != before
    }

    /// Cached display name for `key`, named containers only.
    pub fn display_name(&self, key: &str) -> Option<&str> {
        match self {
            Selectors::Plain(_) => None,
            Selectors::Named(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, name)| name.as_str()),
        }
    }

    /// Updates the cached display name; returns true when it changed.
    pub fn refresh_name(&mut self, key: &str, name: &str) -> bool {
        let Selectors::Named(pairs) = self else {
            return false;
        };
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, cached)) if cached != name => {
                *cached = name.to_string();
                true
            }
            _ => false,
        }
    }

    /// Finds the stored key whose cached display name is `name`.
    pub fn key_for_name(&self, name: &str) -> Option<&str> {
        match self {
            Selectors::Plain(_) => None,
            Selectors::Named(pairs) => pairs
                .iter()
                .find(|(_, n)| n == name)
                .map(|(k, _)| k.as_str()),
        }
    }

    /// Stored keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Selectors::Plain(keys) => keys.iter().map(String::as_str).collect(),
            Selectors::Named(pairs) => pairs.iter().map(|(k, _)| k.as_str()).collect(),
        }
    }

    /// Selectors as shown to users: named entries render as sign + username.
    pub fn describe(&self) -> Vec<String> {
        match self {
            Selectors::Plain(keys) => keys.clone(),
            Selectors::Named(pairs) => pairs
                .iter()
                .map(|(key, name)| match key.chars().next() {
                    Some(sign @ ('+' | '-')) => format!("{sign}{name}"),
                    _ => name.clone(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selectors::Plain(keys) => keys.len(),
            Selectors::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_kind(self, category: Category) -> Selectors {
        match (category.is_named(), self) {
            (true, Selectors::Plain(keys)) => Selectors::Named(
                keys.into_iter()
                    .map(|k| {
                        let name = k.trim_start_matches(|c: char| c == '+' || c == '-').to_string();
                        (k, name)
                    })
                    .collect(),
            ),
            (false, Selectors::Named(pairs)) => {
                Selectors::Plain(pairs.into_iter().map(|(k, _)| k).collect())
            }
            (_, same) => same,
        }
    }
}

impl Serialize for Selectors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selectors::Plain(keys) => keys.serialize(serializer),
            Selectors::Named(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Selectors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SelectorsVisitor;

        impl<'de> Visitor<'de> for SelectorsVisitor {
            type Value = Selectors;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of selectors or a map of selector to display name")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Selectors, A::Error> {
                let mut keys: Vec<String> = Vec::new();
                while let Some(key) = seq.next_element::<String>()? {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                Ok(Selectors::Plain(keys))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Selectors, A::Error> {
                let mut pairs: Vec<(String, String)> = Vec::new();
                while let Some((key, name)) = map.next_entry::<String, String>()? {
                    if !pairs.iter().any(|(k, _)| *k == key) {
                        pairs.push((key, name));
                    }
                }
                Ok(Selectors::Named(pairs))
            }
        }

        deserializer.deserialize_any(SelectorsVisitor)
    }
}

/// One category with its selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub category: Category,
    pub selectors: Selectors,
}

/// A user's rules, iterated in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Rule set with every canonical category present and empty.
    pub fn canonical() -> Self {
        Self {
            rules: Category::iter()
                .map(|category| Rule {
                    category,
                    selectors: category.empty_selectors(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.rules.iter_mut()
    }

    pub fn get(&self, category: Category) -> Option<&Selectors> {
        self.rules
            .iter()
            .find(|r| r.category == category)
            .map(|r| &r.selectors)
    }

    pub fn get_mut(&mut self, category: Category) -> Option<&mut Selectors> {
        self.rules
            .iter_mut()
            .find(|r| r.category == category)
            .map(|r| &mut r.selectors)
    }

    /// Selectors for `category`, created empty if the category is missing.
    pub fn entry(&mut self, category: Category) -> &mut Selectors {
        if let Some(idx) = self.rules.iter().position(|r| r.category == category) {
            return &mut self.rules[idx].selectors;
        }
        self.rules.push(Rule {
            category,
            selectors: category.empty_selectors(),
        });
        let last = self.rules.len() - 1;
        &mut self.rules[last].selectors
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(rule.category.name(), &rule.selectors)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of rule category to selectors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RuleSet, A::Error> {
                let mut rules: Vec<Rule> = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    let category: Category = name.parse().map_err(|_| {
                        de::Error::custom(format!("unknown rule category `{name}`"))
                    })?;
                    let selectors = map.next_value::<Selectors>()?.into_kind(category);
                    if rules.iter().any(|r| r.category == category) {
                        return Err(de::Error::custom(format!(
                            "duplicate rule category `{name}`"
                        )));
                    }
                    rules.push(Rule {
                        category,
                        selectors,
                    });
                }
                Ok(RuleSet { rules })
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}
