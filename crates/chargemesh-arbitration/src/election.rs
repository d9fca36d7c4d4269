//! Slot election
//!
//! A node looks for its own token in the occupancy list published by the
//! broker and lands in one of three states:
//!
//! | outcome                                   | state         | wire |
//! |-------------------------------------------|---------------|------|
//! | sole entry of the list matches            | FirstHolder   | `A`  |
//! | any other entry matches                   | SharedHolder  | `B`  |
//! | nothing matches                           | Unlisted      | `C`  |
//!
//! [`elect`] is pure. All text parsing happens in [`OccupancyList::parse`]
//! and [`ChargerToken`](crate::ChargerToken), so both call sites (broker and
//! button) evaluate the same function on explicit inputs.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::token::ChargerToken;

/// Result of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArbitrationState {
    /// The only entry in the list is ours
    FirstHolder,
    /// We are listed but share the slot with others
    SharedHolder,
    /// We are not in the list
    #[default]
    Unlisted,
}

impl ArbitrationState {
    /// Single-letter wire form
    pub fn letter(&self) -> &'static str {
        match self {
            Self::FirstHolder => "A",
            Self::SharedHolder => "B",
            Self::Unlisted => "C",
        }
    }

    /// Whether the node appears in the list at all
    pub fn is_listed(&self) -> bool {
        !matches!(self, Self::Unlisted)
    }
}

impl Display for ArbitrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// How a token is compared against a list entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// The token's first character occurs anywhere in the entry
    #[default]
    LeadingChar,
    /// The whole token occurs anywhere in the entry
    Substring,
    /// The entry equals the token
    Exact,
}

impl MatchRule {
    /// Whether `entry` matches `token` under this rule
    pub fn matches(&self, entry: &str, token: &str) -> bool {
        match self {
            Self::LeadingChar => token
                .chars()
                .next()
                .is_some_and(|first| entry.contains(first)),
            Self::Substring => !token.is_empty() && entry.contains(token),
            Self::Exact => !token.is_empty() && entry == token,
        }
    }
}

/// Ordered claims on the charging slot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OccupancyList {
    entries: Vec<String>,
}

impl OccupancyList {
    /// Parse a comma-delimited list.
    ///
    /// Every segment keeps its position, so the list length is always the
    /// comma count plus one. Segments are trimmed; an empty segment stays in
    /// place and never matches a token.
    pub fn parse(raw: &str) -> Self {
        let entries = raw.split(',').map(str::trim).map(String::from).collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for OccupancyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entries.join(","))
    }
}

/// Decide this node's state for `list`
pub fn elect(list: &OccupancyList, token: &ChargerToken, rule: MatchRule) -> ArbitrationState {
    let n = list.len();

    for (i, entry) in list.entries().iter().enumerate() {
        if rule.matches(entry, token.as_str()) {
            return if i == 0 && n == 1 {
                ArbitrationState::FirstHolder
            } else {
                ArbitrationState::SharedHolder
            };
        }
    }

    ArbitrationState::Unlisted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> ChargerToken {
        ChargerToken::from_address_str(s)
    }

    fn run(list: &str, own: &str) -> ArbitrationState {
        elect(&OccupancyList::parse(list), &token(own), MatchRule::default())
    }

    #[test]
    fn test_sole_entry_is_first_holder() {
        assert_eq!(run("X", "X"), ArbitrationState::FirstHolder);
    }

    #[test]
    fn test_first_of_many_is_shared() {
        assert_eq!(run("X,Y", "X"), ArbitrationState::SharedHolder);
    }

    #[test]
    fn test_later_entry_is_shared() {
        assert_eq!(run("Y,X", "X"), ArbitrationState::SharedHolder);
    }

    #[test]
    fn test_absent_is_unlisted() {
        assert_eq!(run("Y,Z", "X"), ArbitrationState::Unlisted);
    }

    #[test]
    fn test_containment_match() {
        assert_eq!(run("AX,Y", "X"), ArbitrationState::SharedHolder);
    }

    #[test]
    fn test_leading_char_ignores_rest_of_token() {
        // "12" only contributes '1', which "31" contains
        assert_eq!(run("31", "12"), ArbitrationState::FirstHolder);
    }

    #[test]
    fn test_stricter_rules() {
        let list = OccupancyList::parse("17,3");
        let own = token("10.0.0.7");
        assert_eq!(elect(&list, &own, MatchRule::Substring), ArbitrationState::SharedHolder);
        assert_eq!(elect(&list, &own, MatchRule::Exact), ArbitrationState::Unlisted);

        let list = OccupancyList::parse("7");
        assert_eq!(elect(&list, &own, MatchRule::Exact), ArbitrationState::FirstHolder);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(run("", "X"), ArbitrationState::Unlisted);
        assert_eq!(run(",,", "X"), ArbitrationState::Unlisted);

        let empty = token("10.0.0.");
        for rule in [MatchRule::LeadingChar, MatchRule::Substring, MatchRule::Exact] {
            assert_eq!(
                elect(&OccupancyList::parse("a,b"), &empty, rule),
                ArbitrationState::Unlisted
            );
        }
    }

    #[test]
    fn test_parse_keeps_empty_positions() {
        let list = OccupancyList::parse(" 7,,12 ");
        assert_eq!(list.len(), 3);
        assert_eq!(
            list.entries(),
            &["7".to_string(), String::new(), "12".to_string()]
        );
        assert_eq!(list.to_string(), "7,,12");
    }

    #[test]
    fn test_empty_segments_count_towards_sharing() {
        assert_eq!(run("7,", "10.0.0.7"), ArbitrationState::SharedHolder);
        assert_eq!(run(",7", "10.0.0.7"), ArbitrationState::SharedHolder);
        assert_eq!(run("7,,3", "10.0.0.7"), ArbitrationState::SharedHolder);
        assert_eq!(run("7,,3", "10.0.0.3"), ArbitrationState::SharedHolder);
        assert_eq!(run("7,,3", "10.0.0.5"), ArbitrationState::Unlisted);
    }

    #[test]
    fn test_letters() {
        assert_eq!(ArbitrationState::FirstHolder.letter(), "A");
        assert_eq!(ArbitrationState::SharedHolder.letter(), "B");
        assert_eq!(ArbitrationState::Unlisted.to_string(), "C");
        assert!(!ArbitrationState::default().is_listed());
    }
}
