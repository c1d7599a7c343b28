// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selection filters and their type registry.
//!
//! A filter is one configured rule: it inspects the request context and the
//! scoreboard and either adjusts scores or removes candidates. Filters hold
//! no cross-request mutable state — all configuration-derived state is fixed
//! at load time, and `apply` is infallible at request time. Zero matches or
//! an emptied scoreboard are normal outcomes, not errors.
//!
//! Filter kinds form a compile-time enumerable set registered in a
//! [`FilterRegistry`] keyed by type name; dispatch from the `<n>.filter=`
//! directive to the concrete parser happens through that table.

mod assign;
mod matchdir;
mod maxtransfers;
mod minfreespace;

pub use assign::AssignFilter;
pub use matchdir::MatchdirFilter;
pub use maxtransfers::MaxtransfersFilter;
pub use minfreespace::MinfreespaceFilter;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::candidate::SelectionCandidate;
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

/// One rule in the selection chain.
#[async_trait]
pub trait SelectionFilter<C: SelectionCandidate>: Send + Sync {
    /// Configured type name of this filter (e.g. `"assign"`).
    fn kind(&self) -> &'static str;

    /// Score or eliminate scoreboard rows for one request.
    async fn apply(&self, ctx: &RequestContext, board: &mut Scoreboard<C>);
}

/// Resolves configuration tokens to canonical candidate names at load time.
///
/// The master-side directory resolves slave names case-insensitively; the
/// slave-side directory resolves 1-based disk-root indices with bounds
/// checking. A token that resolves to nothing is a fatal
/// [`ConfigError::UnknownCandidate`].
pub trait CandidateDirectory {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Parser signature every filter kind registers.
pub type FilterParser<C> = fn(
    u32,
    &DirectiveSet,
    &dyn CandidateDirectory,
) -> Result<Box<dyn SelectionFilter<C>>, ConfigError>;

/// Lookup table from filter type name to its parameter parser.
pub struct FilterRegistry<C: SelectionCandidate> {
    table: HashMap<&'static str, FilterParser<C>>,
}

impl<C: SelectionCandidate> FilterRegistry<C> {
    /// Registry with every built-in filter kind installed.
    pub fn builtin() -> Self {
        let mut registry = Self {
            table: HashMap::new(),
        };
        registry.register(assign::KIND, assign::parse::<C>);
        registry.register(matchdir::KIND, matchdir::parse::<C>);
        registry.register(maxtransfers::KIND, maxtransfers::parse::<C>);
        registry.register(minfreespace::KIND, minfreespace::parse::<C>);
        registry
    }

    /// Install a filter kind. Later registrations under the same name win,
    /// allowing embedders to shadow a built-in.
    pub fn register(&mut self, kind: &'static str, parser: FilterParser<C>) {
        self.table.insert(kind, parser);
    }

    pub fn get(&self, kind: &str) -> Option<FilterParser<C>> {
        self.table.get(kind).copied()
    }
}

impl<C: SelectionCandidate> Default for FilterRegistry<C> {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Effect of one assignment token on its candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignAction {
    /// Add a signed point delta to the candidate's score.
    Score(i64),
    /// Remove the candidate from the scoreboard outright.
    Exclude,
}

#[derive(Debug, Clone)]
pub(crate) struct AssignEntry {
    pub name: String,
    pub action: AssignAction,
}

/// Parsed `<n>.assign=` expression: either the `all` wildcard or a list of
/// per-candidate actions.
#[derive(Debug, Clone)]
pub(crate) struct AssignTable {
    pub entries: Vec<AssignEntry>,
    pub all: bool,
}

impl AssignTable {
    /// Apply the table to a scoreboard. `all` touches every remaining row
    /// with a zero delta (documenting eligibility) and applies nothing else.
    pub fn apply<C: SelectionCandidate>(&self, board: &mut Scoreboard<C>) {
        if self.all {
            for name in board.names() {
                board.add_score(&name, 0);
            }
            return;
        }
        for entry in &self.entries {
            match entry.action {
                AssignAction::Score(delta) => board.add_score(&entry.name, delta),
                AssignAction::Exclude => board.exclude(&entry.name),
            }
        }
    }
}

/// Split an assignment expression into raw tokens. Whitespace- and
/// comma-tolerant: `"1+200, 2+200"` and `"slaveA+10 slaveB-5"` both work.
pub(crate) fn split_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([',', ' ', '\t']).filter(|t| !t.is_empty())
}

/// Parse one `<name><sign><value>` token into its parts, without resolving
/// the name. Returns `(name, sign, value)`.
fn split_token(index: u32, token: &str) -> Result<(&str, char, &str), ConfigError> {
    let malformed = || ConfigError::MalformedToken {
        index,
        token: token.to_string(),
    };

    // The sign is the last '+' or '-' so names may themselves contain '-'.
    let pos = token.rfind(['+', '-']).ok_or_else(malformed)?;
    if pos == 0 || pos + 1 == token.len() {
        return Err(malformed());
    }
    let (name, rest) = token.split_at(pos);
    let sign = rest.chars().next().unwrap_or('+');
    Ok((name, sign, &rest[1..]))
}

/// Parse an `<n>.assign=` expression for score-assignment filters.
///
/// Grammar per token: `all` | `<name>+<points>` | `<name>-<points>` |
/// `<name>-remove`. The reserved minimum-integer delta also parses to an
/// explicit [`AssignAction::Exclude`], preserving the legacy sentinel's
/// observable behavior.
pub(crate) fn parse_assign_table(
    index: u32,
    raw: &str,
    directory: &dyn CandidateDirectory,
) -> Result<AssignTable, ConfigError> {
    let mut entries = Vec::new();
    let mut all = false;

    for token in split_tokens(raw) {
        if token.eq_ignore_ascii_case("all") {
            all = true;
            continue;
        }

        let (name_token, sign, value) = split_token(index, token)?;
        let name = directory
            .resolve(name_token)
            .ok_or_else(|| ConfigError::UnknownCandidate {
                index,
                token: name_token.to_string(),
            })?;

        let action = if value.eq_ignore_ascii_case("remove") {
            AssignAction::Exclude
        } else {
            let magnitude: u64 = value.parse().map_err(|_| ConfigError::MalformedToken {
                index,
                token: token.to_string(),
            })?;
            match sign {
                '-' if magnitude == i64::MIN.unsigned_abs() => AssignAction::Exclude,
                '-' if magnitude <= i64::MAX as u64 => AssignAction::Score(-(magnitude as i64)),
                '+' if magnitude <= i64::MAX as u64 => AssignAction::Score(magnitude as i64),
                _ => {
                    return Err(ConfigError::MalformedToken {
                        index,
                        token: token.to_string(),
                    })
                }
            }
        };

        entries.push(AssignEntry { name, action });
    }

    Ok(AssignTable { entries, all })
}

/// Parse an `<n>.assign=` expression as per-candidate non-negative limits
/// (quota filters). The sign is accepted but carries no meaning; `all` and
/// `remove` are not part of this grammar.
pub(crate) fn parse_limit_table(
    index: u32,
    raw: &str,
    directory: &dyn CandidateDirectory,
) -> Result<Vec<(String, u32)>, ConfigError> {
    let mut limits = Vec::new();

    for token in split_tokens(raw) {
        let (name_token, _sign, value) = split_token(index, token)?;
        let name = directory
            .resolve(name_token)
            .ok_or_else(|| ConfigError::UnknownCandidate {
                index,
                token: name_token.to_string(),
            })?;
        let limit: u32 = value.parse().map_err(|_| ConfigError::MalformedToken {
            index,
            token: token.to_string(),
        })?;
        limits.push((name, limit));
    }

    Ok(limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::testing::MockDirectory;

    fn directory() -> MockDirectory {
        MockDirectory::new(["Slave1", "Slave2", "fast-array"])
    }

    #[test]
    fn parses_signed_tokens_with_comma_and_space_separators() {
        let table = parse_assign_table(1, "slave1+10, slave2-5 fast-array+3", &directory()).unwrap();
        assert!(!table.all);
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.entries[0].name, "Slave1");
        assert_eq!(table.entries[0].action, AssignAction::Score(10));
        assert_eq!(table.entries[1].action, AssignAction::Score(-5));
        assert_eq!(table.entries[2].name, "fast-array");
        assert_eq!(table.entries[2].action, AssignAction::Score(3));
    }

    #[test]
    fn all_wildcard_sets_flag() {
        let table = parse_assign_table(1, "all", &directory()).unwrap();
        assert!(table.all);
        assert!(table.entries.is_empty());
    }

    #[test]
    fn remove_keyword_parses_to_exclude() {
        let table = parse_assign_table(1, "slave1-remove", &directory()).unwrap();
        assert_eq!(table.entries[0].action, AssignAction::Exclude);
    }

    #[test]
    fn minimum_integer_sentinel_parses_to_exclude() {
        let raw = format!("slave1-{}", i64::MIN.unsigned_abs());
        let table = parse_assign_table(1, &raw, &directory()).unwrap();
        assert_eq!(table.entries[0].action, AssignAction::Exclude);
    }

    #[test]
    fn token_without_sign_is_fatal() {
        let err = parse_assign_table(4, "slave1", &directory()).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedToken { index: 4, .. }));
    }

    #[test]
    fn unknown_candidate_is_fatal() {
        let err = parse_assign_table(2, "ghost+10", &directory()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownCandidate { index: 2, ref token } if token == "ghost"
        ));
    }

    #[test]
    fn candidate_tokens_resolve_case_insensitively() {
        let table = parse_assign_table(1, "SLAVE1+1 slave2+2", &directory()).unwrap();
        assert_eq!(table.entries[0].name, "Slave1");
        assert_eq!(table.entries[1].name, "Slave2");
    }

    #[test]
    fn limit_table_ignores_sign_and_rejects_keywords() {
        let limits = parse_limit_table(1, "slave1+10 slave2-5", &directory()).unwrap();
        assert_eq!(limits, vec![("Slave1".to_string(), 10), ("Slave2".to_string(), 5)]);

        assert!(parse_limit_table(1, "slave1-remove", &directory()).is_err());
        assert!(parse_limit_table(1, "all", &directory()).is_err());
    }
}
