// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selection configuration: ordered, integer-keyed directive groups.
//!
//! The operator declares the filter chain in a plain-text file of the shape:
//!
//! ```text
//! # master-side chain
//! 1.filter=assign
//! 1.assign=slave1+10 slave2+5
//! 2.filter=maxtransfers
//! 2.assign=slave1+3
//! 2.match=.*
//! 2.negate.expression=false
//! ```
//!
//! Groups execute in strictly ascending index order regardless of
//! declaration order in the file. Any malformed entry is fatal at load
//! time, reported with the offending index — a misconfigured chain must
//! never silently run partial rules.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// Fatal configuration error raised while loading a filter chain.
///
/// No partial chain is ever installed: the first error aborts assembly.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: malformed directive '{text}'")]
    MalformedLine { line: usize, text: String },

    #[error("filter {index}: unknown filter type '{kind}'")]
    UnknownFilter { index: u32, kind: String },

    #[error("filter {index}: missing required parameter '{key}'")]
    MissingParameter { index: u32, key: String },

    #[error("filter {index}: malformed assignment token '{token}'")]
    MalformedToken { index: u32, token: String },

    #[error("filter {index}: unknown candidate '{token}'")]
    UnknownCandidate { index: u32, token: String },

    #[error("filter {index}: invalid pattern")]
    InvalidPattern {
        index: u32,
        #[source]
        source: regex::Error,
    },

    #[error("filter {index}: invalid value '{value}' for '{key}'")]
    InvalidValue {
        index: u32,
        key: String,
        value: String,
    },

    #[error("failed to read selection configuration from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parsed directive groups, ordered by integer key.
#[derive(Debug, Default, Clone)]
pub struct DirectiveSet {
    groups: BTreeMap<u32, BTreeMap<String, String>>,
}

impl DirectiveSet {
    /// Load directives from a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Group indices in strictly ascending order.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up an optional parameter of group `index`.
    pub fn get(&self, index: u32, key: &str) -> Option<&str> {
        self.groups
            .get(&index)
            .and_then(|group| group.get(key))
            .map(String::as_str)
    }

    /// Look up a required parameter of group `index`.
    pub fn require(&self, index: u32, key: &str) -> Result<&str, ConfigError> {
        self.get(index, key).ok_or_else(|| ConfigError::MissingParameter {
            index,
            key: key.to_string(),
        })
    }

    /// Parse an optional boolean parameter, defaulting when absent.
    pub fn flag(&self, index: u32, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(index, key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    index,
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            },
        }
    }
}

impl FromStr for DirectiveSet {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut groups: BTreeMap<u32, BTreeMap<String, String>> = BTreeMap::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = || ConfigError::MalformedLine {
                line: line_no + 1,
                text: raw.trim().to_string(),
            };

            let (key, value) = line.split_once('=').ok_or_else(malformed)?;
            let (index, param) = key.trim().split_once('.').ok_or_else(malformed)?;
            let index: u32 = index.trim().parse().map_err(|_| malformed())?;
            let param = param.trim();
            if param.is_empty() {
                return Err(malformed());
            }

            // Last declaration wins, matching properties-file semantics.
            groups
                .entry(index)
                .or_default()
                .insert(param.to_string(), value.trim().to_string());
        }

        Ok(Self { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_in_ascending_index_order() {
        let directives: DirectiveSet = "\
            7.filter=assign\n\
            2.filter=maxtransfers\n\
            2.match=.*\n\
            10.filter=minfreespace\n"
            .parse()
            .unwrap();

        let order: Vec<u32> = directives.indices().collect();
        assert_eq!(order, vec![2, 7, 10]);
        assert_eq!(directives.get(2, "match"), Some(".*"));
        assert_eq!(directives.require(7, "filter").unwrap(), "assign");
    }

    #[test]
    fn tolerates_comments_and_blank_lines() {
        let directives: DirectiveSet = "\n# chain\n\n1.filter=assign\n"
            .parse()
            .unwrap();
        assert_eq!(directives.len(), 1);
    }

    #[test]
    fn dotted_parameter_names_are_kept_whole() {
        let directives: DirectiveSet = "3.negate.expression=true\n".parse().unwrap();
        assert!(directives.flag(3, "negate.expression", false).unwrap());
    }

    #[test]
    fn rejects_line_without_index() {
        let err = "filter=assign\n".parse::<DirectiveSet>().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn rejects_line_without_separator() {
        let err = "1.filter assign\n".parse::<DirectiveSet>().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { .. }));
    }

    #[test]
    fn missing_required_parameter_names_index_and_key() {
        let directives: DirectiveSet = "1.filter=assign\n".parse().unwrap();
        let err = directives.require(1, "assign").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingParameter { index: 1, ref key } if key == "assign"
        ));
    }

    #[test]
    fn invalid_flag_value_is_fatal() {
        let directives: DirectiveSet = "1.negate.expression=maybe\n".parse().unwrap();
        assert!(directives.flag(1, "negate.expression", false).is_err());
    }
}
