// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path-conditional assignment filter.
//!
//! Applies a static assignment table only when the request path matches a
//! case-insensitive pattern (or does not match, with `negate.expression`):
//!
//! ```text
//! 2.filter=matchdir
//! 2.assign=slave1+100 slave2-remove
//! 2.match=/archive/.*
//! 2.negate.expression=false
//! ```
//!
//! Typical use: pin a section of the tree to specific slaves, or keep it
//! off them entirely.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::application::filters::{
    parse_assign_table, AssignTable, CandidateDirectory, SelectionFilter,
};
use crate::domain::candidate::SelectionCandidate;
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

pub(crate) const KIND: &str = "matchdir";

#[derive(Debug)]
pub struct MatchdirFilter {
    index: u32,
    table: AssignTable,
    pattern: Regex,
    negate: bool,
}

impl MatchdirFilter {
    pub fn from_directives(
        index: u32,
        directives: &DirectiveSet,
        directory: &dyn CandidateDirectory,
    ) -> Result<Self, ConfigError> {
        let table = parse_assign_table(index, directives.require(index, "assign")?, directory)?;
        let pattern = RegexBuilder::new(directives.require(index, "match")?)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern { index, source })?;
        let negate = directives.flag(index, "negate.expression", false)?;
        Ok(Self {
            index,
            table,
            pattern,
            negate,
        })
    }
}

pub(crate) fn parse<C: SelectionCandidate>(
    index: u32,
    directives: &DirectiveSet,
    directory: &dyn CandidateDirectory,
) -> Result<Box<dyn SelectionFilter<C>>, ConfigError> {
    Ok(Box::new(MatchdirFilter::from_directives(
        index, directives, directory,
    )?))
}

#[async_trait]
impl<C: SelectionCandidate> SelectionFilter<C> for MatchdirFilter {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn apply(&self, ctx: &RequestContext, board: &mut Scoreboard<C>) {
        let path_matches = self.negate != self.pattern.find(&ctx.path).is_some();
        if !path_matches {
            debug!(filter = self.index, path = %ctx.path, "path not matched, assignment skipped");
            return;
        }
        self.table.apply(board);
        debug!(
            filter = self.index,
            remaining = board.len(),
            "path-conditional assignment applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::candidate::testing::{MockCandidate, MockDirectory};

    fn filter(assign: &str, pattern: &str, negate: bool) -> MatchdirFilter {
        let directives: DirectiveSet = format!(
            "2.filter=matchdir\n2.assign={assign}\n2.match={pattern}\n2.negate.expression={negate}\n"
        )
        .parse()
        .unwrap();
        let directory = MockDirectory::new(["slave1", "slave2"]);
        MatchdirFilter::from_directives(2, &directives, &directory).unwrap()
    }

    fn board() -> Scoreboard<MockCandidate> {
        Scoreboard::new(
            ["slave1", "slave2"]
                .iter()
                .map(|n| Arc::new(MockCandidate::online(n, 0, 0))),
        )
    }

    #[tokio::test]
    async fn assigns_on_matching_path() {
        let f = filter("slave1+100", "/archive/.*", false);
        let mut board = board();
        let ctx = RequestContext::upload("/ARCHIVE/2026/file.rar", "u");

        f.apply(&ctx, &mut board).await;

        // Pattern match is case-insensitive.
        assert_eq!(board.score_of("slave1"), Some(100));
        assert_eq!(board.score_of("slave2"), Some(0));
    }

    #[tokio::test]
    async fn skips_on_non_matching_path() {
        let f = filter("slave1+100", "/archive/.*", false);
        let mut board = board();
        let ctx = RequestContext::upload("/incoming/file.rar", "u");

        f.apply(&ctx, &mut board).await;

        assert_eq!(board.score_of("slave1"), Some(0));
    }

    #[tokio::test]
    async fn negate_inverts_the_match() {
        let f = filter("slave2-remove", "/archive/.*", true);
        let mut board = board();

        f.apply(&RequestContext::upload("/archive/x", "u"), &mut board)
            .await;
        assert!(board.contains("slave2"));

        f.apply(&RequestContext::upload("/incoming/x", "u"), &mut board)
            .await;
        assert!(!board.contains("slave2"));
    }

    #[test]
    fn invalid_pattern_is_fatal_at_load() {
        let directives: DirectiveSet =
            "2.filter=matchdir\n2.assign=slave1+1\n2.match=[unclosed\n"
                .parse()
                .unwrap();
        let directory = MockDirectory::new(["slave1"]);
        let err = MatchdirFilter::from_directives(2, &directives, &directory).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { index: 2, .. }));
    }
}
