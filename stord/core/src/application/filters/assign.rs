// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Static assignment filter.
//!
//! Grants or penalizes fixed points to named candidates, or removes them
//! outright. Configuration:
//!
//! ```text
//! 1.filter=assign
//! 1.assign=slave1+100 slave2-50
//! ```
//!
//! The disk-root variant is identical with 1-based root indices as tokens
//! (`1.assign=1+200, 2+200`). `all` assigns zero points to every candidate
//! still on the board and eliminates none; `<name>-remove` hard-excludes a
//! candidate regardless of what later filters would score it.

use async_trait::async_trait;
use tracing::debug;

use crate::application::filters::{
    parse_assign_table, AssignTable, CandidateDirectory, SelectionFilter,
};
use crate::domain::candidate::SelectionCandidate;
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

pub(crate) const KIND: &str = "assign";

pub struct AssignFilter {
    index: u32,
    table: AssignTable,
}

impl AssignFilter {
    pub fn from_directives(
        index: u32,
        directives: &DirectiveSet,
        directory: &dyn CandidateDirectory,
    ) -> Result<Self, ConfigError> {
        let table = parse_assign_table(index, directives.require(index, "assign")?, directory)?;
        Ok(Self { index, table })
    }
}

pub(crate) fn parse<C: SelectionCandidate>(
    index: u32,
    directives: &DirectiveSet,
    directory: &dyn CandidateDirectory,
) -> Result<Box<dyn SelectionFilter<C>>, ConfigError> {
    Ok(Box::new(AssignFilter::from_directives(
        index, directives, directory,
    )?))
}

#[async_trait]
impl<C: SelectionCandidate> SelectionFilter<C> for AssignFilter {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn apply(&self, _ctx: &RequestContext, board: &mut Scoreboard<C>) {
        self.table.apply(board);
        debug!(
            filter = self.index,
            remaining = board.len(),
            "static assignment applied"
        );
    }
}
