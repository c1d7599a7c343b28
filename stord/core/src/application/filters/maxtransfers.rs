// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-candidate transfer quota filter.
//!
//! Eliminates candidates that are already serving more transfers than their
//! configured limit, on paths matching a case-insensitive pattern:
//!
//! ```text
//! 3.filter=maxtransfers
//! 3.assign=slave1+10 slave2+5
//! 3.match=.*
//! 3.negate.expression=false
//! ```
//!
//! allows up to 10 concurrent transfers on slave1 and 5 on slave2. This
//! filter never adds score; it only eliminates. A candidate whose live
//! status cannot be fetched is removed unconditionally — unreachability
//! always disqualifies, regardless of the match outcome.

use async_trait::async_trait;
use futures::future::join_all;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::application::filters::{parse_limit_table, CandidateDirectory, SelectionFilter};
use crate::domain::candidate::{fetch_status, SelectionCandidate};
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

pub(crate) const KIND: &str = "maxtransfers";

pub struct MaxtransfersFilter {
    index: u32,
    limits: Vec<(String, u32)>,
    pattern: Regex,
    negate: bool,
}

impl MaxtransfersFilter {
    pub fn from_directives(
        index: u32,
        directives: &DirectiveSet,
        directory: &dyn CandidateDirectory,
    ) -> Result<Self, ConfigError> {
        let limits = parse_limit_table(index, directives.require(index, "assign")?, directory)?;
        let pattern = RegexBuilder::new(directives.require(index, "match")?)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern { index, source })?;
        let negate = directives.flag(index, "negate.expression", false)?;
        Ok(Self {
            index,
            limits,
            pattern,
            negate,
        })
    }

    fn limit_for(&self, name: &str) -> Option<u32> {
        self.limits
            .iter()
            .find(|(configured, _)| configured.eq_ignore_ascii_case(name))
            .map(|(_, limit)| *limit)
    }
}

pub(crate) fn parse<C: SelectionCandidate>(
    index: u32,
    directives: &DirectiveSet,
    directory: &dyn CandidateDirectory,
) -> Result<Box<dyn SelectionFilter<C>>, ConfigError> {
    Ok(Box::new(MaxtransfersFilter::from_directives(
        index, directives, directory,
    )?))
}

#[async_trait]
impl<C: SelectionCandidate> SelectionFilter<C> for MaxtransfersFilter {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn apply(&self, ctx: &RequestContext, board: &mut Scoreboard<C>) {
        let path_matches = self.negate != self.pattern.find(&ctx.path).is_some();

        let candidates = board.candidates();
        let statuses = join_all(candidates.iter().map(|c| fetch_status(c.as_ref()))).await;

        for (candidate, status) in candidates.iter().zip(statuses) {
            let name = candidate.name();
            let status = match status {
                Ok(status) if status.available => status,
                Ok(_) => {
                    warn!(filter = self.index, candidate = name, "candidate reports unavailable, removing");
                    board.exclude(name);
                    continue;
                }
                Err(error) => {
                    warn!(filter = self.index, candidate = name, %error, "status unavailable, removing");
                    board.exclude(name);
                    continue;
                }
            };

            if !path_matches {
                continue;
            }
            if let Some(limit) = self.limit_for(name) {
                if status.active_transfers > limit {
                    debug!(
                        filter = self.index,
                        candidate = name,
                        active = status.active_transfers,
                        limit,
                        "transfer quota exceeded, removing"
                    );
                    board.exclude(name);
                }
            }
        }
    }
}
