// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Free-space floor filter.
//!
//! Eliminates candidates whose free space has fallen below a configured
//! floor. Works for both slaves and disk roots:
//!
//! ```text
//! 4.filter=minfreespace
//! 4.minfreespace=10GB
//! ```
//!
//! Size values accept plain bytes or a `KB`/`MB`/`GB`/`TB` suffix.
//! Unreachable candidates are removed, same as the quota filter.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::application::filters::{CandidateDirectory, SelectionFilter};
use crate::domain::candidate::{fetch_status, SelectionCandidate};
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

pub(crate) const KIND: &str = "minfreespace";

#[derive(Debug)]
pub struct MinfreespaceFilter {
    index: u32,
    min_free: u64,
}

impl MinfreespaceFilter {
    pub fn from_directives(
        index: u32,
        directives: &DirectiveSet,
        _directory: &dyn CandidateDirectory,
    ) -> Result<Self, ConfigError> {
        let raw = directives.require(index, "minfreespace")?;
        let min_free = parse_size(raw).ok_or_else(|| ConfigError::InvalidValue {
            index,
            key: "minfreespace".to_string(),
            value: raw.to_string(),
        })?;
        Ok(Self { index, min_free })
    }
}

pub(crate) fn parse<C: SelectionCandidate>(
    index: u32,
    directives: &DirectiveSet,
    directory: &dyn CandidateDirectory,
) -> Result<Box<dyn SelectionFilter<C>>, ConfigError> {
    Ok(Box::new(MinfreespaceFilter::from_directives(
        index, directives, directory,
    )?))
}

/// Parse `"512"`, `"512KB"`, `"10gb"` etc. into bytes.
fn parse_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    let value: u64 = number.trim().parse().ok()?;
    let multiplier: u64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        "t" | "tb" => 1 << 40,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

#[async_trait]
impl<C: SelectionCandidate> SelectionFilter<C> for MinfreespaceFilter {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn apply(&self, _ctx: &RequestContext, board: &mut Scoreboard<C>) {
        let candidates = board.candidates();
        let statuses = join_all(candidates.iter().map(|c| fetch_status(c.as_ref()))).await;

        for (candidate, status) in candidates.iter().zip(statuses) {
            let name = candidate.name();
            match status {
                Ok(status) if status.available => {
                    if status.free_space < self.min_free {
                        debug!(
                            filter = self.index,
                            candidate = name,
                            free = status.free_space,
                            floor = self.min_free,
                            "below free-space floor, removing"
                        );
                        board.exclude(name);
                    }
                }
                Ok(_) => {
                    warn!(filter = self.index, candidate = name, "candidate reports unavailable, removing");
                    board.exclude(name);
                }
                Err(error) => {
                    warn!(filter = self.index, candidate = name, %error, "status unavailable, removing");
                    board.exclude(name);
                }
            }
        }
    }
}
