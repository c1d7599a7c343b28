// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filter chain assembly and execution.
//!
//! A chain is assembled once at startup from a [`DirectiveSet`] and executed
//! in full for every selection request, in strictly ascending index order.
//! Any malformed directive aborts assembly — a misconfigured chain must not
//! silently run partial rules.

use tracing::{debug, info};

use crate::application::filters::{CandidateDirectory, FilterRegistry, SelectionFilter};
use crate::domain::candidate::SelectionCandidate;
use crate::domain::config::{ConfigError, DirectiveSet};
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

struct ChainEntry<C: SelectionCandidate> {
    index: u32,
    filter: Box<dyn SelectionFilter<C>>,
}

/// Ordered sequence of configured selection filters.
pub struct FilterChain<C: SelectionCandidate> {
    entries: Vec<ChainEntry<C>>,
}

impl<C: SelectionCandidate> std::fmt::Debug for FilterChain<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.entries.len())
            .finish()
    }
}

impl<C: SelectionCandidate> FilterChain<C> {
    /// Chain with no filters: every live candidate stays at score zero.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Assemble a chain from parsed directives.
    ///
    /// Directive groups are visited in ascending index order regardless of
    /// their declaration order. Unknown filter types, malformed parameters
    /// and unresolvable candidate tokens are fatal.
    pub fn assemble(
        directives: &DirectiveSet,
        directory: &dyn CandidateDirectory,
        registry: &FilterRegistry<C>,
    ) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(directives.len());

        for index in directives.indices() {
            let kind = directives.require(index, "filter")?;
            let parser = registry.get(kind).ok_or_else(|| ConfigError::UnknownFilter {
                index,
                kind: kind.to_string(),
            })?;
            let filter = parser(index, directives, directory)?;
            debug!(index, kind, "selection filter configured");
            entries.push(ChainEntry { index, filter });
        }

        info!(filters = entries.len(), "selection filter chain assembled");
        Ok(Self { entries })
    }

    /// Run every filter, in order, against the scoreboard.
    ///
    /// Once the chain finishes, rows no filter ever scored are dropped:
    /// assignment filters document eligibility, so a candidate a non-`all`
    /// assignment never named stays at its default exclusion. Chains that
    /// score nothing (only eliminate) keep every surviving row.
    pub async fn run(&self, ctx: &RequestContext, board: &mut Scoreboard<C>) {
        for entry in &self.entries {
            entry.filter.apply(ctx, board).await;
            debug!(
                index = entry.index,
                kind = entry.filter.kind(),
                remaining = board.len(),
                "selection filter executed"
            );
        }
        board.prune_ineligible();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(index, kind)` pairs in execution order.
    pub fn layout(&self) -> Vec<(u32, &'static str)> {
        self.entries
            .iter()
            .map(|entry| (entry.index, entry.filter.kind()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::testing::{MockCandidate, MockDirectory};

    fn directory() -> MockDirectory {
        MockDirectory::new(["slave1", "slave2"])
    }

    #[test]
    fn execution_order_follows_index_not_declaration_order() {
        let directives: DirectiveSet = "\
            9.filter=minfreespace\n\
            9.minfreespace=1GB\n\
            1.filter=assign\n\
            1.assign=slave1+10\n\
            5.filter=maxtransfers\n\
            5.assign=slave1+3\n\
            5.match=.*\n"
            .parse()
            .unwrap();

        let chain: FilterChain<MockCandidate> =
            FilterChain::assemble(&directives, &directory(), &FilterRegistry::builtin()).unwrap();

        assert_eq!(
            chain.layout(),
            vec![(1, "assign"), (5, "maxtransfers"), (9, "minfreespace")]
        );
    }

    #[test]
    fn unknown_filter_type_is_fatal() {
        let directives: DirectiveSet = "1.filter=teleport\n".parse().unwrap();
        let err = FilterChain::<MockCandidate>::assemble(
            &directives,
            &directory(),
            &FilterRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownFilter { index: 1, ref kind } if kind == "teleport"
        ));
    }

    #[test]
    fn group_without_filter_directive_is_fatal() {
        let directives: DirectiveSet = "1.assign=slave1+10\n".parse().unwrap();
        let err = FilterChain::<MockCandidate>::assemble(
            &directives,
            &directory(),
            &FilterRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { index: 1, .. }));
    }

    #[test]
    fn malformed_parameter_aborts_whole_assembly() {
        // Filter 1 is fine; filter 2 carries a bad token. No partial chain.
        let directives: DirectiveSet = "\
            1.filter=assign\n\
            1.assign=slave1+10\n\
            2.filter=assign\n\
            2.assign=slave1\n"
            .parse()
            .unwrap();
        let err = FilterChain::<MockCandidate>::assemble(
            &directives,
            &directory(),
            &FilterRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedToken { index: 2, .. }));
    }

    #[tokio::test]
    async fn empty_chain_leaves_board_untouched() {
        use std::sync::Arc;
        let chain: FilterChain<MockCandidate> = FilterChain::empty();
        let mut board = Scoreboard::new([Arc::new(MockCandidate::online("slave1", 0, 0))]);
        chain
            .run(&RequestContext::upload("/x", "u"), &mut board)
            .await;
        assert_eq!(board.score_of("slave1"), Some(0));
    }
}
