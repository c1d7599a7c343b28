// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selection engine: the `select` entry point.
//!
//! A pure decision procedure: seed a fresh scoreboard with the supplied
//! live candidates, run the configured chain, resolve the tie set. One
//! execution per request, single-threaded within the requesting session's
//! task. If the session disconnects mid-evaluation the result is simply
//! discarded — nothing here holds external resources.

use std::sync::Arc;

use tracing::warn;

use crate::application::chain::FilterChain;
use crate::application::resolver::{resolve, SelectionError};
use crate::domain::candidate::SelectionCandidate;
use crate::domain::context::RequestContext;
use crate::domain::scoreboard::Scoreboard;

pub struct SelectionEngine<C: SelectionCandidate> {
    chain: FilterChain<C>,
}

impl<C: SelectionCandidate> SelectionEngine<C> {
    pub fn new(chain: FilterChain<C>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &FilterChain<C> {
        &self.chain
    }

    /// Run one selection over the given live candidates.
    ///
    /// Returns the full tie set at the maximum score, or
    /// [`SelectionError::NoCandidateAvailable`] when the chain eliminated
    /// everything (or the candidate set was empty to begin with).
    pub async fn select(
        &self,
        ctx: &RequestContext,
        candidates: Vec<Arc<C>>,
    ) -> Result<Vec<Arc<C>>, SelectionError> {
        let mut board = Scoreboard::new(candidates);
        self.chain.run(ctx, &mut board).await;

        match resolve(&board) {
            Ok(winners) => Ok(winners),
            Err(err) => {
                warn!(path = %ctx.path, direction = ?ctx.direction, "no candidate available after filter chain");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::filters::FilterRegistry;
    use crate::domain::candidate::testing::{MockCandidate, MockDirectory};
    use crate::domain::config::DirectiveSet;

    fn engine(config: &str, names: &[&str]) -> SelectionEngine<MockCandidate> {
        let directives: DirectiveSet = config.parse().unwrap();
        let directory = MockDirectory::new(names.iter().map(|n| n.to_string()));
        let chain =
            FilterChain::assemble(&directives, &directory, &FilterRegistry::builtin()).unwrap();
        SelectionEngine::new(chain)
    }

    #[tokio::test]
    async fn empty_candidate_set_reports_no_candidate() {
        let engine = engine("1.filter=assign\n1.assign=all\n", &["slave1"]);
        let err = engine
            .select(&RequestContext::upload("/x", "u"), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, SelectionError::NoCandidateAvailable);
    }

    #[tokio::test]
    async fn assign_then_quota_scenario() {
        // chain = [Assign(slave1+10 slave2+5), Quota(.*, limits slave1:3)]
        // slave1 active=5 exceeds its limit and is removed; slave2 wins.
        let engine = engine(
            "1.filter=assign\n\
             1.assign=slave1+10 slave2+5\n\
             2.filter=maxtransfers\n\
             2.assign=slave1+3\n\
             2.match=.*\n\
             2.negate.expression=false\n",
            &["slave1", "slave2"],
        );

        let slave1 = Arc::new(MockCandidate::online("slave1", 5, 0));
        let slave2 = Arc::new(MockCandidate::online("slave2", 1, 0));

        let winners = engine
            .select(&RequestContext::upload("/incoming/x", "u"), vec![slave1, slave2])
            .await
            .unwrap();

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].name(), "slave2");
    }
}
