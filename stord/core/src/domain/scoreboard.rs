// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-request scoreboard.
//!
//! Built fresh for every selection request with all live candidates seeded
//! at score zero, then handed through the filter chain which adjusts scores
//! or removes rows. Elimination is monotonic within one request: a removed
//! candidate never reappears during the same chain run.
//!
//! Row order follows the order the candidates were supplied in (the owning
//! registry's order). The order carries no weight in scoring; the resolver
//! uses it only to report tie sets deterministically.

use std::sync::Arc;

use crate::domain::candidate::SelectionCandidate;

/// One scoreboard row: a borrowed candidate handle and its running score.
///
/// A row additionally remembers whether any filter ever scored it. Scoring
/// a candidate — even with a zero delta, as the `all` wildcard does — opts
/// it into the eligible set; rows never scored by any filter are dropped
/// when the chain finishes, unless the whole chain scored nothing (purely
/// eliminating chains select among all survivors).
#[derive(Debug)]
pub struct ScoreRow<C: SelectionCandidate> {
    candidate: Arc<C>,
    score: i64,
    eligible: bool,
}

impl<C: SelectionCandidate> ScoreRow<C> {
    pub fn candidate(&self) -> &Arc<C> {
        &self.candidate
    }

    pub fn score(&self) -> i64 {
        self.score
    }
}

/// Mutable per-request score/elimination state over the live candidate set.
///
/// Accessed exclusively through `&mut` by the single task handling the
/// request; there is no concurrent mutation within one chain run.
#[derive(Debug)]
pub struct Scoreboard<C: SelectionCandidate> {
    rows: Vec<ScoreRow<C>>,
}

impl<C: SelectionCandidate> Scoreboard<C> {
    /// Seed every given candidate at score zero, preserving order.
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Arc<C>>,
    {
        Self {
            rows: candidates
                .into_iter()
                .map(|candidate| ScoreRow {
                    candidate,
                    score: 0,
                    eligible: false,
                })
                .collect(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.candidate.name().eq_ignore_ascii_case(name))
    }

    /// Add `delta` to the named candidate's score. No-op when the candidate
    /// is absent (already eliminated or never seeded).
    pub fn add_score(&mut self, name: &str, delta: i64) {
        if let Some(i) = self.position(name) {
            self.rows[i].score = self.rows[i].score.saturating_add(delta);
            self.rows[i].eligible = true;
        }
    }

    /// Drop rows no scoring filter ever opted in. No-op when nothing was
    /// scored during the chain run: chains built purely from eliminating
    /// filters (or an empty chain) select among all surviving rows.
    pub fn prune_ineligible(&mut self) {
        if self.rows.iter().any(|row| row.eligible) {
            self.rows.retain(|row| row.eligible);
        }
    }

    /// Remove the named candidate. Idempotent.
    pub fn exclude(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.rows.remove(i);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn score_of(&self, name: &str) -> Option<i64> {
        self.position(name).map(|i| self.rows[i].score)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current live rows, in seed order.
    pub fn rows(&self) -> impl Iterator<Item = &ScoreRow<C>> {
        self.rows.iter()
    }

    /// Handles of the candidates still present, in seed order.
    pub fn candidates(&self) -> Vec<Arc<C>> {
        self.rows.iter().map(|row| Arc::clone(&row.candidate)).collect()
    }

    /// Names of the candidates still present, in seed order.
    pub fn names(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.candidate.name().to_string())
            .collect()
    }
}
