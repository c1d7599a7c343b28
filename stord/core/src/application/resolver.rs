// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Selection resolution.
//!
//! After the chain runs, the resolver picks the winners from the final
//! scoreboard: the full set of candidates tied at the maximum score, in the
//! board's seed order. Returning the whole tie set — never an arbitrary
//! singleton — lets callers layer any secondary tie-break (round-robin,
//! most free space) without losing information.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::candidate::SelectionCandidate;
use crate::domain::scoreboard::Scoreboard;

/// Per-request selection failure, surfaced to the caller so it can be
/// reported to the end user rather than silently picking nothing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no candidate available")]
    NoCandidateAvailable,
}

/// Pick the tie set at the maximum score from the final scoreboard.
pub fn resolve<C: SelectionCandidate>(
    board: &Scoreboard<C>,
) -> Result<Vec<Arc<C>>, SelectionError> {
    let max = board
        .rows()
        .map(|row| row.score())
        .max()
        .ok_or(SelectionError::NoCandidateAvailable)?;

    Ok(board
        .rows()
        .filter(|row| row.score() == max)
        .map(|row| Arc::clone(row.candidate()))
        .collect())
}
