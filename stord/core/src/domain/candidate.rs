// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Candidate capability interface.
//!
//! A *candidate* is one routable resource — a remote storage slave on the
//! master, or a local disk root on a slave. The selection engine is generic
//! over this interface so the scoreboard, filter chain and resolver are
//! written once and shared by both variants.
//!
//! Candidates are owned by a longer-lived registry
//! (`infrastructure::slaves::SlaveManager` / `infrastructure::roots::RootCollection`);
//! the engine only borrows `Arc` handles for the duration of one request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on any single live-status fetch. A slave status query may
/// involve a network round-trip; a fetch that does not answer within this
/// window is treated as "status unavailable" for the current request only.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Point-in-time snapshot of one candidate's live metrics.
///
/// A snapshot is copied out of the owning registry's atomic counters per
/// candidate per request. Staleness against concurrently completing
/// transfers is an accepted race, not a correctness bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateStatus {
    /// Whether the candidate can accept work right now.
    pub available: bool,
    /// Number of transfers the candidate is currently serving.
    pub active_transfers: u32,
    /// Free space in bytes on the candidate.
    pub free_space: u64,
}

/// Failure to obtain a live status snapshot.
///
/// Never fatal: a candidate whose status cannot be fetched is eliminated
/// from the current request's scoreboard only and remains eligible for
/// future requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("candidate is offline")]
    Offline,
    #[error("status query timed out")]
    Timeout,
    #[error("status probe failed: {0}")]
    Probe(String),
}

/// Capability interface every routable resource implements.
#[async_trait]
pub trait SelectionCandidate: Send + Sync + 'static {
    /// Stable name, unique within the owning registry under
    /// case-insensitive comparison.
    fn name(&self) -> &str;

    /// Fetch a fresh status snapshot. May block the requesting session's
    /// task (network round-trip or local syscall), never other sessions'.
    async fn live_status(&self) -> Result<CandidateStatus, StatusError>;
}

/// Fetch a candidate's status under the implicit [`STATUS_TIMEOUT`].
pub async fn fetch_status<C: SelectionCandidate>(candidate: &C) -> Result<CandidateStatus, StatusError> {
    match tokio::time::timeout(STATUS_TIMEOUT, candidate.live_status()).await {
        Ok(result) => result,
        Err(_) => Err(StatusError::Timeout),
    }
}

/// Canonical case-folded form of a candidate name, used for every lookup
/// and configuration match.
pub fn fold_name(name: &str) -> String {
    name.to_ascii_lowercase()
}
