// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-selection request context.
//!
//! Built once by the caller (transfer dispatcher on the master, disk
//! allocator on a slave) and never mutated during chain execution.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Direction of the operation being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client sends a file to the system.
    Upload,
    /// Client retrieves a file from the system.
    Download,
    /// A slave persists a received file to a local disk root.
    Store,
}

/// Immutable input to one selection request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Target virtual path of the transfer.
    pub path: String,
    pub direction: Direction,
    /// Originating peer, when known.
    pub peer: Option<IpAddr>,
    /// Acting user.
    pub user: String,
    /// Candidate the data originates from (e.g. the source slave of a
    /// mirror transfer). The dispatcher excludes it from the candidate set.
    pub source_candidate: Option<String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, direction: Direction, user: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction,
            peer: None,
            user: user.into(),
            source_candidate: None,
        }
    }

    pub fn upload(path: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(path, Direction::Upload, user)
    }

    pub fn download(path: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(path, Direction::Download, user)
    }

    pub fn store(path: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(path, Direction::Store, user)
    }

    pub fn with_peer(mut self, peer: IpAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn with_source(mut self, candidate: impl Into<String>) -> Self {
        self.source_candidate = Some(candidate.into());
        self
    }
}
