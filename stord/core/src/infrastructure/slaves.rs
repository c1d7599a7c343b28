// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote slave registry (master side).
//!
//! The slave-management subsystem registers slaves here and feeds their
//! heartbeat metrics into per-slave atomic counters. The selection engine
//! only ever reads a copied [`CandidateStatus`] snapshot per request —
//! never a live reference — so no locking spans filter evaluation and a
//! counter bumped by a concurrently completing transfer is an accepted
//! stale read.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use crate::application::filters::CandidateDirectory;
use crate::domain::candidate::{fold_name, CandidateStatus, SelectionCandidate, StatusError};

#[derive(Debug, Error)]
#[error("slave '{0}' is already registered")]
pub struct DuplicateSlave(pub String);

/// One remote storage slave, with its last-known live metrics.
///
/// Counter mutation (transfer start/finish, heartbeat updates) is atomic at
/// the counter level and entirely independent of the selection engine.
#[derive(Debug)]
pub struct RemoteSlave {
    name: String,
    online: AtomicBool,
    active_transfers: AtomicU32,
    free_space: AtomicU64,
}

impl RemoteSlave {
    fn new(name: String) -> Self {
        Self {
            name,
            online: AtomicBool::new(false),
            active_transfers: AtomicU32::new(0),
            free_space: AtomicU64::new(0),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    pub fn active_transfers(&self) -> u32 {
        self.active_transfers.load(Ordering::Relaxed)
    }

    /// Record a transfer starting on this slave. Returns the new count.
    pub fn transfer_started(&self) -> u32 {
        self.active_transfers.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a transfer finishing on this slave.
    pub fn transfer_finished(&self) {
        // Saturating: a decrement racing a crash-recovery reset must not wrap.
        let _ = self
            .active_transfers
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Update the free-space gauge from a heartbeat report.
    pub fn update_free_space(&self, bytes: u64) {
        self.free_space.store(bytes, Ordering::Relaxed);
    }
}

#[async_trait]
impl SelectionCandidate for RemoteSlave {
    fn name(&self) -> &str {
        &self.name
    }

    async fn live_status(&self) -> Result<CandidateStatus, StatusError> {
        if !self.is_online() {
            return Err(StatusError::Offline);
        }
        Ok(CandidateStatus {
            available: true,
            active_transfers: self.active_transfers.load(Ordering::Relaxed),
            free_space: self.free_space.load(Ordering::Relaxed),
        })
    }
}

/// Registry of known slaves: case-insensitive name index plus stable
/// registration order (the order scoreboards are seeded in).
#[derive(Default)]
pub struct SlaveManager {
    index: DashMap<String, Arc<RemoteSlave>>,
    order: RwLock<Vec<Arc<RemoteSlave>>>,
}

impl SlaveManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slave under its configured name. Names are unique under
    /// case-insensitive comparison.
    pub fn register(&self, name: &str) -> Result<Arc<RemoteSlave>, DuplicateSlave> {
        let key = fold_name(name);
        if self.index.contains_key(&key) {
            return Err(DuplicateSlave(name.to_string()));
        }
        let slave = Arc::new(RemoteSlave::new(name.to_string()));
        self.index.insert(key, Arc::clone(&slave));
        self.order.write().push(Arc::clone(&slave));
        info!(slave = name, "slave registered");
        Ok(slave)
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<Arc<RemoteSlave>> {
        self.index
            .get(&fold_name(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// All slaves, in registration order.
    pub fn all_slaves(&self) -> Vec<Arc<RemoteSlave>> {
        self.order.read().clone()
    }

    /// Currently online slaves, in registration order.
    pub fn online_slaves(&self) -> Vec<Arc<RemoteSlave>> {
        self.order
            .read()
            .iter()
            .filter(|s| s.is_online())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Load-time token resolver for chain assembly.
    pub fn directory(&self) -> SlaveDirectory<'_> {
        SlaveDirectory { manager: self }
    }

    /// JSON report of every registered slave's last-known state, for the
    /// admin status surface.
    pub fn status_report(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.order
                .read()
                .iter()
                .map(|slave| {
                    serde_json::json!({
                        "name": slave.name(),
                        "online": slave.is_online(),
                        "active_transfers": slave.active_transfers(),
                        "free_space": slave.free_space.load(Ordering::Relaxed),
                    })
                })
                .collect(),
        )
    }
}

/// Resolves configuration tokens against the registered slave names.
pub struct SlaveDirectory<'a> {
    manager: &'a SlaveManager,
}

impl CandidateDirectory for SlaveDirectory<'_> {
    fn resolve(&self, token: &str) -> Option<String> {
        self.manager
            .lookup(token)
            .map(|slave| slave.name().to_string())
    }
}
