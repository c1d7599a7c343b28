// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatch services: the engine's two callers.
//!
//! The engine guarantees the full tie set; the secondary tie-break is a
//! caller policy. The master-side transfer dispatcher rotates a round-robin
//! cursor over ties; the slave-side disk allocator prefers the tied root
//! with the most free space.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;

use crate::domain::candidate::SelectionCandidate;
use tracing::{debug, info};

use crate::application::chain::FilterChain;
use crate::application::engine::SelectionEngine;
use crate::application::filters::FilterRegistry;
use crate::application::resolver::SelectionError;
use crate::domain::candidate::fetch_status;
use crate::domain::config::DirectiveSet;
use crate::domain::context::RequestContext;
use crate::infrastructure::roots::{DiskRoot, RootCollection};
use crate::infrastructure::slaves::{RemoteSlave, SlaveManager};

/// Master-side caller: routes a client transfer to a slave.
pub struct TransferDispatcher {
    slaves: Arc<SlaveManager>,
    engine: SelectionEngine<RemoteSlave>,
    cursor: AtomicUsize,
}

impl TransferDispatcher {
    pub fn new(slaves: Arc<SlaveManager>, engine: SelectionEngine<RemoteSlave>) -> Self {
        Self {
            slaves,
            engine,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Build a dispatcher from a selection configuration file.
    ///
    /// Any configuration error is fatal: startup aborts rather than
    /// running a partial chain.
    pub fn from_config_file(
        slaves: Arc<SlaveManager>,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let directives = DirectiveSet::from_file(path)?;
        let chain =
            FilterChain::assemble(&directives, &slaves.directory(), &FilterRegistry::builtin())
                .with_context(|| {
                    format!("loading slave selection chain from {}", path.display())
                })?;
        Ok(Self::new(slaves, SelectionEngine::new(chain)))
    }

    /// Pick the slave for one transfer.
    ///
    /// Candidates are the currently online slaves in registration order,
    /// minus the request's source candidate. Ties at the maximum score are
    /// broken round-robin so equally scored slaves share load over time.
    pub async fn select_slave(&self, ctx: &RequestContext) -> Result<Arc<RemoteSlave>, SelectionError> {
        let mut candidates = self.slaves.online_slaves();
        if let Some(source) = &ctx.source_candidate {
            candidates.retain(|s| !s.name().eq_ignore_ascii_case(source));
        }

        let ties = self.engine.select(ctx, candidates).await?;
        let winner = &ties[self.cursor.fetch_add(1, Ordering::Relaxed) % ties.len()];
        debug!(slave = winner.name(), path = %ctx.path, ties = ties.len(), "slave selected");
        Ok(Arc::clone(winner))
    }

    /// Select a slave and account the transfer against it for its lifetime.
    pub async fn dispatch(&self, ctx: &RequestContext) -> Result<TransferGuard, SelectionError> {
        let slave = self.select_slave(ctx).await?;
        let active = slave.transfer_started();
        info!(slave = slave.name(), active, path = %ctx.path, "transfer dispatched");
        Ok(TransferGuard { slave })
    }
}

/// Accounting handle for one dispatched transfer. The slave's active count
/// was incremented at dispatch and is decremented when this guard drops,
/// whether the transfer completed or the session died.
pub struct TransferGuard {
    slave: Arc<RemoteSlave>,
}

impl TransferGuard {
    pub fn slave(&self) -> &Arc<RemoteSlave> {
        &self.slave
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.slave.transfer_finished();
    }
}

/// Slave-side caller: picks the disk root that stores a received file.
pub struct DiskAllocator {
    roots: Arc<RootCollection>,
    engine: SelectionEngine<DiskRoot>,
}

impl DiskAllocator {
    pub fn new(roots: Arc<RootCollection>, engine: SelectionEngine<DiskRoot>) -> Self {
        Self { roots, engine }
    }

    /// Build an allocator from a disk selection configuration file.
    pub fn from_config_file(
        roots: Arc<RootCollection>,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let directives = DirectiveSet::from_file(path)?;
        let chain =
            FilterChain::assemble(&directives, &roots.directory(), &FilterRegistry::builtin())
                .with_context(|| format!("loading disk selection chain from {}", path.display()))?;
        Ok(Self::new(roots, SelectionEngine::new(chain)))
    }

    /// Pick the root for one stored file. Ties are broken toward the root
    /// with the most free space; a root whose probe fails at tie-break time
    /// is treated as having none.
    pub async fn select_root(&self, ctx: &RequestContext) -> Result<Arc<DiskRoot>, SelectionError> {
        let ties = self.engine.select(ctx, self.roots.all_roots()).await?;
        if ties.len() == 1 {
            return Ok(Arc::clone(&ties[0]));
        }

        let statuses = join_all(ties.iter().map(|r| fetch_status(r.as_ref()))).await;
        let mut winner = 0;
        let mut best = 0u64;
        for (i, status) in statuses.into_iter().enumerate() {
            let free = status.map(|s| s.free_space).unwrap_or(0);
            if i == 0 || free > best {
                winner = i;
                best = free;
            }
        }
        debug!(root = ties[winner].name(), path = %ctx.path, ties = ties.len(), "disk root selected");
        Ok(Arc::clone(&ties[winner]))
    }
}
