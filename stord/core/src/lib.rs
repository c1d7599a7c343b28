// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # stord-core
//!
//! Candidate selection engine for the stord distributed file-serving daemon.
//!
//! The master routes each client transfer to one of several storage slaves;
//! each slave routes each stored file to one of its local disk roots. Both
//! decisions run through the same machinery: a per-request [`Scoreboard`]
//! seeded with the live candidate set, an ordered [`FilterChain`] of
//! operator-configured rules that score or eliminate candidates, and a
//! resolver that reports the winning tie set (or a distinct
//! "no candidate available" failure).
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - `domain` — candidate model, request context, scoreboard, directive config
//! - `application` — filters, chain assembly, resolver, engine, dispatchers
//! - `infrastructure` — slave registry and disk-root registry (status providers)
//!
//! [`Scoreboard`]: domain::scoreboard::Scoreboard
//! [`FilterChain`]: application::chain::FilterChain

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
