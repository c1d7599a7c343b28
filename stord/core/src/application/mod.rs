// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides mod functionality for the system.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Filter chain execution, resolution, dispatch services

pub mod chain;
pub mod dispatcher;
pub mod engine;
pub mod filters;
pub mod resolver;
