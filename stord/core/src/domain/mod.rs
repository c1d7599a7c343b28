// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides mod functionality for the system.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Candidate model, request context, scoreboard, configuration

pub mod candidate;
pub mod config;
pub mod context;
pub mod scoreboard;
