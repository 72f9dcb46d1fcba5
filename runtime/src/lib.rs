// Copyright 2026 GoWild Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! GoWild Scout library: fare scraping through an evasive browser session,
//! plus the route-map and calendar JSON client.
//!
//! This library crate exposes the core modules for the binary and for
//! integration testing.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod model;
pub mod navigation;
pub mod pacing;
pub mod renderer;
pub mod retry;
pub mod routes;
pub mod search;
pub mod stealth;
