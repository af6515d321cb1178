// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Solace integration tests.
//!
//! Provides in-memory and scripted stand-ins for the two trait seams so
//! the completion pipeline can be tested without disk or network.
//!
//! # Components
//!
//! - [`InMemoryStore`] - in-memory [`solace_core::Store`] with failure injection
//! - [`ScriptedUpstream`] - scripted [`solace_core::UpstreamClient`]

pub mod memory_store;
pub mod mock_upstream;

pub use memory_store::InMemoryStore;
pub use mock_upstream::{ScriptEvent, ScriptedUpstream};
