// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the gateway core and its collaborators.
//!
//! The orchestrator depends only on these traits, so tests can swap in
//! in-memory stores and scripted upstreams without touching the pipeline.

pub mod store;
pub mod upstream;

pub use store::Store;
pub use upstream::{DeltaStream, UpstreamClient};
