// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream LLM client for the Solace gateway.
//!
//! Implements [`solace_core::UpstreamClient`] over HTTP-with-SSE: a
//! streaming POST whose response body is a sequence of `data: {json}`
//! lines terminated by `data: [DONE]`.

pub mod client;
pub mod stream;

pub use client::HttpUpstream;
