// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context engine for the Solace gateway: the per-user cache, the prompt
//! assembler, and the intelligence compressor with its bounded result
//! cache.

pub mod abbrev;
pub mod assembler;
pub mod cache;
pub mod comp_cache;
pub mod compressor;
pub mod profiles;

pub use assembler::{assemble, AssemblerInput};
pub use cache::{CachedUser, UserCache};
pub use comp_cache::CompressionCache;
pub use compressor::{compress, CompressedIntelligence, CompressionParams, Strategy};
