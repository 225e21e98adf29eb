// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Cryptographic backend abstraction.
//!
//! The attribute engine needs two services from a crypto provider: SHA-1
//! for key identifiers and random bytes for protocol nonces. Both are
//! reached through [`CryptoBackend`] so the engine itself carries no crypto
//! code.

use crate::error::Result;

#[cfg(feature = "ring-backend")]
mod ring;
#[cfg(feature = "ring-backend")]
pub use self::ring::*;

/// Size of a SHA-1 digest.
pub const SHA1_DIGEST_SIZE: usize = 20;

/// Crypto services consumed by the attribute engine.
pub trait CryptoBackend {
    /// SHA-1 digest of `data`.
    fn sha1(&self, data: &[u8]) -> Result<[u8; SHA1_DIGEST_SIZE]>;

    /// Fill `out` with random bytes.
    fn fill_random(&self, out: &mut [u8]) -> Result<()>;
}
