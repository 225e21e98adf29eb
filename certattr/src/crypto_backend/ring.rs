// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

//! Ring cryptographic backend implementation.

use super::{CryptoBackend, SHA1_DIGEST_SIZE};
use crate::error::Result;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

/// Ring-based cryptographic backend.
pub struct RingBackend;

impl CryptoBackend for RingBackend {
    fn sha1(&self, data: &[u8]) -> Result<[u8; SHA1_DIGEST_SIZE]> {
        log::trace!("Hashing {} bytes with SHA-1", data.len());

        let hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data);
        let mut out = [0u8; SHA1_DIGEST_SIZE];
        out.copy_from_slice(hash.as_ref());
        Ok(out)
    }

    fn fill_random(&self, out: &mut [u8]) -> Result<()> {
        SystemRandom::new().fill(out).map_err(|e| {
            log::error!("Random number generation failed");
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_known_answer() {
        let hash = RingBackend.sha1(b"abc").unwrap();
        assert_eq!(
            hash,
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d
            ]
        );
    }

    #[test]
    fn test_fill_random() {
        let mut nonce = [0u8; 16];
        RingBackend.fill_random(&mut nonce).unwrap();
        let mut other = [0u8; 16];
        RingBackend.fill_random(&mut other).unwrap();
        assert_ne!(nonce, other);
    }
}
