// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Hashing
//!
//! Hash algorithms exposed through `utils.hash` and used for recording
//! integrity checks. Hashing is a domain concern: the algorithm set and
//! hex encoding are part of the surface contract, not an infrastructure
//! detail.

use crate::error::ShellError;
use sha2::{Digest, Sha256, Sha512};
use std::str::FromStr;

/// Supported content hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            other => Err(ShellError::invalid_argument(format!(
                "unsupported hash algorithm '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

impl HashAlgorithm {
    /// Computes the hex-encoded digest of `data`
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_digest() {
        let alg: HashAlgorithm = "sha256".parse().unwrap();
        assert_eq!(
            alg.digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unknown_algorithm_is_invalid_argument() {
        let err = "md5".parse::<HashAlgorithm>().unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn test_case_insensitive_parse() {
        assert_eq!("SHA-512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
    }
}
