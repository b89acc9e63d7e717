//! Digest algorithms usable for SCRAM and PBKDF2 credentials.

use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// A digest algorithm supported by SCRAM.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde_derive::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DigestAlgorithm {
    /// SHA-1. Only present for older clients.
    #[cfg_attr(feature = "serde", serde(alias = "SHA-1"))]
    Sha1,
    /// SHA-256.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "SHA-256"))]
    Sha256,
    /// SHA-512.
    #[cfg_attr(feature = "serde", serde(alias = "SHA-512"))]
    Sha512,
}

impl DigestAlgorithm {
    /// Every supported algorithm, weakest first.
    pub const ALL: [DigestAlgorithm; 3] =
        [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512];

    /// Returns the output length of this digest in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Returns the name of the SCRAM mechanism that uses this digest.
    pub const fn scram_name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SCRAM-SHA-1",
            DigestAlgorithm::Sha256 => "SCRAM-SHA-256",
            DigestAlgorithm::Sha512 => "SCRAM-SHA-512",
        }
    }

    /// Returns the PRF identifier used in stored hashes.
    pub const fn prf_id(self) -> u32 {
        match self {
            DigestAlgorithm::Sha1 => 64,
            DigestAlgorithm::Sha256 => 65,
            DigestAlgorithm::Sha512 => 66,
        }
    }

    /// Looks up an algorithm by its stored-hash PRF identifier.
    pub const fn from_prf_id(id: u32) -> Option<Self> {
        match id {
            64 => Some(DigestAlgorithm::Sha1),
            65 => Some(DigestAlgorithm::Sha256),
            66 => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Looks up an algorithm by name, ignoring ASCII case and an optional hyphen.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_uppercase();
        match name.as_str() {
            "SHA1" | "SHA-1" => Some(DigestAlgorithm::Sha1),
            "SHA256" | "SHA-256" => Some(DigestAlgorithm::Sha256),
            "SHA512" | "SHA-512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Returns the names of the SCRAM mechanisms that use other digests.
    ///
    /// Used to hide mechanisms that cannot succeed against a credential using this digest.
    pub fn avoid_list(self) -> Vec<&'static str> {
        Self::ALL.iter().filter(|a| **a != self).map(|a| a.scram_name()).collect()
    }

    fn hmac_algorithm(self) -> ring::hmac::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => ring::hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => ring::hmac::HMAC_SHA256,
            DigestAlgorithm::Sha512 => ring::hmac::HMAC_SHA512,
        }
    }

    fn digest_algorithm(self) -> &'static ring::digest::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &ring::digest::SHA256,
            DigestAlgorithm::Sha512 => &ring::digest::SHA512,
        }
    }

    fn pbkdf2_algorithm(self) -> ring::pbkdf2::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => ring::pbkdf2::PBKDF2_HMAC_SHA1,
            DigestAlgorithm::Sha256 => ring::pbkdf2::PBKDF2_HMAC_SHA256,
            DigestAlgorithm::Sha512 => ring::pbkdf2::PBKDF2_HMAC_SHA512,
        }
    }

    /// Computes a keyed hash over the concatenation of `parts`.
    pub fn hmac(self, key: &[u8], parts: &[&[u8]]) -> Zeroizing<Vec<u8>> {
        let key = ring::hmac::Key::new(self.hmac_algorithm(), key);
        let mut ctx = ring::hmac::Context::with_key(&key);
        for part in parts {
            ctx.update(part);
        }
        Zeroizing::new(ctx.sign().as_ref().to_vec())
    }

    /// Computes an unkeyed hash of `data`.
    pub fn hash(self, data: &[u8]) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(ring::digest::digest(self.digest_algorithm(), data).as_ref().to_vec())
    }

    /// Derives a key of digest length from `secret` using PBKDF2.
    pub fn pbkdf2(self, iterations: NonZeroU32, salt: &[u8], secret: &[u8]) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; self.output_len()]);
        ring::pbkdf2::derive(self.pbkdf2_algorithm(), iterations, salt, secret, &mut out);
        out
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}
