//! Configuration options for the negotiation engine and the credential store.

#[cfg(test)]
mod tests;

use crate::{
    consts::{pbkdf2::*, CYRUS_ITERATIONS_MAX, SWEEP_INTERVAL},
    digest::DigestAlgorithm,
    error::ConfigError,
};
use std::time::Duration;

/// Options for the negotiation engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde_derive::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// How many seconds lie between two sweeps for stale sessions.
    pub sweep_secs: u64,
    /// Whether to leave the server's name out of user-facing source names.
    pub hide_server_names: bool,
}

impl Options {
    /// Returns the interval between sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_secs)
    }

    /// Checks that every option is within its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("sweep_secs", self.sweep_secs, 1, 3600)
    }
}

impl Default for Options {
    fn default() -> Self {
        Options { sweep_secs: SWEEP_INTERVAL.as_secs(), hide_server_names: false }
    }
}

/// Options for PBKDF2 password hashes.
///
/// The digest also selects which SCRAM mechanism is offered.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde_derive::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Pbkdf2Options {
    /// The digest used for new hashes.
    pub digest: DigestAlgorithm,
    /// The iteration count used for new hashes.
    pub iterations: u32,
    /// The length of the salt for new hashes, in bytes.
    pub salt_len: usize,
}

impl Pbkdf2Options {
    /// Sets the digest by name.
    pub fn set_digest(&mut self, name: &str) -> Result<(), ConfigError> {
        self.digest = DigestAlgorithm::from_name(name)
            .ok_or_else(|| ConfigError::Unknown("digest", name.to_owned()))?;
        Ok(())
    }

    /// Checks that every option is within its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("iterations", self.iterations.into(), ITERATIONS_MIN.into(), ITERATIONS_MAX.into())?;
        check_range("salt_len", self.salt_len as u64, SALT_LEN_MIN as u64, SALT_LEN_MAX as u64)
    }

    /// Returns `true` if the iteration count is higher than Cyrus SASL clients accept.
    pub fn exceeds_cyrus_limit(&self) -> bool {
        self.iterations > CYRUS_ITERATIONS_MAX
    }
}

impl Default for Pbkdf2Options {
    fn default() -> Self {
        Pbkdf2Options {
            digest: DigestAlgorithm::default(),
            iterations: ITERATIONS_DEFAULT,
            salt_len: SALT_LEN_DEFAULT,
        }
    }
}

fn check_range(option: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { option, value, min, max })
    }
}
