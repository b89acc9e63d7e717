//! Well-known values and limits for SASL negotiation.
//!
//! These mirror the limits that IRC servers place on `AUTHENTICATE` traffic,
//! so they should only be changed together with the uplink's configuration.

use std::time::Duration;

/// The literal `"*"`.
///
/// Sent by a client in place of data to abort authentication.
pub const STAR: &str = "*";

/// The literal `"+"`.
///
/// Used as a placeholder when a base64-encoded field is empty,
/// and as the terminator after a message that exactly fills its last frame.
pub const PLUS: &str = "+";

/// Maximum length of one base64-encoded frame.
pub const FRAME_LEN: usize = 400;

/// Maximum length of raw data that fits in one frame.
pub const FRAME_LEN_RAW: usize = 300;

/// Maximum length of base64-encoded data that may be buffered as one message.
pub const BUFFER_LEN: usize = 4096;

/// Maximum length of raw data that may be buffered as one message.
pub const BUFFER_LEN_RAW: usize = 3072;

/// Maximum length of a mechanism name.
pub const MECHANISM_NAME_LEN: usize = 59;

/// Maximum length of an account name.
pub const ACCOUNT_NAME_LEN: usize = 50;

/// How often stale sessions are swept.
///
/// A session is destroyed on the second sweep that finds it idle.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum iteration count Cyrus SASL clients will process.
pub const CYRUS_ITERATIONS_MAX: u32 = 0x10000;

/// Limits for SCRAM exchanges.
pub mod scram {
    /// Length of the server's part of the combined nonce.
    pub const NONCE_LEN: usize = 64;
    /// Minimum acceptable client nonce length.
    pub const CLIENT_NONCE_MIN: usize = 8;
    /// Maximum acceptable client nonce length.
    pub const CLIENT_NONCE_MAX: usize = 512;
}

/// Limits for PBKDF2 credentials.
pub mod pbkdf2 {
    /// Minimum iteration count.
    pub const ITERATIONS_MIN: u32 = 10_000;
    /// Maximum iteration count.
    pub const ITERATIONS_MAX: u32 = 5_000_000;
    /// Default iteration count.
    pub const ITERATIONS_DEFAULT: u32 = 64_000;
    /// Minimum salt length in bytes.
    pub const SALT_LEN_MIN: usize = 8;
    /// Maximum salt length in bytes.
    pub const SALT_LEN_MAX: usize = 64;
    /// Default salt length in bytes.
    pub const SALT_LEN_DEFAULT: usize = 32;
}
