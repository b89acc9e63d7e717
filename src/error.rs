//! Error types.

/// Errors from reassembling chunked client data.
#[derive(Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum FrameError {
    /// A single frame is longer than the frame length limit.
    Oversized(usize),
    /// The buffered data would exceed the message length limit.
    Overflow,
    /// The reassembled message is not valid base64.
    Decode(base64::DecodeError),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Oversized(len) => write!(f, "frame of {len} bytes is too long"),
            FrameError::Overflow => write!(f, "client has exceeded allowed data length"),
            FrameError::Decode(e) => write!(f, "invalid base64: {e}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<base64::DecodeError> for FrameError {
    fn from(value: base64::DecodeError) -> Self {
        FrameError::Decode(value)
    }
}

impl From<FrameError> for std::io::Error {
    fn from(value: FrameError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}

/// Errors from parsing a SCRAM attribute list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum AttrError {
    /// The attribute list is empty.
    Empty,
    /// An attribute name is not a single ASCII letter.
    InvalidName(u8),
    /// An attribute appears more than once.
    Duplicate(u8),
    /// An attribute has no value.
    MissingValue(u8),
}

impl std::fmt::Display for AttrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrError::Empty => write!(f, "empty attribute list"),
            AttrError::InvalidName(b) => write!(f, "invalid attribute name '{}'", b.escape_ascii()),
            AttrError::Duplicate(b) => write!(f, "duplicated attribute '{}'", *b as char),
            AttrError::MissingValue(b) => write!(f, "attribute '{}' without value", *b as char),
        }
    }
}

impl std::error::Error for AttrError {}

impl From<AttrError> for std::io::Error {
    fn from(value: AttrError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}

/// Errors from encoding or deriving stored credentials.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum CredentialError {
    /// The system random number generator failed.
    Random,
    /// The iteration count is zero.
    ZeroIterations,
    /// The credential's keys do not match its digest length.
    KeyLength,
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Random => write!(f, "random number generator failed"),
            CredentialError::ZeroIterations => write!(f, "iteration count is zero"),
            CredentialError::KeyLength => write!(f, "key length does not match digest"),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<CredentialError> for std::io::Error {
    fn from(value: CredentialError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, value)
    }
}

/// Errors from validating configuration options.
#[derive(Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric option is outside of its permitted range.
    OutOfRange {
        /// The name of the option.
        option: &'static str,
        /// The rejected value.
        value: u64,
        /// The smallest permitted value.
        min: u64,
        /// The largest permitted value.
        max: u64,
    },
    /// An option names something that does not exist.
    Unknown(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::OutOfRange { option, value, min, max } => {
                write!(f, "{option} is {value}, must be between {min} and {max}")
            }
            ConfigError::Unknown(option, value) => write!(f, "unknown {option}: \"{value}\""),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for std::io::Error {
    fn from(value: ConfigError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, value)
    }
}
