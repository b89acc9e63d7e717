/// Basic IRC-style casemapping.
///
/// Does not map UTF-8 characters, but preserves UTF-8 validity.
/// Maps from uppercase to lowercase.
///
/// Account names are compared after casemapping,
/// so two names that casemap to the same string name the same account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde_derive::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[non_exhaustive]
pub enum IrcCasemap {
    /// ASCII lowercase mapping.
    Ascii,
    /// ASCII casemapping, plus `[\]` are mapped to `{|}`.
    Rfc1459Strict,
    /// RFC-1459 strict casemapping, plus `~` is mapped to `^`.
    #[default]
    Rfc1459,
}

impl IrcCasemap {
    /// Creates a casemap from the given name.
    pub fn from_name(name: &[u8]) -> Option<IrcCasemap> {
        match name {
            b"ascii" => Some(IrcCasemap::Ascii),
            b"rfc1459" => Some(IrcCasemap::Rfc1459),
            b"rfc1459-strict" => Some(IrcCasemap::Rfc1459Strict),
            _ => None,
        }
    }

    /// Maps one byte.
    ///
    /// Bytes outside of the ASCII range are returned unchanged.
    pub fn map_byte(self, byte: u8) -> u8 {
        match self {
            IrcCasemap::Ascii => byte.to_ascii_lowercase(),
            IrcCasemap::Rfc1459Strict => rfc1459_strict(byte),
            IrcCasemap::Rfc1459 => rfc1459(byte),
        }
    }

    /// Returns a casemapped copy of `string`.
    pub fn fold(self, string: &str) -> String {
        let bytes: Vec<u8> = string.bytes().map(|b| self.map_byte(b)).collect();
        // Only ASCII bytes are remapped, and only onto other ASCII bytes.
        String::from_utf8(bytes).unwrap_or_else(|_| string.to_owned())
    }
}

fn rfc1459_strict(byte: u8) -> u8 {
    if matches!(byte, b'['..=b']') {
        byte + 32
    } else {
        byte.to_ascii_lowercase()
    }
}

fn rfc1459(byte: u8) -> u8 {
    if byte == b'~' {
        b'^'
    } else {
        rfc1459_strict(byte)
    }
}
