use std::borrow::Cow;

/// Decodes an RFC 5802 `saslname`.
///
/// `=2C` and `=3D` decode to `,` and `=` respectively.
/// Returns `None` on any other use of `=`, on invalid UTF-8,
/// or if the result contains control characters.
pub fn decode_saslname(bytes: &[u8]) -> Option<String> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(byte) = iter.next() {
        match byte {
            b'=' => match (iter.next(), iter.next()) {
                (Some(b'2'), Some(b'C' | b'c')) => out.push(b','),
                (Some(b'3'), Some(b'D' | b'd')) => out.push(b'='),
                _ => return None,
            },
            b',' => return None,
            _ => out.push(byte),
        }
    }
    let string = String::from_utf8(out).ok()?;
    if string.chars().any(char::is_control) {
        return None;
    }
    Some(string)
}

/// Encodes a string as an RFC 5802 `saslname`.
pub fn encode_saslname(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ',' => out.push_str("=2C"),
            '=' => out.push_str("=3D"),
            c => out.push(c),
        }
    }
    out
}

/// Prepares a username or authorization identity with SASLprep (RFC 4013).
///
/// Compatibility forms such as fullwidth letters are mapped onto their plain forms.
/// Returns `None` if the name contains prohibited code points or becomes empty.
pub fn prep_name(name: &str) -> Option<String> {
    let prepped = stringprep::saslprep(name).ok()?;
    (!prepped.is_empty()).then(|| prepped.into_owned())
}

/// Prepares a password with SASLprep (RFC 4013) before it is hashed.
///
/// Passwords that are not UTF-8 or that SASLprep rejects are used as-is.
pub fn prep_password(password: &[u8]) -> Cow<'_, [u8]> {
    let Ok(string) = std::str::from_utf8(password) else {
        return Cow::Borrowed(password);
    };
    match stringprep::saslprep(string) {
        Ok(Cow::Borrowed(prepped)) => Cow::Borrowed(prepped.as_bytes()),
        Ok(Cow::Owned(prepped)) => Cow::Owned(prepped.into_bytes()),
        Err(_) => Cow::Borrowed(password),
    }
}
