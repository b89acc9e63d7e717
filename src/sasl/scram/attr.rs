use crate::error::AttrError;

/// A parsed SCRAM attribute list, borrowing from the message it was parsed from.
#[derive(Clone, Debug)]
pub struct AttrList<'a>(Vec<(u8, &'a [u8])>);

impl<'a> AttrList<'a> {
    /// Parses a comma-separated list of `name=value` attributes.
    ///
    /// Names must be single ASCII letters and may not repeat. Values may not be empty.
    pub fn parse(data: &'a [u8]) -> Result<Self, AttrError> {
        if data.is_empty() {
            return Err(AttrError::Empty);
        }
        let mut attrs = Vec::new();
        for field in data.split(|b| *b == b',') {
            let Some((&name, rest)) = field.split_first() else {
                return Err(AttrError::InvalidName(b','));
            };
            if !name.is_ascii_alphabetic() {
                return Err(AttrError::InvalidName(name));
            }
            if attrs.iter().any(|(n, _)| *n == name) {
                return Err(AttrError::Duplicate(name));
            }
            let value = match rest {
                [b'=', value @ ..] if !value.is_empty() => value,
                _ => return Err(AttrError::MissingValue(name)),
            };
            attrs.push((name, value));
        }
        Ok(AttrList(attrs))
    }

    /// Returns the value of the named attribute.
    pub fn get(&self, name: u8) -> Option<&'a [u8]> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Returns `true` if the named attribute is present.
    pub fn contains(&self, name: u8) -> bool {
        self.get(name).is_some()
    }
}
