use crate::TelecomError;

/// A single DTMF key: `0-9`, `*`, `#` or `A-D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DtmfTone(char);

impl DtmfTone {
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl TryFrom<char> for DtmfTone {
    type Error = TelecomError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        let c = c.to_ascii_uppercase();
        match c {
            '0'..='9' | '*' | '#' | 'A'..='D' => Ok(Self(c)),
            _ => Err(TelecomError::InvalidTone(c)),
        }
    }
}

impl std::fmt::Display for DtmfTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
