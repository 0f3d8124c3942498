//! Search tags: the lookup key for packet schemas.
//!
//! ```text
//! TARGET:SENDER:MSG           11:F0:89
//! TARGET:SENDER:MSG:PACKLEN   F0:10:92:0C
//! ```
//!
//! Every component is exactly two hex digits. The four-part form
//! disambiguates schemas that share an id triple and differ only in length.

use core::fmt;
use core::str::FromStr;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchTag {
    pub target: u8,
    pub sender: u8,
    pub msg_value: u8,
    /// Present only in the four-part form.
    pub pack_len: Option<u8>,
}

impl SearchTag {
    /// Three-part tag.
    pub const fn new(target: u8, sender: u8, msg_value: u8) -> Self {
        Self {
            target,
            sender,
            msg_value,
            pack_len: None,
        }
    }

    /// Same ids, four-part form.
    pub const fn with_length(self, pack_len: u8) -> Self {
        Self {
            pack_len: Some(pack_len),
            ..self
        }
    }

    /// Same ids, three-part form.
    pub const fn base(self) -> Self {
        Self {
            pack_len: None,
            ..self
        }
    }

    pub const fn is_extended(&self) -> bool {
        self.pack_len.is_some()
    }
}

/// Parse one id component: exactly two hex digits.
pub fn parse_id(s: &str) -> Result<u8, SchemaError> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SchemaError::BadTag);
    }
    u8::from_str_radix(s, 16).map_err(|_| SchemaError::BadTag)
}

impl FromStr for SearchTag {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [t, s, m] => Ok(Self::new(parse_id(t)?, parse_id(s)?, parse_id(m)?)),
            [t, s, m, l] => {
                Ok(Self::new(parse_id(t)?, parse_id(s)?, parse_id(m)?).with_length(parse_id(l)?))
            }
            _ => Err(SchemaError::BadTag),
        }
    }
}

impl fmt::Display for SearchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}",
            self.target, self.sender, self.msg_value
        )?;
        if let Some(len) = self.pack_len {
            write!(f, ":{len:02X}")?;
        }
        Ok(())
    }
}
