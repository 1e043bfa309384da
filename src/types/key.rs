//! Access codes.
//!
//! A `Key` is validated at construction time: exactly [`KEY_SIZE`] ASCII
//! graphic characters. Everything downstream (stores, rendering, the device
//! loop) can rely on that.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{Error, Result};

/// Number of characters in an access code.
pub const KEY_SIZE: usize = 4;

/// A fixed-length printable access code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Parse a code entered through the admin console.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != KEY_SIZE {
            return Err(Error::validation(format!(
                "key must be exactly {} characters, got {}",
                KEY_SIZE,
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::validation(format!(
                "key contains non-printable characters: {:?}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Build a key from the raw bytes returned by the keypad.
    pub fn from_scan(raw: [u8; KEY_SIZE]) -> Result<Self> {
        let s = std::str::from_utf8(&raw)
            .map_err(|_| Error::validation(format!("scanned bytes are not text: {:02X?}", raw)))?;
        Self::parse(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl std::str::FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
