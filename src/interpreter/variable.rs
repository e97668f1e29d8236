//! Named mutable cells with string-backed storage.
//!
//! A variable holds either text (for debug output) or an integer; storage is
//! always the raw string, with on-demand coercion when a block does
//! arithmetic, comparison or a move.

use crate::error::{ErrorKind, ProgramError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    raw: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            raw: raw.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    /// Coerce to a signed integer: an optional leading minus sign followed
    /// by digits. Anything else fails loudly.
    pub fn to_int(&self) -> Result<i64, ProgramError> {
        let digits = self.raw.strip_prefix('-').unwrap_or(&self.raw);
        let valid = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        if valid {
            if let Ok(value) = self.raw.parse::<i64>() {
                return Ok(value);
            }
        }
        Err(ErrorKind::NotAnInteger {
            name: self.name.clone(),
            value: self.raw.clone(),
        }
        .into())
    }
}
