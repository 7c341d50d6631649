//! Chilean tax identifier (RUT) parsing and check digit validation

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{DteLinkError, Result};

const MAX_RUT_NUMBER: u32 = 99_999_999;

#[allow(clippy::unwrap_used)] // literal pattern
fn rut_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,3}(?:\.\d{3})+|\d{1,8})-([0-9kK])$").unwrap())
}

/// A RUT with a verified modulo-11 check digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rut {
    number: u32,
    check_digit: char,
}

impl Rut {
    /// Parse `12345678-5`, `12.345.678-5` or `1000005-k`.
    ///
    /// # Errors
    /// Returns `DteLinkError::Validation` naming `field` when the format is
    /// wrong or the check digit does not match.
    pub fn parse(input: &str, field: &str) -> Result<Self> {
        let trimmed = input.trim();
        let captures = rut_pattern().captures(trimmed).ok_or_else(|| {
            DteLinkError::validation(field, format!("'{input}' is not a RUT (expected 12345678-9)"))
        })?;

        let number: u32 = captures[1]
            .replace('.', "")
            .parse()
            .map_err(|_| DteLinkError::validation(field, format!("'{input}' is not a RUT")))?;
        if number == 0 || number > MAX_RUT_NUMBER {
            return Err(DteLinkError::validation(field, format!("'{input}' is out of range")));
        }

        let supplied = captures[2].to_ascii_uppercase().chars().next().unwrap_or('?');
        let expected = Self::compute_check_digit(number);
        if supplied != expected {
            return Err(DteLinkError::validation(
                field,
                format!("check digit of '{input}' should be {expected}"),
            ));
        }

        Ok(Self { number, check_digit: expected })
    }

    /// Modulo-11 check digit: `0`-`9` or `K`.
    pub fn compute_check_digit(mut number: u32) -> char {
        let mut sum = 0u32;
        let mut factor = 2u32;
        while number > 0 {
            sum += (number % 10) * factor;
            number /= 10;
            factor = if factor == 7 { 2 } else { factor + 1 };
        }
        match 11 - (sum % 11) {
            11 => '0',
            10 => 'K',
            digit => char::from_digit(digit, 10).unwrap_or('0'),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn check_digit(&self) -> char {
        self.check_digit
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.number, self.check_digit)
    }
}
