//! Issue date validation and conversion to the SII wire format

use chrono::NaiveDate;

use crate::errors::{DteLinkError, Result};

/// Parse an issue date in `YYYY-MM-DD` format.
///
/// # Errors
/// Returns `DteLinkError::Validation` naming `field` for anything that is not
/// a real calendar date in that format.
pub fn parse_issue_date(input: &str, field: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.len() != 10 {
        return Err(invalid(input, field));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid(input, field))
}

/// Format a date as the SII queries expect it (`ddmmYYYY`).
pub fn to_authority_date(date: NaiveDate) -> String {
    date.format("%d%m%Y").to_string()
}

fn invalid(input: &str, field: &str) -> DteLinkError {
    DteLinkError::validation(field, format!("'{input}' is not a valid date, expected YYYY-MM-DD"))
}
