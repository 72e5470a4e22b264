//! Typed inputs for the ledger services.
//!
//! Callers turn raw request fields into these structs before calling in.
//! The services validate them again, so an unchecked struct never reaches
//! storage.

pub mod clock;
pub mod requests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use requests::*;

use crate::errors::ServiceError;
use chrono::NaiveDate;

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ServiceError::InvalidInput(format!("invalid date '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_iso_date("2024-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(
            parse_iso_date(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_matches!(parse_iso_date("05.01.2024"), Err(ServiceError::InvalidInput(_)));
        assert_matches!(parse_iso_date("2023-02-29"), Err(ServiceError::InvalidInput(_)));
        assert_matches!(parse_iso_date(""), Err(ServiceError::InvalidInput(_)));
    }
}
