//! Input validation at the HTTP boundary.
//!
//! Repositories trust their input; handlers run every client-supplied value through these
//! functions first.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use lreg_derive::lreg_error;
use lreg_domain::nettadresse::Nettadresse;
use lreg_domain::versioned::LineageId;

const ORGNUMMER_WEIGHTS: [u32; 8] = [3, 2, 7, 6, 5, 4, 3, 2];

#[lreg_error]
#[derive(PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    Invalid { field: &'static str, message: Cow<'static, str> },
}

fn invalid(field: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::Invalid { field, message: message.into() }
}

/// Nine digits with a valid modulus-11 check digit.
///
/// # Errors
/// [`ValidationError::Invalid`] otherwise.
pub fn orgnummer(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    let digits = value.chars().map(|c| c.to_digit(10)).collect::<Option<Vec<_>>>();
    let Some(digits) = digits else {
        return Err(invalid("orgnummer", "only digits are allowed"));
    };
    if digits.len() != 9 {
        return Err(invalid("orgnummer", "must be 9 digits"));
    }

    let sum: u32 = digits.iter().zip(ORGNUMMER_WEIGHTS).map(|(d, w)| d * w).sum();
    let check = match sum % 11 {
        0 => 0,
        rest => 11 - rest,
    };
    if digits[8] != check {
        return Err(invalid("orgnummer", format!("{value} is not a valid organisasjonsnummer")));
    }
    Ok(value.to_owned())
}

/// # Errors
/// [`ValidationError::Invalid`] for a missing or empty name.
pub fn namn(value: Option<&str>) -> Result<String, ValidationError> {
    match value {
        Some(namn) if !namn.is_empty() => Ok(namn.to_owned()),
        _ => Err(invalid("namn", "missing name")),
    }
}

/// Parses a URL, prepending `https://` when the scheme is missing.
///
/// # Errors
/// [`ValidationError::Invalid`] when the address is blank or has no host.
pub fn url(value: Option<&str>) -> Result<Nettadresse, ValidationError> {
    Nettadresse::parse(value.unwrap_or_default()).map_err(|e| invalid("url", e.to_string()))
}

/// Comma-separated ids; the empty string is the empty list.
///
/// # Errors
/// [`ValidationError::Invalid`] when an element is not an integer.
pub fn id_list(value: &str) -> Result<Vec<LineageId>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<LineageId>().map_err(|_| invalid("ids", format!("`{part}` is not an id")))
        })
        .collect()
}

/// An RFC 3339 instant; `None` means now.
///
/// # Errors
/// [`ValidationError::Invalid`] when the value does not parse.
pub fn instant(value: Option<&str>) -> Result<DateTime<Utc>, ValidationError> {
    value.map_or_else(
        || Ok(Utc::now()),
        |raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| invalid("atTime", format!("`{raw}`: {e}")))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_orgnummer() {
        for valid in ["123456785", "938644500", "000000000"] {
            assert_eq!(orgnummer(valid).as_deref(), Ok(valid), "{valid}");
        }
    }

    #[test]
    fn rejects_bad_check_digit_and_shape() {
        for bad in ["123456789", "hello world", "12345678", "1234567850", ""] {
            assert!(orgnummer(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn remainder_one_has_no_valid_check_digit() {
        // 4 * 3 = 12, remainder 1, check digit would be 10
        for last in 0..=9 {
            assert!(orgnummer(&format!("40000000{last}")).is_err());
        }
    }

    #[test]
    fn namn_must_be_present() {
        assert_eq!(namn(Some("UUS")).as_deref(), Ok("UUS"));
        assert!(namn(Some("")).is_err());
        assert!(namn(None).is_err());
    }

    #[test]
    fn url_gets_https_when_scheme_is_missing() {
        let parsed = url(Some("www.uutilsynet.no")).map(|u| u.to_string());
        assert_eq!(parsed.as_deref(), Ok("https://www.uutilsynet.no"));
        assert_eq!(
            url(Some("http://example.com/a")).map(|u| u.to_string()).as_deref(),
            Ok("http://example.com/a")
        );
        assert!(url(Some("   ")).is_err());
        assert!(url(None).is_err());
    }

    #[test]
    fn id_lists() {
        assert_eq!(id_list(""), Ok(vec![]));
        assert_eq!(id_list("1"), Ok(vec![1]));
        assert_eq!(id_list("1,2"), Ok(vec![1, 2]));
        assert_eq!(id_list("     1,     2  "), Ok(vec![1, 2]));
        assert!(id_list("one,two").is_err());
    }

    #[test]
    fn instants_are_rfc3339() {
        let at = instant(Some("2023-01-01T12:00:00+01:00")).map(|at| at.to_rfc3339());
        assert_eq!(at.as_deref(), Ok("2023-01-01T11:00:00+00:00"));
        assert!(instant(Some("yesterday")).is_err());

        let before = Utc::now();
        assert!(instant(None).is_ok_and(|now| now >= before));
    }
}
