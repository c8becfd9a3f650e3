use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{error::AppError, models::Role};

/// RFC 5322 subset, anchored on both ends.
static MAIL_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r##"^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*"##,
        r##"|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")"##,
        r##"@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?"##,
        r##"|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}"##,
        r##"(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:"##,
        r##"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"##,
    ))
    .expect("mail address pattern is a valid regex")
});

const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 32;
const MIN_AGE: i32 = 18;
const MAX_AGE: i32 = 120;

/// validate_types
///
/// Decodes a JSON body into a payload whose fields are all `Option<T>`.
/// An absent or `null` field is "not provided" and always passes; a field that
/// is present with the wrong primitive type fails with `InvalidTypes`.
/// Anything that is not a JSON object is an `InvalidRequest`.
pub fn validate_types<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    if !value.is_object() {
        return Err(AppError::InvalidRequest);
    }
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("payload rejected: {}", e);
        AppError::InvalidTypes
    })
}

/// A mandatory field. Missing means the request itself is malformed.
pub fn required<T>(value: Option<T>) -> Result<T, AppError> {
    value.ok_or(AppError::InvalidRequest)
}

/// A mandatory text field; blank text counts as missing.
pub fn required_text(value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::InvalidRequest),
    }
}

/// A text field of a partial update: absent is fine, blank is not.
pub fn optional_text(value: Option<String>) -> Result<Option<String>, AppError> {
    value.map(|text| required_text(Some(text))).transpose()
}

pub fn validate_mail_address(mail_address: &str) -> Result<(), AppError> {
    if MAIL_ADDRESS.is_match(mail_address) {
        Ok(())
    } else {
        Err(AppError::InvalidMailFormat)
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let length = password.chars().count();
    if (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&length) {
        Ok(())
    } else {
        Err(AppError::InvalidPasswordFormat)
    }
}

pub fn validate_role(role: &str) -> Result<Role, AppError> {
    role.parse()
}

/// parse_date
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC)
/// and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, AppError> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(date.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).ok_or(AppError::InvalidDate)?.and_utc());
    }
    Err(AppError::InvalidDate)
}

/// Whole calendar years elapsed between `birthdate` and `today`.
pub fn age_in_years(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

/// validate_birthdate
///
/// Parses the birthdate and checks the holder is between 18 and 120 years old
/// on `today`. Returns the calendar date that gets stored.
pub fn validate_birthdate(input: &str, today: NaiveDate) -> Result<NaiveDate, AppError> {
    let birthdate = parse_date(input)?.date_naive();
    let age = age_in_years(birthdate, today);
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(AppError::InvalidAge);
    }
    Ok(birthdate)
}
