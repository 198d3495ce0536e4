//! Vehicle age buckets and the 3-5 year import eligibility window

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

/// Months below which a vehicle counts as new
const YOUNG_MONTHS: i32 = 36;
/// Last month of the eligibility window, inclusive
const ELIGIBLE_MAX_MONTHS: i32 = 60;

const YOUNG_BUCKET: u32 = 2;
const OLD_BUCKET: u32 = 6;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AgeError {
    #[error("invalid production date '{0}', expected YYYYMM")]
    InvalidFormat(String),
    #[error("invalid month {month} in production date '{input}', expected 01-12")]
    InvalidMonth { input: String, month: u32 },
}

/// Result of classifying a production date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeClass {
    /// Age in years as used by the duty tables: 2 for anything under three
    /// years, 3-5 inside the window, 6 for anything older
    pub age_bucket: u32,
    pub eligible: bool,
}

/// Classify a `YYYYMM` production date against today's local date
pub fn classify_age(production: &str) -> Result<AgeClass, AgeError> {
    classify_age_at(production, Local::now().date_naive())
}

/// Classify a `YYYYMM` production date against the given date
pub fn classify_age_at(production: &str, today: NaiveDate) -> Result<AgeClass, AgeError> {
    let produced = parse_year_month(production)?;
    let months = months_between(produced, today);
    log::debug!("{} produced {} months before {}", production, months, today);
    Ok(bucket(months))
}

/// Whole calendar years between a production year and today
pub fn age_from_year(year: i32, today: NaiveDate) -> u32 {
    u32::try_from(today.year() - year).unwrap_or(0)
}

fn parse_year_month(s: &str) -> Result<NaiveDate, AgeError> {
    let invalid = || AgeError::InvalidFormat(s.to_string());
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = s[..4].parse().map_err(|_| invalid())?;
    let month: u32 = s[4..].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(AgeError::InvalidMonth {
            input: s.to_string(),
            month,
        });
    }
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

fn bucket(months: i32) -> AgeClass {
    match months {
        m if m < YOUNG_MONTHS => AgeClass {
            age_bucket: YOUNG_BUCKET,
            eligible: false,
        },
        m if m <= ELIGIBLE_MAX_MONTHS => AgeClass {
            age_bucket: (m / 12) as u32,
            eligible: true,
        },
        _ => AgeClass {
            age_bucket: OLD_BUCKET,
            eligible: false,
        },
    }
}
