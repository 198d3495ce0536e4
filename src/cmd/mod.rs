pub mod age;
pub mod batch;
pub mod convert;
pub mod quote;
pub mod rates;
pub mod schema;

use crate::core::{age_from_year, classify_age_at, FuelType};
use crate::rates::{
    normalize_code, Clock, RateCache, RateError, RateSource, SnapshotStore, SETTLEMENT_CURRENCY,
};
use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fuel as given on the command line or in a batch file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FuelArg {
    #[default]
    #[value(alias = "petrol")]
    Gasoline,
    Diesel,
    Hybrid,
    Electric,
}

impl FuelArg {
    /// Fuel type for the duty tables, and whether the vehicle is electric.
    /// Electric vehicles keep the default fuel type.
    pub fn resolve(self) -> (FuelType, bool) {
        match self {
            FuelArg::Gasoline => (FuelType::GasolineOrHybrid, false),
            FuelArg::Diesel => (FuelType::Diesel, false),
            FuelArg::Hybrid => (FuelType::Hybrid, false),
            FuelArg::Electric => (FuelType::default(), true),
        }
    }

    /// Case-insensitive parse, for values read from files
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        <FuelArg as ValueEnum>::from_str(s.trim(), true).map_err(|_| {
            anyhow::anyhow!(
                "unknown fuel '{}' (expected gasoline, diesel, hybrid or electric)",
                s
            )
        })
    }
}

/// Age in full years from exactly one of: explicit years, a `YYYYMM`
/// production date, or a production year
pub fn resolve_age(
    age: Option<u32>,
    produced: Option<&str>,
    year: Option<i32>,
    today: NaiveDate,
) -> anyhow::Result<u32> {
    match (age, produced, year) {
        (Some(age), None, None) => Ok(age),
        (None, Some(produced), None) => {
            let class = classify_age_at(produced, today)?;
            if !class.eligible {
                log::info!(
                    "Production date {} is outside the 3-5 year window",
                    produced
                );
            }
            Ok(class.age_bucket)
        }
        (None, None, Some(year)) => Ok(age_from_year(year, today)),
        (None, None, None) => {
            anyhow::bail!("vehicle age missing: give age, production date or year")
        }
        _ => anyhow::bail!("give only one of age, production date or year"),
    }
}

/// Amount in the settlement currency. The cache is only consulted for
/// foreign currencies.
pub fn settlement_price<S, T, C>(
    cache: &RateCache<S, T, C>,
    amount: Decimal,
    currency: &str,
) -> Result<Decimal, RateError>
where
    S: RateSource,
    T: SnapshotStore,
    C: Clock,
{
    if normalize_code(currency) == SETTLEMENT_CURRENCY {
        Ok(amount)
    } else {
        cache.convert(amount, currency, SETTLEMENT_CURRENCY)
    }
}

/// Whole settlement units with thousands separators
pub fn format_rub(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let Some(units) = rounded.to_i128() else {
        return rounded.to_string();
    };

    let digits = units.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if units < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
