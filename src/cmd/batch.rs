//! Batch command - quote every vehicle in a CSV file

use crate::cmd::{resolve_age, settlement_price, FuelArg};
use crate::config::Settings;
use crate::core::{quote_scenarios, Quote, VehicleProfile};
use crate::rates::{RateError, SETTLEMENT_CURRENCY};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BatchCommand {
    /// CSV file with one vehicle per row. Reads from stdin if not specified.
    #[arg(short, long, default_value = "-")]
    file: PathBuf,

    /// RUB per EUR to use instead of the fetched rate
    #[arg(long)]
    eur_rate: Option<Decimal>,
}

/// One vehicle in a batch file. Give exactly one of `age_years`, `produced`
/// or `year`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VehicleRow {
    /// Free-form identifier copied to the output
    #[serde(default)]
    pub id: Option<String>,
    #[schemars(with = "f64")]
    pub price: Decimal,
    /// Currency of the price, RUB if empty
    #[serde(default)]
    pub currency: Option<String>,
    pub engine_volume_cc: u32,
    pub engine_power_hp: u32,
    #[serde(default)]
    pub age_years: Option<u32>,
    /// Production date as YYYYMM
    #[serde(default)]
    pub produced: Option<String>,
    /// Production year
    #[serde(default)]
    pub year: Option<i32>,
    /// gasoline, petrol, diesel, hybrid or electric. Gasoline if empty.
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub legal_entity: Option<bool>,
}

#[derive(Debug, Serialize)]
struct QuoteRecord {
    id: String,
    scenario: String,
    age_years: u32,
    price_rub: Decimal,
    clearance_fee: Decimal,
    customs_duty: Decimal,
    recycling_fee: Decimal,
    excise_tax: Decimal,
    vat: Decimal,
    total: Decimal,
    landed_cost: Decimal,
}

impl QuoteRecord {
    fn new(id: &str, age_years: u32, quote: &Quote) -> Self {
        let money = |amount: Decimal| amount.round_dp(2);
        let breakdown = &quote.breakdown;
        QuoteRecord {
            id: id.to_string(),
            scenario: quote.scenario.to_string(),
            age_years,
            price_rub: money(quote.price),
            clearance_fee: money(breakdown.clearance_fee()),
            customs_duty: money(breakdown.customs_duty()),
            recycling_fee: money(breakdown.recycling_fee()),
            excise_tax: money(breakdown.excise_tax()),
            vat: money(breakdown.vat()),
            total: money(breakdown.total()),
            landed_cost: money(quote.landed_cost()),
        }
    }
}

impl BatchCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let cache = settings.rate_cache()?;
        let eur_rate = match self.eur_rate {
            Some(rate) => rate,
            None => cache.eur_rate()?,
        };
        if eur_rate <= Decimal::ZERO {
            anyhow::bail!("EUR rate must be positive: {}", eur_rate);
        }

        let reader: Box<dyn Read> = if self.file.as_os_str() == "-" {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(&self.file)
                .with_context(|| format!("cannot open {}", self.file.display()))?;
            Box::new(file)
        };

        let count = quote_csv(
            reader,
            io::stdout().lock(),
            |amount, currency| settlement_price(&cache, amount, currency),
            eur_rate,
            Local::now().date_naive(),
        )?;
        log::info!("Quoted {} vehicles", count);
        Ok(())
    }
}

/// Quote each CSV row and write one output record per scenario. Returns the
/// number of vehicles read.
pub fn quote_csv<R, W, P>(
    reader: R,
    writer: W,
    price: P,
    eur_rate: Decimal,
    today: NaiveDate,
) -> anyhow::Result<usize>
where
    R: Read,
    W: Write,
    P: Fn(Decimal, &str) -> Result<Decimal, RateError>,
{
    let mut rdr = csv::Reader::from_reader(reader);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut count = 0;
    for (i, row) in rdr.deserialize::<VehicleRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.with_context(|| format!("line {}: invalid row", line))?;
        let id = row.id.clone().unwrap_or_else(|| line.to_string());
        let profile =
            profile_for(&row, &price, today).with_context(|| format!("line {} ({})", line, id))?;

        for quote in quote_scenarios(&profile, eur_rate) {
            wtr.serialize(QuoteRecord::new(&id, profile.age_years, &quote))?;
        }
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

fn profile_for<P>(row: &VehicleRow, price: &P, today: NaiveDate) -> anyhow::Result<VehicleProfile>
where
    P: Fn(Decimal, &str) -> Result<Decimal, RateError>,
{
    if row.price < Decimal::ZERO {
        anyhow::bail!("price cannot be negative: {}", row.price);
    }
    let currency = row.currency.as_deref().unwrap_or(SETTLEMENT_CURRENCY);
    let fuel = match row.fuel.as_deref() {
        Some(fuel) if !fuel.trim().is_empty() => FuelArg::parse(fuel)?,
        _ => FuelArg::default(),
    };
    let (fuel_type, is_electric) = fuel.resolve();

    Ok(VehicleProfile {
        price_settlement: price(row.price, currency)?,
        engine_volume_cc: row.engine_volume_cc,
        engine_power_hp: row.engine_power_hp,
        age_years: resolve_age(row.age_years, row.produced.as_deref(), row.year, today)?,
        is_electric,
        is_legal_entity: row.legal_entity.unwrap_or(false),
        is_commercial: false,
        fuel_type,
    })
}
