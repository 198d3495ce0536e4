//! Quote command - duty breakdown for one vehicle

use crate::cmd::{format_rub, resolve_age, settlement_price, FuelArg};
use crate::config::Settings;
use crate::core::{quote_scenarios, Quote, VehicleProfile};
use crate::rates::SETTLEMENT_CURRENCY;
use chrono::Local;
use clap::{ArgGroup, Args};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Modify, Style},
};

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("vehicle_age")
        .required(true)
        .args(["age", "produced", "year"])
))]
pub struct QuoteCommand {
    /// Vehicle price in the given currency
    #[arg(short, long)]
    price: Decimal,

    /// Currency of the price (e.g. RUB, EUR, KRW)
    #[arg(long, default_value = SETTLEMENT_CURRENCY)]
    currency: String,

    /// Engine displacement in cc
    #[arg(long)]
    volume: u32,

    /// Engine power in hp
    #[arg(long)]
    power: u32,

    /// Vehicle age in full years
    #[arg(long)]
    age: Option<u32>,

    /// Production date as YYYYMM
    #[arg(long)]
    produced: Option<String>,

    /// Production year
    #[arg(long)]
    year: Option<i32>,

    /// Engine fuel
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = FuelArg::Gasoline)]
    fuel: FuelArg,

    /// Import as an organization instead of a private individual
    #[arg(long)]
    legal_entity: bool,

    /// RUB per EUR to use instead of the fetched rate
    #[arg(long)]
    eur_rate: Option<Decimal>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct QuoteOutput<'a> {
    currency: &'static str,
    eur_rate: Decimal,
    vehicle: &'a VehicleProfile,
    quotes: Vec<QuoteView<'a>>,
}

#[derive(Debug, Serialize)]
struct QuoteView<'a> {
    #[serde(flatten)]
    quote: &'a Quote,
    landed_cost: Decimal,
}

impl QuoteCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        if self.price < Decimal::ZERO {
            anyhow::bail!("price cannot be negative: {}", self.price);
        }

        let age_years = resolve_age(
            self.age,
            self.produced.as_deref(),
            self.year,
            Local::now().date_naive(),
        )?;

        // the cache only fetches when a rate is actually needed
        let cache = settings.rate_cache()?;
        let price_settlement = settlement_price(&cache, self.price, &self.currency)?;
        let eur_rate = match self.eur_rate {
            Some(rate) => rate,
            None => cache.eur_rate()?,
        };
        if eur_rate <= Decimal::ZERO {
            anyhow::bail!("EUR rate must be positive: {}", eur_rate);
        }

        let (fuel_type, is_electric) = self.fuel.resolve();
        let profile = VehicleProfile {
            price_settlement,
            engine_volume_cc: self.volume,
            engine_power_hp: self.power,
            age_years,
            is_electric,
            is_legal_entity: self.legal_entity,
            is_commercial: false,
            fuel_type,
        };
        log::debug!("Quoting {:?} at {} RUB/EUR", profile, eur_rate);

        let quotes = quote_scenarios(&profile, eur_rate);
        if self.json {
            print_json(&profile, eur_rate, &quotes)
        } else {
            print_quotes(&profile, eur_rate, &quotes);
            Ok(())
        }
    }
}

fn print_json(profile: &VehicleProfile, eur_rate: Decimal, quotes: &[Quote]) -> anyhow::Result<()> {
    let output = QuoteOutput {
        currency: SETTLEMENT_CURRENCY,
        eur_rate,
        vehicle: profile,
        quotes: quotes
            .iter()
            .map(|quote| QuoteView {
                quote,
                landed_cost: quote.landed_cost(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_quotes(profile: &VehicleProfile, eur_rate: Decimal, quotes: &[Quote]) {
    let fuel = if profile.is_electric {
        "electric"
    } else {
        profile.fuel_type.display()
    };
    let importer = if profile.is_legal_entity {
        "legal entity"
    } else {
        "individual"
    };

    println!();
    println!("IMPORT DUTY QUOTE");
    println!();
    println!(
        "  Price:     {} {}",
        format_rub(profile.price_settlement),
        SETTLEMENT_CURRENCY
    );
    println!(
        "  Vehicle:   {} cc, {} hp, {}, {} years",
        profile.engine_volume_cc, profile.engine_power_hp, fuel, profile.age_years
    );
    println!("  Importer:  {}", importer);
    println!("  EUR rate:  {}", eur_rate.normalize());
    println!();
    println!("{}", quote_table(quotes));
    println!();
}

fn quote_table(quotes: &[Quote]) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["".to_string()];
    header.extend(quotes.iter().map(|q| q.scenario.to_string()));
    builder.push_record(header);

    let component_count = quotes
        .first()
        .map_or(0, |q| q.breakdown.components().len());
    for i in 0..component_count {
        let mut row = Vec::with_capacity(quotes.len() + 1);
        for quote in quotes {
            let (name, amount) = quote.breakdown.components()[i];
            if row.is_empty() {
                row.push(name.to_string());
            }
            row.push(format_rub(amount));
        }
        builder.push_record(row);
    }

    let mut total = vec!["Total".to_string()];
    total.extend(quotes.iter().map(|q| format_rub(q.breakdown.total())));
    builder.push_record(total);

    let mut landed = vec!["Landed cost".to_string()];
    landed.extend(quotes.iter().map(|q| format_rub(q.landed_cost())));
    builder.push_record(landed);

    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string()
}
