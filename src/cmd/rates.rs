//! Rates command - list the current currency rates

use crate::config::Settings;
use crate::rates::{normalize_code, RateError, RateSnapshot, SETTLEMENT_CURRENCY};
use clap::Args;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RatesCommand {
    /// Only show these currency codes
    #[arg(value_name = "CODE")]
    codes: Vec<String>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct RateRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Nominal")]
    nominal: u32,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Per unit")]
    per_unit: String,
}

impl RatesCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let snapshot = settings.rate_cache()?.get_rates()?;
        let snapshot = self.filter(&snapshot)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }

        println!();
        println!(
            "CURRENCY RATES ({} per nominal, as of {})",
            SETTLEMENT_CURRENCY,
            snapshot.timestamp.format("%Y-%m-%d %H:%M UTC")
        );
        println!();
        if snapshot.rates.is_empty() {
            println!("  (no rates)");
            return Ok(());
        }
        println!("{}", rate_table(&snapshot));
        println!();
        Ok(())
    }

    fn filter(&self, snapshot: &RateSnapshot) -> anyhow::Result<RateSnapshot> {
        if self.codes.is_empty() {
            return Ok(snapshot.clone());
        }
        let mut filtered = RateSnapshot {
            timestamp: snapshot.timestamp,
            rates: Default::default(),
        };
        for code in &self.codes {
            let rate = snapshot
                .get(code)
                .ok_or_else(|| RateError::UnknownCurrency(code.clone()))?;
            filtered.rates.insert(normalize_code(code), rate.clone());
        }
        Ok(filtered)
    }
}

fn rate_table(snapshot: &RateSnapshot) -> String {
    let rows: Vec<RateRow> = snapshot
        .rates
        .iter()
        .map(|(code, rate)| RateRow {
            code: code.clone(),
            name: rate.name.clone().unwrap_or_default(),
            nominal: rate.nominal.get(),
            value: rate.value.normalize().to_string(),
            per_unit: rate.unit_value().round_dp(6).normalize().to_string(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string()
}
