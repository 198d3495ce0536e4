//! Convert command - currency conversion through cached rates

use crate::config::Settings;
use crate::rates::{normalize_code, SETTLEMENT_CURRENCY};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ConvertCommand {
    /// Amount to convert
    amount: Decimal,

    /// Currency code to convert from (e.g. KRW)
    from: String,

    /// Currency code to convert to
    #[arg(default_value = SETTLEMENT_CURRENCY)]
    to: String,

    /// Output as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Conversion {
    amount: Decimal,
    from: String,
    to: String,
    result: Decimal,
}

impl ConvertCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let cache = settings.rate_cache()?;
        let result = cache.convert(self.amount, &self.from, &self.to)?;
        let conversion = Conversion {
            amount: self.amount,
            from: normalize_code(&self.from),
            to: normalize_code(&self.to),
            result,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&conversion)?);
        } else {
            println!(
                "{} {} = {} {}",
                conversion.amount,
                conversion.from,
                conversion.result.round_dp(4).normalize(),
                conversion.to
            );
        }
        Ok(())
    }
}
