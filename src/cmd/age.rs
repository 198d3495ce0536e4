//! Age command - classify a production date

use crate::core::classify_age;
use clap::Args;

#[derive(Args, Debug)]
pub struct AgeCommand {
    /// Production date as YYYYMM (e.g. 202106)
    production: String,

    /// Output as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl AgeCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let class = classify_age(&self.production)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&class)?);
        } else {
            let eligible = if class.eligible { "yes" } else { "no" };
            println!("Age bucket: {} years", class.age_bucket);
            println!("Eligible:   {}", eligible);
        }
        Ok(())
    }
}
