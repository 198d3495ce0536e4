//! Schema command - print expected input formats

use crate::cmd::batch::VehicleRow;
use crate::core::VehicleProfile;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to describe
    #[arg(value_enum, default_value = "batch-row")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for a batch file row
    BatchRow,
    /// JSON Schema for the vehicle profile the duty tables take
    Profile,
    /// CSV header row for batch files
    CsvHeader,
    /// CSV column descriptions for batch files
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::BatchRow => {
                let schema = schema_for!(VehicleRow);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::Profile => {
                let schema = schema_for!(VehicleProfile);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let columns: Vec<_> = CSV_FIELDS.iter().map(|(name, _, _)| *name).collect();
                println!("{}", columns.join(","));
            }
            SchemaFormat::CsvFields => {
                println!("Batch CSV Format");
                println!("================");
                println!();
                for (name, required, description) in CSV_FIELDS {
                    let req = if *required { "required" } else { "optional" };
                    println!("{:18} ({:8})  {}", name, req, description);
                }
                println!();
                println!("Give exactly one of age_years, produced or year per row.");
            }
        }
        Ok(())
    }
}

const CSV_FIELDS: &[(&str, bool, &str)] = &[
    ("id", false, "Identifier copied to the output (defaults to line number)"),
    ("price", true, "Vehicle price in the row currency"),
    ("currency", false, "Currency code of the price (default RUB)"),
    ("engine_volume_cc", true, "Engine displacement in cc"),
    ("engine_power_hp", true, "Engine power in hp"),
    ("age_years", false, "Age in full years"),
    ("produced", false, "Production date as YYYYMM"),
    ("year", false, "Production year"),
    (
        "fuel",
        false,
        "gasoline, petrol, diesel, hybrid or electric (default gasoline)",
    ),
    ("legal_entity", false, "true when imported by an organization"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fields_match_batch_row() {
        let schema = serde_json::to_value(schema_for!(VehicleRow)).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), CSV_FIELDS.len());
        for (name, required, _) in CSV_FIELDS {
            assert!(properties.contains_key(*name), "{} missing", name);
            let in_required = schema["required"]
                .as_array()
                .unwrap()
                .iter()
                .any(|r| r == name);
            assert_eq!(in_required, *required, "{}", name);
        }
    }
}
