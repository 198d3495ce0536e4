use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown fuel type '{0}' (expected gasoline, diesel or hybrid)")]
pub struct ParseFuelError(pub String);

/// Engine fuel as declared by the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    #[default]
    #[serde(rename = "gasoline", alias = "petrol")]
    GasolineOrHybrid,
    Diesel,
    Hybrid,
}

/// Fuel grouping used by the legal entity duty tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelClass {
    GasolineOrHybrid,
    Diesel,
}

impl FuelType {
    /// Hybrids are rated as gasoline engines.
    pub fn rate_class(&self) -> FuelClass {
        match self {
            FuelType::GasolineOrHybrid | FuelType::Hybrid => FuelClass::GasolineOrHybrid,
            FuelType::Diesel => FuelClass::Diesel,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            FuelType::GasolineOrHybrid => "gasoline",
            FuelType::Diesel => "diesel",
            FuelType::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for FuelType {
    type Err = ParseFuelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gasoline" | "petrol" => Ok(FuelType::GasolineOrHybrid),
            "diesel" => Ok(FuelType::Diesel),
            "hybrid" => Ok(FuelType::Hybrid),
            _ => Err(ParseFuelError(s.to_string())),
        }
    }
}

/// Everything the duty tables need to know about one vehicle and its importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VehicleProfile {
    /// Price already converted to the settlement currency
    #[schemars(with = "f64")]
    pub price_settlement: Decimal,
    /// Engine displacement in cubic centimeters
    pub engine_volume_cc: u32,
    /// Engine power in horsepower
    pub engine_power_hp: u32,
    /// Full years since production
    pub age_years: u32,
    #[serde(default)]
    pub is_electric: bool,
    /// Importer is an organization rather than a private individual
    #[serde(default)]
    pub is_legal_entity: bool,
    /// Vehicle is imported for resale rather than personal use
    #[serde(default)]
    pub is_commercial: bool,
    #[serde(default)]
    pub fuel_type: FuelType,
}

impl VehicleProfile {
    /// Same vehicle with the resale flag set
    pub fn for_resale(&self) -> Self {
        VehicleProfile {
            is_commercial: true,
            ..self.clone()
        }
    }

    /// Importer pays excise and VAT
    pub fn pays_excise_and_vat(&self) -> bool {
        self.is_legal_entity || self.is_electric
    }

    /// Higher recycling coefficients apply
    pub fn commercial_recycling(&self) -> bool {
        self.is_commercial || self.is_legal_entity
    }
}
