pub mod age;
pub mod duty;
pub mod quote;
pub mod tiers;
pub mod vehicle;

// Flat public surface for domain types and functions.
pub use age::{age_from_year, classify_age, classify_age_at};
pub use quote::{quote_scenarios, Quote};
pub use vehicle::{FuelType, VehicleProfile};
