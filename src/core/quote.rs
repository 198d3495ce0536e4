use super::duty::{compute_duty, DutyBreakdown};
use super::vehicle::VehicleProfile;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Owner treatment a quote was computed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scenario {
    PersonalUse,
    Resale,
    LegalEntity,
}

impl Scenario {
    pub fn display(&self) -> &'static str {
        match self {
            Scenario::PersonalUse => "Personal use",
            Scenario::Resale => "Resale",
            Scenario::LegalEntity => "Legal entity",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Duty breakdown together with the price it was computed for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub scenario: Scenario,
    pub price: Decimal,
    pub breakdown: DutyBreakdown,
}

impl Quote {
    /// Price plus every import charge
    pub fn landed_cost(&self) -> Decimal {
        self.price + self.breakdown.total()
    }
}

/// Quote every owner treatment that applies to the profile.
///
/// Legal entities get a single quote. Individuals get the personal use quote
/// followed by the resale quote, whatever `is_commercial` was set to.
pub fn quote_scenarios(profile: &VehicleProfile, eur_rate: Decimal) -> Vec<Quote> {
    let quote = |scenario, profile: &VehicleProfile| Quote {
        scenario,
        price: profile.price_settlement,
        breakdown: compute_duty(profile, eur_rate),
    };

    if profile.is_legal_entity {
        return vec![quote(Scenario::LegalEntity, profile)];
    }

    let personal = VehicleProfile {
        is_commercial: false,
        ..profile.clone()
    };
    vec![
        quote(Scenario::PersonalUse, &personal),
        quote(Scenario::Resale, &personal.for_resale()),
    ]
}
