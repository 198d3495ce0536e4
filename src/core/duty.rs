//! Import duty tables: clearance fee, customs duty, recycling fee, excise and VAT.
//!
//! Every rule is an ordered table evaluated top to bottom with inclusive upper
//! bounds. All amounts are in the settlement currency unless named otherwise.

use super::tiers::{PriceTiers, RateTiers, Tiers, UnitTiers};
use super::vehicle::{FuelClass, VehicleProfile};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

static CLEARANCE_FEES: PriceTiers = Tiers {
    steps: &[
        (dec!(200000), dec!(1067)),
        (dec!(450000), dec!(2134)),
        (dec!(1200000), dec!(4269)),
        (dec!(2700000), dec!(11746)),
        (dec!(4200000), dec!(16524)),
        (dec!(5500000), dec!(21344)),
        (dec!(7000000), dec!(27540)),
    ],
    above: dec!(30000),
};

const ELECTRIC_DUTY_RATE: Decimal = dec!(0.15);

/// Individuals, under 3 years: (percent of price, EUR minimum per cc) by price in EUR
static INDIVIDUAL_UNDER_3: RateTiers = Tiers {
    steps: &[
        (dec!(8500), (dec!(0.54), dec!(2.5))),
        (dec!(16700), (dec!(0.48), dec!(3.5))),
        (dec!(42300), (dec!(0.48), dec!(5.5))),
        (dec!(84500), (dec!(0.48), dec!(7.5))),
        (dec!(169000), (dec!(0.48), dec!(15))),
    ],
    above: (dec!(0.48), dec!(20)),
};

/// Individuals, 3 to 5 years: EUR per cc by engine volume
static INDIVIDUAL_3_TO_5: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(1.5)),
        (1500, dec!(1.7)),
        (1800, dec!(2.5)),
        (2300, dec!(2.7)),
        (3000, dec!(3.0)),
    ],
    above: dec!(3.6),
};

/// Individuals, over 5 years: EUR per cc by engine volume
static INDIVIDUAL_OVER_5: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(3.0)),
        (1500, dec!(3.2)),
        (1800, dec!(3.5)),
        (2300, dec!(4.8)),
        (3000, dec!(5.0)),
    ],
    above: dec!(7.5),
};

const LEGAL_MID_AGE_RATE: Decimal = dec!(0.20);
const LEGAL_DIESEL_UNDER_3_RATE: Decimal = dec!(0.15);

static LEGAL_GASOLINE_UNDER_3: UnitTiers = Tiers {
    steps: &[(2800, dec!(0.15))],
    above: dec!(0.125),
};

static LEGAL_GASOLINE_3_TO_7: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(0.36)),
        (1500, dec!(0.40)),
        (1800, dec!(0.36)),
        (3000, dec!(0.44)),
    ],
    above: dec!(0.80),
};

static LEGAL_GASOLINE_OVER_7: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(1.4)),
        (1500, dec!(1.5)),
        (1800, dec!(1.6)),
        (3000, dec!(2.2)),
    ],
    above: dec!(3.2),
};

static LEGAL_DIESEL_3_TO_7: UnitTiers = Tiers {
    steps: &[(1500, dec!(0.32)), (2500, dec!(0.40))],
    above: dec!(0.80),
};

static LEGAL_DIESEL_OVER_7: UnitTiers = Tiers {
    steps: &[(1500, dec!(1.5)), (2500, dec!(2.2))],
    above: dec!(3.2),
};

const RECYCLING_BASE_LEGAL: Decimal = dec!(150000);
const RECYCLING_BASE_INDIVIDUAL: Decimal = dec!(20000);

static RECYCLING_COMMERCIAL_UNDER_3: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(9.01)),
        (2000, dec!(33.37)),
        (3000, dec!(93.77)),
        (3500, dec!(107.67)),
    ],
    above: dec!(137.11),
};

static RECYCLING_COMMERCIAL_3_PLUS: UnitTiers = Tiers {
    steps: &[
        (1000, dec!(23)),
        (2000, dec!(58.7)),
        (3000, dec!(141.97)),
        (3500, dec!(165.84)),
    ],
    above: dec!(180.24),
};

// Engines over 3000cc reuse the commercial coefficients even for personal use.
static RECYCLING_PERSONAL_UNDER_3: UnitTiers = Tiers {
    steps: &[(3000, dec!(0.17)), (3500, dec!(107.67))],
    above: dec!(137.11),
};

static RECYCLING_PERSONAL_3_PLUS: UnitTiers = Tiers {
    steps: &[(3000, dec!(0.26)), (3500, dec!(165.84))],
    above: dec!(180.24),
};

/// Excise per horsepower
static EXCISE_PER_HP: UnitTiers = Tiers {
    steps: &[
        (90, dec!(0)),
        (150, dec!(61)),
        (200, dec!(583)),
        (300, dec!(955)),
        (400, dec!(1628)),
        (500, dec!(1685)),
    ],
    above: dec!(1740),
};

const VAT_RATE: Decimal = dec!(0.20);

/// The five charges payable on import, with their sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DutyBreakdown {
    clearance_fee: Decimal,
    customs_duty: Decimal,
    recycling_fee: Decimal,
    excise_tax: Decimal,
    vat: Decimal,
    total: Decimal,
}

impl DutyBreakdown {
    pub fn new(
        clearance_fee: Decimal,
        customs_duty: Decimal,
        recycling_fee: Decimal,
        excise_tax: Decimal,
        vat: Decimal,
    ) -> Self {
        DutyBreakdown {
            clearance_fee,
            customs_duty,
            recycling_fee,
            excise_tax,
            vat,
            total: clearance_fee + customs_duty + recycling_fee + excise_tax + vat,
        }
    }

    pub fn clearance_fee(&self) -> Decimal {
        self.clearance_fee
    }

    pub fn customs_duty(&self) -> Decimal {
        self.customs_duty
    }

    pub fn recycling_fee(&self) -> Decimal {
        self.recycling_fee
    }

    pub fn excise_tax(&self) -> Decimal {
        self.excise_tax
    }

    pub fn vat(&self) -> Decimal {
        self.vat
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Components in display order
    pub fn components(&self) -> [(&'static str, Decimal); 5] {
        [
            ("Clearance fee", self.clearance_fee),
            ("Customs duty", self.customs_duty),
            ("Recycling fee", self.recycling_fee),
            ("Excise tax", self.excise_tax),
            ("VAT", self.vat),
        ]
    }
}

/// How customs duty is derived for a given profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DutyFormula {
    /// Flat share of the price
    PercentOfPrice(Decimal),
    /// Share of the price chosen by engine volume
    PercentByVolume(&'static UnitTiers),
    /// EUR per cc chosen by engine volume
    PerCc(&'static UnitTiers),
    /// The larger of a share of the price and a per cc minimum
    GreaterOf {
        percent: Decimal,
        per_cc: &'static UnitTiers,
    },
    /// Share of the price and per cc minimum both chosen by the EUR price
    ByEuroPrice(&'static RateTiers),
}

impl DutyFormula {
    /// Select the duty formula. Arms are evaluated in order, first match wins.
    pub fn for_profile(profile: &VehicleProfile) -> Self {
        use DutyFormula::*;

        match (
            profile.is_electric,
            profile.is_legal_entity,
            profile.fuel_type.rate_class(),
            profile.age_years,
        ) {
            (true, _, _, _) => PercentOfPrice(ELECTRIC_DUTY_RATE),

            (false, false, _, 0..=2) => ByEuroPrice(&INDIVIDUAL_UNDER_3),
            (false, false, _, 3..=5) => PerCc(&INDIVIDUAL_3_TO_5),
            (false, false, _, _) => PerCc(&INDIVIDUAL_OVER_5),

            (false, true, FuelClass::GasolineOrHybrid, 0..=2) => {
                PercentByVolume(&LEGAL_GASOLINE_UNDER_3)
            }
            (false, true, FuelClass::GasolineOrHybrid, 3..=7) => GreaterOf {
                percent: LEGAL_MID_AGE_RATE,
                per_cc: &LEGAL_GASOLINE_3_TO_7,
            },
            (false, true, FuelClass::GasolineOrHybrid, _) => PerCc(&LEGAL_GASOLINE_OVER_7),

            (false, true, FuelClass::Diesel, 0..=2) => PercentOfPrice(LEGAL_DIESEL_UNDER_3_RATE),
            (false, true, FuelClass::Diesel, 3..=7) => GreaterOf {
                percent: LEGAL_MID_AGE_RATE,
                per_cc: &LEGAL_DIESEL_3_TO_7,
            },
            (false, true, FuelClass::Diesel, _) => PerCc(&LEGAL_DIESEL_OVER_7),
        }
    }

    pub fn apply(&self, profile: &VehicleProfile, eur_rate: Decimal) -> Decimal {
        let price = profile.price_settlement;
        let volume = profile.engine_volume_cc;
        let per_cc = |eur_per_cc: Decimal| eur_per_cc * Decimal::from(volume) * eur_rate;

        match *self {
            DutyFormula::PercentOfPrice(rate) => price * rate,
            DutyFormula::PercentByVolume(tiers) => price * tiers.select(volume),
            DutyFormula::PerCc(tiers) => per_cc(tiers.select(volume)),
            DutyFormula::GreaterOf {
                percent,
                per_cc: tiers,
            } => (price * percent).max(per_cc(tiers.select(volume))),
            DutyFormula::ByEuroPrice(tiers) => {
                // a zero rate has no EUR price, use the top tier
                let price_eur = price.checked_div(eur_rate).unwrap_or(Decimal::MAX);
                let (rate, min_per_cc) = tiers.select(price_eur);
                (price * rate).max(per_cc(min_per_cc))
            }
        }
    }
}

/// Compute all import charges for one vehicle.
///
/// `eur_rate` is the number of settlement currency units per EUR.
pub fn compute_duty(profile: &VehicleProfile, eur_rate: Decimal) -> DutyBreakdown {
    let duty = customs_duty(profile, eur_rate);
    let excise = excise_tax(profile);
    let breakdown = DutyBreakdown::new(
        clearance_fee(profile),
        duty,
        recycling_fee(profile),
        excise,
        vat(profile, duty, excise),
    );
    log::debug!("Duty for {:?} at EUR {}: {:?}", profile, eur_rate, breakdown);
    breakdown
}

pub fn clearance_fee(profile: &VehicleProfile) -> Decimal {
    CLEARANCE_FEES.select(profile.price_settlement)
}

pub fn customs_duty(profile: &VehicleProfile, eur_rate: Decimal) -> Decimal {
    DutyFormula::for_profile(profile).apply(profile, eur_rate)
}

pub fn recycling_fee(profile: &VehicleProfile) -> Decimal {
    let base = if profile.is_legal_entity {
        RECYCLING_BASE_LEGAL
    } else {
        RECYCLING_BASE_INDIVIDUAL
    };
    base * recycling_coefficient(profile)
}

fn recycling_coefficient(profile: &VehicleProfile) -> Decimal {
    let under_3 = profile.age_years < 3;
    let volume = profile.engine_volume_cc;

    match (profile.commercial_recycling(), profile.is_electric, under_3) {
        (true, true, true) => dec!(33.37),
        (true, true, false) => dec!(58.7),
        (true, false, true) => RECYCLING_COMMERCIAL_UNDER_3.select(volume),
        (true, false, false) => RECYCLING_COMMERCIAL_3_PLUS.select(volume),
        (false, true, true) => dec!(0.17),
        (false, true, false) => dec!(0.26),
        (false, false, true) => RECYCLING_PERSONAL_UNDER_3.select(volume),
        (false, false, false) => RECYCLING_PERSONAL_3_PLUS.select(volume),
    }
}

pub fn excise_tax(profile: &VehicleProfile) -> Decimal {
    if !profile.pays_excise_and_vat() {
        return Decimal::ZERO;
    }
    let hp = profile.engine_power_hp;
    EXCISE_PER_HP.select(hp) * Decimal::from(hp)
}

pub fn vat(profile: &VehicleProfile, customs_duty: Decimal, excise_tax: Decimal) -> Decimal {
    if !profile.pays_excise_and_vat() {
        return Decimal::ZERO;
    }
    (profile.price_settlement + customs_duty + excise_tax) * VAT_RATE
}
