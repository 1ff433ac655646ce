//! Household heat-vulnerability score on a 0-100 scale.
//!
//! Four weighted components: building (35%), socioeconomic (30%),
//! demographic (20%) and adaptation capacity (15%).
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    SingleFamilyDetached,
    Townhouse,
    ApartmentGround,
    /// Upper floors run hotter.
    ApartmentHighFloor,
    MobileHome,
}

impl BuildingType {
    fn weight(self) -> f64 {
        match self {
            BuildingType::SingleFamilyDetached => 0.5,
            BuildingType::Townhouse => 0.6,
            BuildingType::ApartmentGround => 0.7,
            BuildingType::ApartmentHighFloor => 0.9,
            BuildingType::MobileHome => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadeLevel {
    VeryShady,
    NotVeryShady,
    NotAtAllShady,
}

impl ShadeLevel {
    fn weight(self) -> f64 {
        match self {
            ShadeLevel::VeryShady => 0.3,
            ShadeLevel::NotVeryShady => 0.7,
            ShadeLevel::NotAtAllShady => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Driving,
    PublicTransit,
    Walking,
    WorkFromHome,
}

impl TransportMode {
    fn weight(self) -> f64 {
        match self {
            TransportMode::Driving => 0.3,
            TransportMode::PublicTransit => 0.7,
            TransportMode::Walking => 1.0,
            TransportMode::WorkFromHome => 0.1,
        }
    }
}

/// One household / neighbourhood description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VulnerabilityInput {
    pub year_built: i32,
    pub building_type: BuildingType,
    pub unit_size_sqft: f64,
    pub shade_level: ShadeLevel,
    pub median_income: f64,
    pub has_vehicle: bool,
    /// Percent of population over 65. Missing counts as 50%.
    #[serde(default)]
    pub pct_elderly: Option<f64>,
    /// Percent of population under 16. Missing counts as 50%.
    #[serde(default)]
    pub pct_children: Option<f64>,
    /// Monthly electricity cost.
    pub electricity_cost: f64,
    pub primary_transport: TransportMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VulnerabilityClass {
    Low,
    Moderate,
    High,
    Severe,
}

impl fmt::Display for VulnerabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VulnerabilityClass::Low => "Low",
            VulnerabilityClass::Moderate => "Moderate",
            VulnerabilityClass::High => "High",
            VulnerabilityClass::Severe => "Severe",
        };
        write!(f, "{} vulnerability", label)
    }
}

const INCOME_FLOOR: f64 = 30_000.0;
const INCOME_CEILING: f64 = 150_000.0;
const UNKNOWN_SHARE: f64 = 0.5;

fn age_weight(year_built: i32) -> f64 {
    match year_built {
        i32::MIN..=1949 => 1.0,
        1950..=1969 => 0.8,
        1970..=1989 => 0.6,
        1990..=2009 => 0.4,
        _ => 0.2,
    }
}

/// Log-scaled: 1.0 at or below the floor income, 0.0 at or above the ceiling.
fn income_factor(median_income: f64) -> f64 {
    if median_income <= 0.0 {
        return 1.0;
    }
    let span = INCOME_CEILING.ln() - INCOME_FLOOR.ln();
    (1.0 - (median_income.ln() - INCOME_FLOOR.ln()) / span).clamp(0.0, 1.0)
}

/// Annual electricity spend as a percentage of income, capped at 1.
fn electricity_burden(monthly_cost: f64, median_income: f64) -> f64 {
    if median_income <= 0.0 {
        return 1.0;
    }
    (monthly_cost / median_income * 12.0 * 100.0).min(1.0)
}

impl VulnerabilityInput {
    pub fn building_component(&self) -> f64 {
        let size_factor = (-0.0005 * self.unit_size_sqft).exp();
        0.4 * age_weight(self.year_built)
            + 0.3 * self.building_type.weight()
            + 0.2 * size_factor
            + 0.1 * self.shade_level.weight()
    }

    pub fn socioeconomic_component(&self) -> f64 {
        let vehicle_factor = if self.has_vehicle { 0.4 } else { 1.0 };
        0.7 * income_factor(self.median_income) + 0.3 * vehicle_factor
    }

    pub fn demographic_component(&self) -> f64 {
        let elderly = self.pct_elderly.map_or(UNKNOWN_SHARE, |p| p / 100.0);
        let children = self.pct_children.map_or(UNKNOWN_SHARE, |p| p / 100.0);
        0.6 * elderly + 0.4 * children
    }

    pub fn adaptation_component(&self) -> f64 {
        0.6 * electricity_burden(self.electricity_cost, self.median_income)
            + 0.4 * self.primary_transport.weight()
    }

    /// Higher is more vulnerable.
    pub fn score(&self) -> f64 {
        (0.35 * self.building_component()
            + 0.30 * self.socioeconomic_component()
            + 0.20 * self.demographic_component()
            + 0.15 * self.adaptation_component())
            * 100.0
    }
}

pub fn classify(score: f64) -> VulnerabilityClass {
    if score < 30.0 {
        VulnerabilityClass::Low
    } else if score < 60.0 {
        VulnerabilityClass::Moderate
    } else if score < 80.0 {
        VulnerabilityClass::High
    } else {
        VulnerabilityClass::Severe
    }
}
