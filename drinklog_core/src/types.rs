//! Core domain types for the drink log and BAC estimation.
//!
//! This module defines the fundamental types used throughout the system:
//! - Consumption events consumed by the engine
//! - The user profile (mass, distribution category)
//! - The estimate produced by the engine
//! - Logged drink entries and their types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Engine Inputs
// ============================================================================

/// A single ingestion of alcohol, already resolved to grams of ethanol.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEvent {
    pub alcohol_grams: f64,
    pub occurred_at: DateTime<Utc>,
}

impl ConsumptionEvent {
    pub fn new(alcohol_grams: f64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            alcohol_grams,
            occurred_at,
        }
    }
}

/// Physiology class selecting the Widmark distribution factor.
///
/// Serialized with the names the settings screen uses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DistributionCategory {
    /// Higher-muscle-mass physiology (r = 0.68)
    #[serde(rename = "male")]
    A,
    /// Higher-fat-mass physiology (r = 0.55)
    #[serde(rename = "female")]
    B,
    /// Average or unspecified physiology (r = 0.615)
    #[serde(rename = "other")]
    C,
}

impl DistributionCategory {
    /// Widmark r for this category
    pub fn widmark_factor(self) -> f64 {
        match self {
            DistributionCategory::A => 0.68,
            DistributionCategory::B => 0.55,
            DistributionCategory::C => 0.615,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistributionCategory::A => "male",
            DistributionCategory::B => "female",
            DistributionCategory::C => "other",
        }
    }
}

impl std::str::FromStr for DistributionCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "a" => Ok(DistributionCategory::A),
            "female" | "b" => Ok(DistributionCategory::B),
            "other" | "c" => Ok(DistributionCategory::C),
            _ => Err(crate::Error::Config(format!(
                "Unknown distribution category: {}",
                s
            ))),
        }
    }
}

/// User profile threaded into every estimate
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Profile {
    pub mass_kg: Option<f64>,
    pub category: Option<DistributionCategory>,
}

impl Profile {
    pub fn new(mass_kg: f64, category: DistributionCategory) -> Self {
        Self {
            mass_kg: Some(mass_kg),
            category: Some(category),
        }
    }

    /// Both fields present and mass usable as a divisor.
    pub fn is_configured(&self) -> bool {
        self.resolved().is_some()
    }

    /// Returns `(mass_kg, category)` when the profile can drive an estimate.
    pub fn resolved(&self) -> Option<(f64, DistributionCategory)> {
        match (self.mass_kg, self.category) {
            (Some(mass), Some(category)) if mass.is_finite() && mass > 0.0 => {
                Some((mass, category))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Engine Output
// ============================================================================

/// Direction the concentration is heading at the evaluation instant
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Declining,
    Zero,
}

/// Result of a single engine evaluation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BacEstimate {
    pub concentration: f64,
    pub peak_concentration: f64,
    pub minutes_to_zero: u32,
    pub trend: Trend,
    pub is_configured: bool,
}

impl BacEstimate {
    /// All-zero result; `is_configured` records whether a profile was set.
    pub fn zero(is_configured: bool) -> Self {
        Self {
            concentration: 0.0,
            peak_concentration: 0.0,
            minutes_to_zero: 0,
            trend: Trend::Zero,
            is_configured,
        }
    }

    pub fn not_configured() -> Self {
        Self::zero(false)
    }
}

impl Default for BacEstimate {
    fn default() -> Self {
        Self::not_configured()
    }
}

// ============================================================================
// Logged Drinks
// ============================================================================

/// Kind of drink a user can log
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DrinkType {
    Beer,
    BeerFluitje,
    BeerVaasje,
    BeerPint,
    BeerBlikje,
    Wine,
    Spirits,
    Cocktail,
    Other,
}

impl DrinkType {
    pub const ALL: [DrinkType; 9] = [
        DrinkType::Beer,
        DrinkType::BeerFluitje,
        DrinkType::BeerVaasje,
        DrinkType::BeerPint,
        DrinkType::BeerBlikje,
        DrinkType::Wine,
        DrinkType::Spirits,
        DrinkType::Cocktail,
        DrinkType::Other,
    ];

    /// Stable identifier used in the log and CSV files
    pub fn id(self) -> &'static str {
        match self {
            DrinkType::Beer => "beer",
            DrinkType::BeerFluitje => "beer_fluitje",
            DrinkType::BeerVaasje => "beer_vaasje",
            DrinkType::BeerPint => "beer_pint",
            DrinkType::BeerBlikje => "beer_blikje",
            DrinkType::Wine => "wine",
            DrinkType::Spirits => "spirits",
            DrinkType::Cocktail => "cocktail",
            DrinkType::Other => "other",
        }
    }
}

impl std::fmt::Display for DrinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for DrinkType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let needle = s.trim().to_lowercase();
        DrinkType::ALL
            .iter()
            .copied()
            .find(|t| t.id() == needle)
            .ok_or_else(|| crate::Error::Other(format!("Unknown drink type: {}", s)))
    }
}

/// A drink recorded in the log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEntry {
    pub id: Uuid,
    pub drink_type: DrinkType,
    /// Instant the drink is attributed to (may be backdated)
    pub occurred_at: DateTime<Utc>,
    /// Instant the entry was actually written
    pub created_at: DateTime<Utc>,
}

impl DrinkEntry {
    /// New entry created now, attributed to `occurred_at`
    pub fn new(drink_type: DrinkType, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            drink_type,
            occurred_at,
            created_at: Utc::now(),
        }
    }

    /// Resolve this entry to grams of ethanol for the engine
    pub fn to_event(&self) -> ConsumptionEvent {
        ConsumptionEvent::new(
            crate::catalog::alcohol_grams(self.drink_type),
            self.occurred_at,
        )
    }
}
