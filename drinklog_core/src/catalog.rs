//! Default catalog of drink types.
//!
//! Maps each [`DrinkType`] to the grams of ethanol and approximate calories
//! of one serving. The engine never sees this table; entries are resolved
//! to grams before estimation.

use crate::types::DrinkType;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fallback grams for a type missing from a custom catalog
pub const DEFAULT_ALCOHOL_GRAMS: f64 = 14.0;

/// One serving of a drink type
#[derive(Clone, Debug, PartialEq)]
pub struct DrinkSpec {
    pub drink_type: DrinkType,
    pub name: String,
    /// Approximate serving size
    pub volume_ml: u32,
    pub alcohol_grams: f64,
    pub calories: u32,
}

/// The catalog of known drink types
#[derive(Clone, Debug)]
pub struct DrinkCatalog {
    pub drinks: HashMap<DrinkType, DrinkSpec>,
}

/// Cached default catalog - built once and reused
static DEFAULT_CATALOG: Lazy<DrinkCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static DrinkCatalog {
    &DEFAULT_CATALOG
}

/// Grams of ethanol in one serving of `drink_type`
pub fn alcohol_grams(drink_type: DrinkType) -> f64 {
    get_default_catalog().alcohol_grams(drink_type)
}

/// Approximate calories in one serving of `drink_type`
pub fn calories(drink_type: DrinkType) -> u32 {
    get_default_catalog()
        .drinks
        .get(&drink_type)
        .map(|d| d.calories)
        .unwrap_or(0)
}

impl DrinkCatalog {
    pub fn alcohol_grams(&self, drink_type: DrinkType) -> f64 {
        self.get(drink_type)
            .map(|d| d.alcohol_grams)
            .unwrap_or(DEFAULT_ALCOHOL_GRAMS)
    }

    /// Serving details for `drink_type`, if the catalog has it
    pub fn get(&self, drink_type: DrinkType) -> Option<&DrinkSpec> {
        self.drinks.get(&drink_type)
    }
}

/// Builds the default catalog with the built-in serving sizes
pub fn build_default_catalog() -> DrinkCatalog {
    // (type, name, volume ml, grams ethanol, kcal)
    let table: [(DrinkType, &str, u32, f64, u32); 9] = [
        (DrinkType::Beer, "Beer", 330, 13.0, 150),
        (DrinkType::BeerFluitje, "Beer (fluitje)", 180, 7.1, 77),
        (DrinkType::BeerVaasje, "Beer (vaasje)", 250, 9.9, 107),
        (DrinkType::BeerPint, "Beer (pint)", 500, 19.7, 214),
        (DrinkType::BeerBlikje, "Beer (can)", 330, 13.0, 141),
        (DrinkType::Wine, "Wine", 150, 14.2, 125),
        (DrinkType::Spirits, "Spirits", 40, 12.6, 100),
        (DrinkType::Cocktail, "Cocktail", 200, 18.0, 220),
        (DrinkType::Other, "Other", 250, 14.0, 150),
    ];

    let drinks = table
        .into_iter()
        .map(|(drink_type, name, volume_ml, alcohol_grams, calories)| {
            (
                drink_type,
                DrinkSpec {
                    drink_type,
                    name: name.into(),
                    volume_ml,
                    alcohol_grams,
                    calories,
                },
            )
        })
        .collect();

    DrinkCatalog { drinks }
}
