//! Calorie lookup against the CalorieNinjas nutrition API

use crate::cloud::client::{encode_query_value, HttpFetch, SpaceEncoding};
use crate::error::LookupError;
use log::{debug, info, warn};
use serde::Deserialize;

pub const NUTRITION_ENDPOINT: &str = "https://api.calorieninjas.com/v1/nutrition";

pub const UNKNOWN_NAME: &str = "Unknown";
pub const ERROR_NAME: &str = "Error";

#[derive(Debug, Deserialize)]
struct NutritionResponse {
    #[serde(default)]
    items: Vec<NutritionItem>,
}

#[derive(Debug, Deserialize)]
struct NutritionItem {
    name: String,
    calories: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodMatch {
    pub name: String,
    pub calories: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NutritionOutcome {
    Found(FoodMatch),
    /// Valid response with no items.
    Unknown,
    /// The lookup itself failed.
    Error(LookupError),
}

impl NutritionOutcome {
    /// `(calories, name)` with the reserved `(0, "Unknown")` / `(0, "Error")`
    /// values for the two failure cases.
    pub fn sentinel(&self) -> (i64, &str) {
        match self {
            NutritionOutcome::Found(m) => (m.calories, m.name.as_str()),
            NutritionOutcome::Unknown => (0, UNKNOWN_NAME),
            NutritionOutcome::Error(_) => (0, ERROR_NAME),
        }
    }
}

pub struct NutritionLookup {
    api_key: String,
}

impl NutritionLookup {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// `descriptor` is free text such as `"150g apple"`.
    pub fn lookup(&self, fetcher: &mut impl HttpFetch, descriptor: &str) -> NutritionOutcome {
        match self.try_lookup(fetcher, descriptor) {
            Ok(Some(found)) => {
                info!("🍎 {} -> {} ({} kcal)", descriptor, found.name, found.calories);
                NutritionOutcome::Found(found)
            }
            Ok(None) => {
                info!("No nutrition match for {:?}", descriptor);
                NutritionOutcome::Unknown
            }
            Err(e) => {
                warn!("⚠️ Nutrition lookup failed: {}", e);
                NutritionOutcome::Error(e)
            }
        }
    }

    fn try_lookup(
        &self,
        fetcher: &mut impl HttpFetch,
        descriptor: &str,
    ) -> Result<Option<FoodMatch>, LookupError> {
        let url = format!(
            "{}?query={}",
            NUTRITION_ENDPOINT,
            encode_query_value(descriptor, SpaceEncoding::Plus)
        );
        debug!("Nutrition request: {}", url);

        let reply = fetcher.get(&url, &[("X-Api-Key", self.api_key.as_str())])?;
        if !(200..300).contains(&reply.status) {
            return Err(LookupError::Status(reply.status));
        }

        let parsed: NutritionResponse = serde_json::from_str(&reply.body)
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(parsed.items.into_iter().next().map(|item| FoodMatch {
            name: item.name,
            calories: item.calories.round() as i64,
        }))
    }
}
