//! Nutrition Catalog
//!
//! Macro-nutrient facts keyed by food label. The shipped catalog lives in
//! `data/nutrition.json` and is embedded at compile time; deployments can
//! point at a replacement file without rebuilding.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{FoodVisionError, Result, ResultExt};

/// Catalog shipped with the crate
const DEFAULT_CATALOG: &str = include_str!("../../data/nutrition.json");

/// Macro-nutrient facts for one serving (per 100 g)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Fat in grams
    pub fat: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
}

impl NutritionFacts {
    pub fn new(calories: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        Self {
            calories,
            protein,
            fat,
            carbs,
        }
    }

    /// All-zero record returned for labels the catalog does not know
    pub const fn zero() -> Self {
        Self {
            calories: 0.0,
            protein: 0.0,
            fat: 0.0,
            carbs: 0.0,
        }
    }

    fn validate(&self, label: &str) -> Result<()> {
        let fields = [
            ("calories", self.calories),
            ("protein", self.protein),
            ("fat", self.fat),
            ("carbs", self.carbs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(FoodVisionError::Configuration(format!(
                    "nutrition entry '{}' has invalid {}: {}",
                    label, name, value
                )));
            }
        }
        Ok(())
    }
}

/// Label -> nutrition facts lookup
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionCatalog {
    entries: BTreeMap<String, NutritionFacts>,
}

impl Default for NutritionCatalog {
    fn default() -> Self {
        Self::embedded()
    }
}

impl NutritionCatalog {
    /// The catalog compiled into the crate
    pub fn embedded() -> Self {
        Self::from_json(DEFAULT_CATALOG).unwrap_or_else(|e| {
            tracing::error!("Embedded nutrition catalog is invalid: {}", e);
            Self::from_entries(BTreeMap::new())
        })
    }

    pub fn from_entries(entries: BTreeMap<String, NutritionFacts>) -> Self {
        Self { entries }
    }

    /// Parse a JSON object mapping label to `{calories, protein, fat, carbs}`
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, NutritionFacts> = serde_json::from_str(json)
            .context_as(FoodVisionError::Configuration, || "invalid nutrition catalog".to_string())?;

        for (label, facts) in &entries {
            facts.validate(label)?;
        }

        Ok(Self { entries })
    }

    /// Load a catalog from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).context_as(FoodVisionError::Configuration, || {
            format!("cannot read nutrition catalog {:?}", path)
        })?;
        Self::from_json(&json)
    }

    /// Facts for `label`; unknown labels yield the zero record
    pub fn lookup(&self, label: &str) -> NutritionFacts {
        self.entries
            .get(label)
            .copied()
            .unwrap_or_else(NutritionFacts::zero)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Every label in the catalog, in sorted order
    pub fn available_labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_has_all_foods() {
        let catalog = NutritionCatalog::from_json(DEFAULT_CATALOG).unwrap();
        assert_eq!(catalog.len(), 23);
        assert!(catalog.contains("Gado-Gado"));
        assert!(catalog.contains("Tomato"));
    }

    #[test]
    fn test_lookup_known_label() {
        let catalog = NutritionCatalog::embedded();
        let facts = catalog.lookup("Nasi Goreng");
        assert_eq!(facts, NutritionFacts::new(320.0, 8.0, 12.0, 45.0));
    }

    #[test]
    fn test_lookup_unknown_label_is_zero() {
        let catalog = NutritionCatalog::embedded();
        assert_eq!(catalog.lookup("Class_42"), NutritionFacts::zero());
        assert_eq!(catalog.lookup("Unknown"), NutritionFacts::zero());
        // Keys are matched exactly
        assert_eq!(catalog.lookup("nasi goreng"), NutritionFacts::zero());
    }

    #[test]
    fn test_available_labels_sorted() {
        let labels = NutritionCatalog::embedded().available_labels();
        assert_eq!(labels.len(), 23);
        assert_eq!(labels.first().map(String::as_str), Some("Apple"));
        assert_eq!(labels.last().map(String::as_str), Some("Tomato"));
        assert!(labels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_from_path_replacement_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutrition.json");
        fs::write(
            &path,
            r#"{"Kiwi": {"calories": 61, "protein": 1.1, "fat": 0.5, "carbs": 15}}"#,
        )
        .unwrap();

        let catalog = NutritionCatalog::from_path(&path).unwrap();
        assert_eq!(catalog.available_labels(), vec!["Kiwi".to_string()]);
        assert_eq!(catalog.lookup("Kiwi").calories, 61.0);
    }

    #[test]
    fn test_negative_values_rejected() {
        let err = NutritionCatalog::from_json(
            r#"{"Ghost": {"calories": -5, "protein": 0, "fat": 0, "carbs": 0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FoodVisionError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = NutritionCatalog::from_path(Path::new("/nonexistent/nutrition.json")).unwrap_err();
        assert!(matches!(err, FoodVisionError::Configuration(_)));
    }
}
