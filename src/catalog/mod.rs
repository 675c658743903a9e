//! Static knowledge used around the model
//!
//! - `classes`: the ordered class registry matching the model's output layout
//! - `nutrition`: macro-nutrient facts per food label
//! - `recommendation`: rule-based dietary advice derived from those facts

pub mod classes;
pub mod nutrition;
pub mod recommendation;

pub use classes::{ClassRegistry, SENTINEL_LABEL};
pub use nutrition::{NutritionCatalog, NutritionFacts};
pub use recommendation::recommend;
