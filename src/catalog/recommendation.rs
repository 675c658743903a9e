//! Recommendation Engine
//!
//! Turns a label and its nutrition facts into a short dietary advisory.
//! Rules are evaluated in a fixed order (calorie tier, protein tier, fat,
//! food-specific tip) and every rule that fires contributes one message.

use super::nutrition::NutritionFacts;

/// Separator between individual advisory messages
pub const SEPARATOR: &str = " | ";

pub const HIGH_CALORIE: &str = "high calorie, limit intake";
pub const LOW_CALORIE: &str = "low calorie, good for diet";
pub const EXCELLENT_PROTEIN: &str = "excellent protein source";
pub const ADEQUATE_PROTEIN: &str = "adequate protein";
pub const HIGH_FAT: &str = "high fat, consume in moderation";
pub const BALANCED: &str = "balanced food, enjoy!";

const HIGH_CALORIE_THRESHOLD: f64 = 400.0;
const LOW_CALORIE_THRESHOLD: f64 = 100.0;
const EXCELLENT_PROTEIN_THRESHOLD: f64 = 20.0;
const ADEQUATE_PROTEIN_THRESHOLD: f64 = 10.0;
const HIGH_FAT_THRESHOLD: f64 = 20.0;

/// Food-specific tip for a handful of named dishes
pub fn food_tip(label: &str) -> Option<&'static str> {
    let tip = match label {
        "Nasi Goreng" => "use less oil and add vegetables",
        "Ayam Goreng" => "healthier when grilled or boiled",
        "Gado-Gado" => "a healthy choice, keep it up!",
        "Burger" => "choose a whole-wheat bun and add salad",
        "French Fries" => "swap for baked potatoes",
        "Pizza" => "pick vegetable toppings and go easy on the cheese",
        "Sate" => "cut back on the peanut sauce when dieting",
        "Rendang" => "coconut milk is high in fat, eat in moderation",
        _ => return None,
    };
    Some(tip)
}

/// Build the advisory string for `label`
pub fn recommend(label: &str, nutrition: &NutritionFacts) -> String {
    let mut messages: Vec<&str> = Vec::with_capacity(4);

    if nutrition.calories > HIGH_CALORIE_THRESHOLD {
        messages.push(HIGH_CALORIE);
    } else if nutrition.calories < LOW_CALORIE_THRESHOLD {
        messages.push(LOW_CALORIE);
    }

    if nutrition.protein > EXCELLENT_PROTEIN_THRESHOLD {
        messages.push(EXCELLENT_PROTEIN);
    } else if nutrition.protein > ADEQUATE_PROTEIN_THRESHOLD {
        messages.push(ADEQUATE_PROTEIN);
    }

    if nutrition.fat > HIGH_FAT_THRESHOLD {
        messages.push(HIGH_FAT);
    }

    if let Some(tip) = food_tip(label) {
        messages.push(tip);
    }

    if messages.is_empty() {
        return BALANCED.to_string();
    }

    messages.join(SEPARATOR)
}
