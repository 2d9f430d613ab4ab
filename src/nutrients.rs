//! Nutrient columns shared by ingestion and context formatting.

/// A nutrient fact carried on every food document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nutrient {
    /// Metadata key the raw value is stored under
    pub key: &'static str,
    /// Human readable label used in document text and prompts
    pub label: &'static str,
    /// Unit suffix appended directly after the value
    pub unit: &'static str,
    /// Source column names, tried in priority order
    pub aliases: &'static [&'static str],
}

pub const CALORIES: Nutrient = Nutrient {
    key: "calories",
    label: "Calories",
    unit: "",
    aliases: &["Caloric Value", "calories", "calories_per_100g"],
};

pub const PROTEIN: Nutrient = Nutrient {
    key: "protein",
    label: "Protein",
    unit: "g",
    aliases: &["Protein", "protein_g"],
};

pub const CARBS: Nutrient = Nutrient {
    key: "carbs",
    label: "Carbs",
    unit: "g",
    aliases: &["Carbohydrates", "carbs_g"],
};

pub const FAT: Nutrient = Nutrient {
    key: "fat",
    label: "Fat",
    unit: "g",
    aliases: &["Fat", "fat_g"],
};

pub const FIBER: Nutrient = Nutrient {
    key: "fiber",
    label: "Fiber",
    unit: "g",
    aliases: &["Dietary Fiber", "fiber_g"],
};

/// Nutrients in the order they appear in document text and context bullets.
pub const NUTRIENTS: [Nutrient; 5] = [CALORIES, PROTEIN, CARBS, FAT, FIBER];

impl Nutrient {
    /// Render a value as `Label: value<unit>`
    #[inline]
    pub fn describe(&self, value: &str) -> String {
        format!("{}: {}{}", self.label, value, self.unit)
    }
}
