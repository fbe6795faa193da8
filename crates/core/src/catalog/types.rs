//! Catalog record types.

use serde::{Deserialize, Serialize};

/// Stable primary key assigned by the remote catalog.
pub type RecordId = i64;

/// A catalog entry (recipe).
///
/// `liked` is local-only state materialised from the liked-id set on every
/// sync; the remote listing never carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Creator; `None` for orphaned or system records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Opaque creation timestamp, never reinterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub liked: bool,
}

impl Record {
    /// Whether the record belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }

    /// Case-insensitive substring match on the title.
    pub fn title_matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
    }
}

/// One ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    /// Wire name `count`.
    #[serde(default, rename = "count")]
    pub quantity: f64,
    /// Wire name `type` (e.g. "g", "ml", "pcs").
    #[serde(default, rename = "type")]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

/// One instruction step. `number` is 1-based and contiguous within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Step {
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub instruction: String,
    /// Optional image/video for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Step {
    pub fn new(number: u32, instruction: impl Into<String>) -> Self {
        Self {
            number,
            instruction: instruction.into(),
            url: None,
        }
    }
}

/// Content for a record that does not exist remotely yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordDraft {
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_type: Option<String>,
}

impl RecordDraft {
    /// Materialise the draft once the remote assigned an id.
    pub fn into_record(
        self,
        id: RecordId,
        owner_id: Option<String>,
        photo_url: Option<String>,
    ) -> Record {
        Record {
            id,
            title: self.title,
            ingredients: self.ingredients,
            steps: self.steps,
            owner_id,
            meal_type: self.meal_type,
            food_type: self.food_type,
            photo_url,
            created_at: None,
            liked: false,
        }
    }
}

impl From<&Record> for RecordDraft {
    fn from(record: &Record) -> Self {
        Self {
            title: record.title.clone(),
            ingredients: record.ingredients.clone(),
            steps: record.steps.clone(),
            meal_type: record.meal_type.clone(),
            food_type: record.food_type.clone(),
        }
    }
}

/// Category filter over the classification tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CategoryFilter {
    MealType(String),
    FoodType(String),
}

impl CategoryFilter {
    /// Case-insensitive exact match on the selected tag.
    pub fn matches(&self, record: &Record) -> bool {
        let (wanted, actual) = match self {
            CategoryFilter::MealType(v) => (v, record.meal_type.as_deref()),
            CategoryFilter::FoodType(v) => (v, record.food_type.as_deref()),
        };
        actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(wanted.trim()))
    }
}
