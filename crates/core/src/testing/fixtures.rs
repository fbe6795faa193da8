//! Test fixtures and helper functions.

use serde_json::{json, Value};

use crate::catalog::{Ingredient, Record, RecordDraft, RecordId, Step};

/// A valid record owned by `user-1`, tagged Dinner / Soup.
pub fn record(id: RecordId, title: &str) -> Record {
    Record {
        id,
        title: title.to_string(),
        ingredients: vec![Ingredient::new("Water", 500.0, "ml")],
        steps: vec![Step::new(1, "Simmer gently for ten minutes")],
        owner_id: Some("user-1".to_string()),
        meal_type: Some("Dinner".to_string()),
        food_type: Some("Soup".to_string()),
        photo_url: None,
        created_at: None,
        liked: false,
    }
}

pub fn liked_record(id: RecordId, title: &str) -> Record {
    Record {
        liked: true,
        ..record(id, title)
    }
}

/// Wire form of [`record`]; decodes back to an equal record.
pub fn record_json(id: RecordId, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "ingredients": [{"name": "Water", "count": 500.0, "type": "ml"}],
        "instructions": [{"number": 1, "instruction": "Simmer gently for ten minutes"}],
        "userId": "user-1",
        "meal_type": "Dinner",
        "food_type": "Soup"
    })
}

/// Catalog listing envelope.
pub fn catalog_json(records: &[(RecordId, &str)]) -> Value {
    let recipes: Vec<Value> = records
        .iter()
        .map(|(id, title)| record_json(*id, title))
        .collect();
    json!({"success": true, "count": recipes.len(), "recipes": recipes})
}

/// Liked-ids envelope.
pub fn liked_json(ids: &[RecordId]) -> Value {
    json!({"success": true, "recipe_ids": ids})
}

/// A draft that passes validation.
pub fn draft(title: &str) -> RecordDraft {
    RecordDraft {
        title: title.to_string(),
        ingredients: vec![
            Ingredient::new("Flour", 200.0, "g"),
            Ingredient::new("Milk", 300.0, "ml"),
        ],
        steps: vec![
            Step::new(1, "Whisk flour and milk together"),
            Step::new(2, "Fry in a hot buttered pan"),
        ],
        meal_type: Some("Breakfast".to_string()),
        food_type: None,
    }
}
