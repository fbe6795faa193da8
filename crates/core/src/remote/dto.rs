//! Wire shapes of the catalog API and their lenient decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::catalog::{renumber_steps, Ingredient, Record, RecordDraft, RecordId, Step};

/// Common envelope fields. `success` is optional; only an explicit `false`
/// marks a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeStatus {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl EnvelopeStatus {
    pub fn rejection(&self) -> Option<String> {
        match self.success {
            Some(false) => Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "server reported failure".to_string()),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipesEnvelope {
    #[serde(flatten)]
    pub status: EnvelopeStatus,
    /// Kept as raw values so one bad item cannot fail the listing. A
    /// missing list means the data is unavailable, not an empty catalog.
    #[serde(default)]
    pub recipes: Option<Vec<Value>>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LikedIdsEnvelope {
    #[serde(flatten)]
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub recipe_ids: Vec<RecordId>,
}

#[derive(Debug, Deserialize)]
pub struct MutationEnvelope {
    #[serde(flatten)]
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default, alias = "photo_url")]
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    #[serde(flatten)]
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// A remote record as sent by the server, before normalisation.
#[derive(Debug, Deserialize)]
struct RecordDto {
    id: Option<RecordId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    ingredients: Option<Value>,
    #[serde(default)]
    instructions: Option<Value>,
    #[serde(default, rename = "userId", alias = "user_id")]
    user_id: Option<Value>,
    #[serde(default)]
    meal_type: Option<String>,
    #[serde(default)]
    food_type: Option<String>,
    #[serde(default, alias = "photo_url")]
    photo: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

/// Outbound create/update payload.
#[derive(Debug, Serialize)]
pub struct RecordPayload<'a> {
    pub title: &'a str,
    pub ingredients: &'a [Ingredient],
    pub instructions: &'a [Step],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_type: Option<&'a str>,
}

impl<'a> From<&'a RecordDraft> for RecordPayload<'a> {
    fn from(draft: &'a RecordDraft) -> Self {
        Self {
            title: &draft.title,
            ingredients: &draft.ingredients,
            instructions: &draft.steps,
            meal_type: draft.meal_type.as_deref(),
            food_type: draft.food_type.as_deref(),
        }
    }
}

/// Why a single remote item was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedItem {
    pub index: usize,
    pub id: Option<RecordId>,
    pub reason: String,
}

/// Decode one remote record.
///
/// Fails only for a missing integer id or a blank title. Unreadable
/// ingredient or step lists degrade to empty lists.
pub fn decode_record(index: usize, value: &Value) -> Result<Record, MalformedItem> {
    let dto: RecordDto = serde_json::from_value(value.clone()).map_err(|e| MalformedItem {
        index,
        id: value.get("id").and_then(Value::as_i64),
        reason: e.to_string(),
    })?;

    let id = dto.id.ok_or_else(|| MalformedItem {
        index,
        id: None,
        reason: "missing id".to_string(),
    })?;

    let title = dto
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MalformedItem {
            index,
            id: Some(id),
            reason: "blank title".to_string(),
        })?;

    let ingredients: Vec<Ingredient> = decode_list(dto.ingredients.as_ref(), "ingredients", id);
    let mut steps: Vec<Step> = decode_list(dto.instructions.as_ref(), "instructions", id);
    renumber_steps(&mut steps);

    Ok(Record {
        id,
        title,
        ingredients,
        steps,
        owner_id: dto.user_id.as_ref().and_then(owner_to_string),
        meal_type: non_blank(dto.meal_type),
        food_type: non_blank(dto.food_type),
        photo_url: non_blank(dto.photo),
        created_at: dto.created_at,
        liked: false,
    })
}

/// Decode a list that may arrive as an array or as a string holding one.
fn decode_list<T: DeserializeOwned>(value: Option<&Value>, field: &str, id: RecordId) -> Vec<T> {
    let parsed = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => return Vec::new(),
        Some(Value::String(s)) => serde_json::from_str::<Vec<T>>(s),
        Some(v @ Value::Array(_)) => serde_json::from_value::<Vec<T>>(v.clone()),
        Some(other) => {
            warn!(record_id = id, field, kind = json_kind(other), "Unexpected list type, using empty list");
            return Vec::new();
        }
    };
    parsed.unwrap_or_else(|e| {
        warn!(record_id = id, field, error = %e, "Unreadable list, using empty list");
        Vec::new()
    })
}

fn owner_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s.clone())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
