//! Catalog domain: records, their editable sub-lists, validation and the
//! id-set reconciliation used by sync.

mod editing;
mod reconcile;
mod types;
mod validate;

pub use editing::{
    renumber_steps, steps_are_contiguous, IngredientList, ListEditError, StepList,
};
pub use reconcile::{reconcile, Reconciliation};
pub use types::*;
pub use validate::{
    validate_draft, validate_ingredients, validate_steps, validate_title, ValidationError,
};
