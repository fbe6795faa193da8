//! Content validation run before a record is created or updated remotely.

use thiserror::Error;

use super::{Ingredient, RecordDraft, Step};
use crate::error::ErrorKind;

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 100;
const INSTRUCTION_MIN: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Title must be at least 3 characters")]
    TitleTooShort,

    #[error("Title must be at most 100 characters")]
    TitleTooLong,

    #[error("At least one ingredient is required")]
    NoIngredients,

    #[error("Ingredient #{0} needs a name")]
    IngredientName(usize),

    #[error("Ingredient #{0} needs a unit")]
    IngredientUnit(usize),

    #[error("Ingredient #{0} needs a positive quantity")]
    IngredientQuantity(usize),

    #[error("At least one step is required")]
    NoSteps,

    #[error("Step #{0} needs an instruction")]
    EmptyInstruction(usize),

    #[error("Step #{0} instruction is too short (minimum 7 characters)")]
    InstructionTooShort(usize),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Permanent
    }
}

/// Validate a full draft; the first violation wins.
pub fn validate_draft(draft: &RecordDraft) -> Result<(), ValidationError> {
    validate_title(&draft.title)?;
    validate_ingredients(&draft.ingredients)?;
    validate_steps(&draft.steps)?;
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    match len {
        0 => Err(ValidationError::EmptyTitle),
        l if l < TITLE_MIN => Err(ValidationError::TitleTooShort),
        l if l > TITLE_MAX => Err(ValidationError::TitleTooLong),
        _ => Ok(()),
    }
}

pub fn validate_ingredients(ingredients: &[Ingredient]) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::NoIngredients);
    }
    for (i, ingredient) in ingredients.iter().enumerate() {
        let position = i + 1;
        if ingredient.name.trim().is_empty() {
            return Err(ValidationError::IngredientName(position));
        }
        if ingredient.unit.trim().is_empty() {
            return Err(ValidationError::IngredientUnit(position));
        }
        if ingredient.quantity <= 0.0 || !ingredient.quantity.is_finite() {
            return Err(ValidationError::IngredientQuantity(position));
        }
    }
    Ok(())
}

pub fn validate_steps(steps: &[Step]) -> Result<(), ValidationError> {
    if steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }
    for (i, step) in steps.iter().enumerate() {
        let position = i + 1;
        let len = step.instruction.trim().chars().count();
        if len == 0 {
            return Err(ValidationError::EmptyInstruction(position));
        }
        if len < INSTRUCTION_MIN {
            return Err(ValidationError::InstructionTooShort(position));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> RecordDraft {
        RecordDraft {
            title: "Lentil soup".to_string(),
            ingredients: vec![Ingredient::new("Lentils", 200.0, "g")],
            steps: vec![Step::new(1, "Simmer for 30 minutes")],
            meal_type: None,
            food_type: None,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(validate_draft(&valid_draft()).is_ok());
    }

    #[test]
    fn test_title_bounds() {
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_title("ab"), Err(ValidationError::TitleTooShort));
        assert_eq!(
            validate_title(&"x".repeat(101)),
            Err(ValidationError::TitleTooLong)
        );
        assert!(validate_title("Pho").is_ok());
    }

    #[test]
    fn test_ingredient_positions_are_one_based() {
        let mut draft = valid_draft();
        draft.ingredients.push(Ingredient::new("Water", 1.0, ""));
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::IngredientUnit(2))
        );

        draft.ingredients[1] = Ingredient::new("Water", 0.0, "l");
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::IngredientQuantity(2))
        );
    }

    #[test]
    fn test_step_instruction_length() {
        let mut draft = valid_draft();
        draft.steps.push(Step::new(2, "Stir"));
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::InstructionTooShort(2))
        );

        draft.steps.clear();
        assert_eq!(validate_draft(&draft), Err(ValidationError::NoSteps));
    }
}
