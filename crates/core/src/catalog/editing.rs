//! Editing operations on a record's step and ingredient lists.
//!
//! Every step mutation re-establishes numbering 1..N, so a list that went
//! through any of these functions is always contiguous.

use thiserror::Error;
use tracing::debug;

use super::{Ingredient, Step};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListEditError {
    #[error("Invalid {list} position: {position}")]
    InvalidPosition { list: &'static str, position: usize },

    #[error("Cannot remove the last {0}")]
    LastItem(&'static str),
}

/// Renumber steps in place to 1..N following their current order.
pub fn renumber_steps(steps: &mut [Step]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.number = (i + 1) as u32;
    }
}

/// Whether steps are numbered 1..N with no gaps.
pub fn steps_are_contiguous(steps: &[Step]) -> bool {
    steps
        .iter()
        .enumerate()
        .all(|(i, s)| s.number == (i + 1) as u32)
}

/// Ordered, always-contiguous list of steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepList {
    steps: Vec<Step>,
}

impl StepList {
    /// Start a list with a single empty step numbered 1.
    pub fn initial() -> Self {
        Self {
            steps: vec![Step::new(1, "")],
        }
    }

    /// Adopt existing steps, renumbering them.
    pub fn from_steps(mut steps: Vec<Step>) -> Self {
        if !steps_are_contiguous(&steps) {
            debug!(count = steps.len(), "Renumbering non-contiguous steps");
            renumber_steps(&mut steps);
        }
        Self { steps }
    }

    pub fn as_slice(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append an empty step numbered N+1.
    pub fn push_empty(&mut self) -> &Step {
        let number = self.steps.len() as u32 + 1;
        self.steps.push(Step::new(number, ""));
        debug!(number, "Added empty step");
        &self.steps[self.steps.len() - 1]
    }

    /// Replace the step at `position` (0-based); the number is reassigned.
    pub fn update(&mut self, position: usize, mut step: Step) -> Result<(), ListEditError> {
        self.check_position(position)?;
        step.number = (position + 1) as u32;
        self.steps[position] = step;
        Ok(())
    }

    /// Remove the step at `position`. The last remaining step cannot be removed.
    pub fn remove(&mut self, position: usize) -> Result<Step, ListEditError> {
        self.check_position(position)?;
        if self.steps.len() <= 1 {
            return Err(ListEditError::LastItem("step"));
        }
        let removed = self.steps.remove(position);
        renumber_steps(&mut self.steps);
        debug!(position, remaining = self.steps.len(), "Removed step");
        Ok(removed)
    }

    /// Move a step from one position to another.
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<(), ListEditError> {
        self.check_position(from)?;
        self.check_position(to)?;
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        renumber_steps(&mut self.steps);
        Ok(())
    }

    /// Final pass before a save: renumber and hand the steps over.
    pub fn prepare_for_saving(mut self) -> Vec<Step> {
        renumber_steps(&mut self.steps);
        self.steps
    }

    fn check_position(&self, position: usize) -> Result<(), ListEditError> {
        if position >= self.steps.len() {
            return Err(ListEditError::InvalidPosition {
                list: "step",
                position,
            });
        }
        Ok(())
    }
}

/// Ordered list of ingredients; never emptied by removal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngredientList {
    items: Vec<Ingredient>,
}

impl IngredientList {
    pub fn initial() -> Self {
        Self {
            items: vec![Ingredient::default()],
        }
    }

    pub fn from_items(items: Vec<Ingredient>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Ingredient] {
        &self.items
    }

    pub fn push_empty(&mut self) {
        self.items.push(Ingredient::default());
    }

    pub fn update(&mut self, position: usize, ingredient: Ingredient) -> Result<(), ListEditError> {
        let slot = self
            .items
            .get_mut(position)
            .ok_or(ListEditError::InvalidPosition {
                list: "ingredient",
                position,
            })?;
        *slot = ingredient;
        Ok(())
    }

    pub fn remove(&mut self, position: usize) -> Result<Ingredient, ListEditError> {
        if position >= self.items.len() {
            return Err(ListEditError::InvalidPosition {
                list: "ingredient",
                position,
            });
        }
        if self.items.len() <= 1 {
            return Err(ListEditError::LastItem("ingredient"));
        }
        Ok(self.items.remove(position))
    }

    pub fn into_items(self) -> Vec<Ingredient> {
        self.items
    }
}
