//! Recipes
//!
//! Immutable task definitions. A recipe lists the items it needs, the
//! station steps that transform them, what it produces, and which motives it
//! satisfies on completion. Recipes are loaded from TOML and shared by every
//! job that executes them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::components::{ItemState, MotiveKind};
use crate::error::ConfigError;

/// An item a recipe needs in hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeInput {
    pub tag: String,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    /// Consumed inputs disappear on completion
    #[serde(default = "default_consumed")]
    pub consumed: bool,
}

fn default_quantity() -> usize {
    1
}

fn default_consumed() -> bool {
    true
}

/// What an item turns into when a step finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformTarget {
    /// New tag; the state is inferred from it
    Tag(String),
    /// New tag with an explicit state
    Full { tag: String, state: ItemState },
}

impl TransformTarget {
    pub fn tag(&self) -> &str {
        match self {
            TransformTarget::Tag(tag) => tag,
            TransformTarget::Full { tag, .. } => tag,
        }
    }

    pub fn state(&self) -> Option<ItemState> {
        match self {
            TransformTarget::Tag(_) => None,
            TransformTarget::Full { state, .. } => Some(*state),
        }
    }
}

/// One timed action, usually performed at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    /// Empty for steps performed in place
    #[serde(default)]
    pub station_tag: String,
    pub action: String,
    /// Seconds of work
    pub duration: f32,
    /// Cosmetic only
    #[serde(default)]
    pub animation: String,
    #[serde(default)]
    pub input_transform: BTreeMap<String, TransformTarget>,
}

impl RecipeStep {
    pub fn needs_station(&self) -> bool {
        !self.station_tag.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeOutput {
    pub tag: String,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
}

/// An immutable task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<RecipeInput>,
    /// Required but never consumed
    #[serde(default)]
    pub tools: Vec<String>,
    pub steps: Vec<RecipeStep>,
    #[serde(default)]
    pub outputs: Vec<RecipeOutput>,
    /// Applied only when the whole recipe completes
    #[serde(default)]
    pub motive_effects: BTreeMap<MotiveKind, f32>,
}

impl Recipe {
    pub fn step(&self, index: usize) -> Option<&RecipeStep> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Consumption recipes satisfy at least one motive.
    pub fn is_consumption(&self) -> bool {
        !self.motive_effects.is_empty()
    }

    /// True when `motive` appears among the effects, whatever the amount.
    pub fn fulfills(&self, motive: MotiveKind) -> bool {
        self.motive_effects.contains_key(&motive)
    }

    /// The tag an input carries once steps `0..step` have run.
    pub fn tag_at_step(&self, tag: &str, step: usize) -> String {
        let mut current = tag.to_string();
        for s in self.steps.iter().take(step) {
            if let Some(target) = s.input_transform.get(&current) {
                current = target.tag().to_string();
            }
        }
        current
    }

    /// Items needed in hand to run the recipe from `step` onward, as
    /// `(tag, quantity)` in input order followed by tools.
    pub fn requirements_at(&self, step: usize) -> Vec<(String, usize)> {
        let mut needed: Vec<(String, usize)> = Vec::new();
        let mut add = |tag: String, quantity: usize| match needed.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, q)) => *q += quantity,
            None => needed.push((tag, quantity)),
        };
        for input in &self.inputs {
            add(self.tag_at_step(&input.tag, step), input.quantity);
        }
        for tool in &self.tools {
            add(tool.clone(), 1);
        }
        needed
    }

    /// Station tags the remaining steps use, in order, without repeats.
    pub fn station_tags_from(&self, step: usize) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for s in self.steps.iter().skip(step).filter(|s| s.needs_station()) {
            if !tags.contains(&s.station_tag.as_str()) {
                tags.push(&s.station_tag);
            }
        }
        tags
    }

    /// Checks the recipe can execute at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRecipe {
            recipe: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.steps.is_empty() {
            return Err(invalid("recipe has no steps"));
        }
        if self.inputs.iter().any(|i| i.quantity == 0) || self.outputs.iter().any(|o| o.quantity == 0) {
            return Err(invalid("quantities must be positive"));
        }
        if self.steps.iter().any(|s| !s.duration.is_finite() || s.duration < 0.0) {
            return Err(invalid("step durations must be finite and non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RecipeFile {
    #[serde(default)]
    recipe: Vec<Recipe>,
}

/// Resource: the ordered, immutable recipe catalog.
#[derive(Resource, Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Arc<Recipe>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `[[recipe]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: RecipeFile = toml::from_str(content)?;
        let mut book = Self::new();
        for recipe in file.recipe {
            book.insert(recipe)?;
        }
        Ok(book)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Adds a recipe, replacing any recipe of the same name in place.
    pub fn insert(&mut self, recipe: Recipe) -> Result<(), ConfigError> {
        recipe.validate()?;
        let recipe = Arc::new(recipe);
        match self.recipes.iter_mut().find(|r| r.name == recipe.name) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Recipe>> {
        self.recipes.iter().find(|r| r.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.iter()
    }

    /// Recipes that satisfy `motive`, in catalog order.
    pub fn for_motive(&self, motive: MotiveKind) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.iter().filter(move |r| r.fulfills(motive))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOKING: &str = r#"
[[recipe]]
name = "cook_simple_meal"

[[recipe.inputs]]
tag = "raw_food"

[[recipe.steps]]
station_tag = "counter"
action = "chop"
duration = 2.0
input_transform = { raw_food = "chopped_food" }

[[recipe.steps]]
station_tag = "stove"
action = "cook"
duration = 3.0
animation = "stirring"
input_transform = { chopped_food = { tag = "cooked_meal", state = "cooked" } }

[[recipe.outputs]]
tag = "cooked_meal"

[[recipe]]
name = "eat_meal"
motive_effects = { hunger = 60.0 }

[[recipe.inputs]]
tag = "cooked_meal"

[[recipe.steps]]
action = "eat"
duration = 1.5
"#;

    #[test]
    fn test_parse_book() {
        let book = RecipeBook::from_toml_str(COOKING).unwrap();
        assert_eq!(book.len(), 2);

        let cook = book.get("cook_simple_meal").unwrap();
        assert_eq!(cook.inputs[0].quantity, 1);
        assert!(cook.inputs[0].consumed);
        assert_eq!(cook.step_count(), 2);
        assert_eq!(cook.steps[1].animation, "stirring");
        assert_eq!(
            cook.steps[1].input_transform.get("chopped_food").and_then(|t| t.state()),
            Some(ItemState::Cooked)
        );
        assert!(!cook.is_consumption());

        let eat = book.get("eat_meal").unwrap();
        assert!(!eat.steps[0].needs_station());
        assert!(eat.fulfills(MotiveKind::Hunger));
        assert_eq!(book.for_motive(MotiveKind::Hunger).count(), 1);
        assert_eq!(book.for_motive(MotiveKind::Fun).count(), 0);
    }

    #[test]
    fn test_requirements_follow_transforms() {
        let book = RecipeBook::from_toml_str(COOKING).unwrap();
        let cook = book.get("cook_simple_meal").unwrap();
        assert_eq!(cook.requirements_at(0), vec![("raw_food".to_string(), 1)]);
        assert_eq!(cook.requirements_at(1), vec![("chopped_food".to_string(), 1)]);
        assert_eq!(cook.tag_at_step("raw_food", 2), "cooked_meal");
        assert_eq!(cook.station_tags_from(0), vec!["counter", "stove"]);
        assert_eq!(cook.station_tags_from(1), vec!["stove"]);
    }

    #[test]
    fn test_tools_are_required() {
        let mut recipe = RecipeBook::from_toml_str(COOKING)
            .unwrap()
            .get("cook_simple_meal")
            .unwrap()
            .as_ref()
            .clone();
        recipe.tools = vec!["knife".to_string()];
        assert_eq!(
            recipe.requirements_at(0),
            vec![("raw_food".to_string(), 1), ("knife".to_string(), 1)]
        );
    }

    #[test]
    fn test_invalid_recipes_rejected() {
        let no_steps = "[[recipe]]\nname = \"nothing\"\nsteps = []\n";
        assert!(matches!(
            RecipeBook::from_toml_str(no_steps),
            Err(ConfigError::InvalidRecipe { .. })
        ));
    }

    #[test]
    fn test_any_listed_effect_counts_for_motive() {
        let book = RecipeBook::from_toml_str(
            r#"
[[recipe]]
name = "cold_shower"
motive_effects = { hygiene = 30.0, fun = -5.0, energy = 0.0 }

[[recipe.steps]]
station_tag = "shower"
action = "wash"
duration = 2.0
"#,
        )
        .unwrap();
        let shower = book.get("cold_shower").unwrap();
        assert!(shower.fulfills(MotiveKind::Fun));
        assert!(shower.fulfills(MotiveKind::Energy));
        assert!(!shower.fulfills(MotiveKind::Bladder));
        assert_eq!(book.for_motive(MotiveKind::Fun).count(), 1);
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut book = RecipeBook::from_toml_str(COOKING).unwrap();
        let mut eat = book.get("eat_meal").unwrap().as_ref().clone();
        eat.motive_effects.insert(MotiveKind::Fun, 5.0);
        book.insert(eat).unwrap();
        assert_eq!(book.len(), 2);
        assert!(book.get("eat_meal").unwrap().fulfills(MotiveKind::Fun));
        assert_eq!(book.iter().next().unwrap().name, "cook_simple_meal");
    }
}
