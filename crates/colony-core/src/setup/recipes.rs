//! Built-in recipe catalog, used when no recipe file is given.

use crate::error::ConfigError;
use crate::jobs::RecipeBook;

pub const DEFAULT_RECIPES: &str = r#"
[[recipe]]
name = "cook_simple_meal"

[[recipe.inputs]]
tag = "raw_food"

[[recipe.steps]]
station_tag = "counter"
action = "chop"
duration = 2.0
animation = "chopping"
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
animation = "eating"

[[recipe]]
name = "make_sandwich"
motive_effects = { hunger = 40.0 }

[[recipe.inputs]]
tag = "bread"

[[recipe.steps]]
station_tag = "counter"
action = "assemble"
duration = 1.5
"#;

pub fn default_recipes() -> Result<RecipeBook, ConfigError> {
    RecipeBook::from_toml_str(DEFAULT_RECIPES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MotiveKind;

    #[test]
    fn test_default_catalog() {
        let book = default_recipes().unwrap();
        assert_eq!(book.len(), 3);

        let cook = book.get("cook_simple_meal").unwrap();
        assert!(!cook.is_consumption());
        assert_eq!(cook.station_tags_from(0), vec!["counter", "stove"]);
        assert_eq!(cook.tag_at_step("raw_food", 2), "cooked_meal");

        let hunger: Vec<&str> = book
            .for_motive(MotiveKind::Hunger)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(hunger, vec!["eat_meal", "make_sandwich"]);
    }
}
