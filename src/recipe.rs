//! Recipe data produced by the pipeline.
//!
//! Field names on the wire match the JSON the model is asked for
//! (`recipeName`, `cookingTime`, ...), which is also the format saved
//! recipes are stored in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "Easy"),
            Self::Medium => write!(f, "Medium"),
            Self::Hard => write!(f, "Hard"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "recipeName")]
    pub name: String,
    pub description: String,
    #[serde(rename = "cookingTime")]
    pub cooking_time: String,
    pub difficulty: Difficulty,
    #[serde(rename = "usedIngredients", default)]
    pub ingredients_used: Vec<String>,
    #[serde(rename = "neededIngredients", default)]
    pub ingredients_needed: Vec<String>,
    pub instructions: Vec<String>,
}

impl Recipe {
    /// Render the recipe detail view as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.name),
            String::new(),
            self.description.clone(),
            String::new(),
            format!("- **Cooking time**: {}", self.cooking_time),
            format!("- **Difficulty**: {}", self.difficulty),
            String::new(),
            "## Ingredients You Have".to_string(),
        ];
        lines.extend(self.ingredients_used.iter().map(|i| format!("- {i}")));

        lines.push(String::new());
        lines.push("## Shopping List".to_string());
        if self.ingredients_needed.is_empty() {
            lines.push("- Nothing! You're all set.".to_string());
        } else {
            lines.extend(self.ingredients_needed.iter().map(|i| format!("- {i}")));
        }

        lines.push(String::new());
        lines.push("## Instructions".to_string());
        lines.extend(
            self.instructions
                .iter()
                .enumerate()
                .map(|(n, step)| format!("{}. {step}", n + 1)),
        );

        lines.join("\n")
    }
}

/// Find a recipe by exact name, falling back to a case-insensitive match.
pub fn find_by_name<'a>(recipes: &'a [Recipe], name: &str) -> Option<&'a Recipe> {
    recipes
        .iter()
        .find(|r| r.name == name)
        .or_else(|| recipes.iter().find(|r| r.name.eq_ignore_ascii_case(name)))
}

#[cfg(test)]
pub(crate) fn sample_recipe(name: &str, instructions: &[&str]) -> Recipe {
    Recipe {
        name: name.to_string(),
        description: "A quick test dish.".to_string(),
        cooking_time: "20 minutes".to_string(),
        difficulty: Difficulty::Easy,
        ingredients_used: vec!["eggs".to_string()],
        ingredients_needed: vec![],
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_model_output() {
        let json = r#"{
            "recipeName": "Veggie Omelette",
            "description": "Fluffy eggs with peppers.",
            "cookingTime": "15 minutes",
            "difficulty": "Easy",
            "neededIngredients": ["chives"],
            "usedIngredients": ["eggs", "peppers"],
            "instructions": ["Whisk the eggs.", "Cook for 3 minutes."]
        }"#;

        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.name, "Veggie Omelette");
        assert_eq!(recipe.difficulty, Difficulty::Easy);
        assert_eq!(recipe.ingredients_needed, vec!["chives"]);
        assert_eq!(recipe.instructions.len(), 2);
    }

    #[test]
    fn test_unknown_difficulty_rejected() {
        let json = r#"{"recipeName":"X","description":"","cookingTime":"","difficulty":"Extreme","instructions":[]}"#;
        assert!(serde_json::from_str::<Recipe>(json).is_err());
    }

    #[test]
    fn test_markdown_empty_shopping_list() {
        let recipe = sample_recipe("Toast", &["Toast the bread."]);
        let md = recipe.to_markdown();
        assert!(md.starts_with("# Toast"));
        assert!(md.contains("Nothing! You're all set."));
        assert!(md.contains("1. Toast the bread."));
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let recipes = vec![sample_recipe("Fried Rice", &["Fry."])];
        assert!(find_by_name(&recipes, "fried rice").is_some());
        assert!(find_by_name(&recipes, "Pancakes").is_none());
    }
}
