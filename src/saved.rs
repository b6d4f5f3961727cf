//! Bookmarked recipes, keyed by recipe name.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::recipe::Recipe;
use crate::storage::{self, Storage, SAVED_RECIPES_KEY};

pub struct SavedRecipes {
    recipes: Vec<Recipe>,
    storage: Arc<dyn Storage>,
}

impl SavedRecipes {
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let recipes = match storage::load_json::<Vec<Recipe>>(&*storage, SAVED_RECIPES_KEY) {
            Ok(Some(recipes)) => recipes,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load saved recipes: {e}");
                Vec::new()
            }
        };
        debug!("Loaded {} saved recipes", recipes.len());
        Self { recipes, storage }
    }

    pub fn list(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        crate::recipe::find_by_name(&self.recipes, name)
    }

    pub fn is_saved(&self, name: &str) -> bool {
        self.recipes.iter().any(|r| r.name == name)
    }

    /// Save a recipe. Returns false if one with the same name is already saved.
    pub fn save(&mut self, recipe: Recipe) -> bool {
        if self.is_saved(&recipe.name) {
            return false;
        }
        info!("Saved recipe: {}", recipe.name);
        self.recipes.push(recipe);
        self.persist();
        true
    }

    /// Remove a recipe by name. Returns false if it was not saved.
    pub fn unsave(&mut self, name: &str) -> bool {
        let before = self.recipes.len();
        self.recipes.retain(|r| r.name != name);
        let removed = self.recipes.len() != before;
        if removed {
            info!("Removed saved recipe: {name}");
        }
        self.persist();
        removed
    }

    fn persist(&self) {
        if let Err(e) = storage::save_json(&*self.storage, SAVED_RECIPES_KEY, &self.recipes) {
            warn!("Failed to save recipes: {e}");
        }
    }
}
