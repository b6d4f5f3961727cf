//! The main screen's state: what's in the fridge, dietary filters, leftovers,
//! and the latest batch of generated recipes.
//!
//! A successful generation awards points per ingredient and counts toward
//! today's streak. Failed scans or generations leave everything as it was.

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::gamification::{GamificationStats, Ledger};
use crate::pipeline::{ImageData, RecipePipeline, RecipeRequest};
use crate::recipe::Recipe;

pub const DIETARY_FILTERS: [&str; 7] = [
    "Vegan",
    "Vegetarian",
    "Gluten-Free",
    "Keto",
    "Low-Carb",
    "High-Protein",
    "Dairy-Free",
];

/// Canonical spelling of a dietary filter, matched case-insensitively.
pub fn canonical_filter(name: &str) -> Option<&'static str> {
    let name = name.trim();
    DIETARY_FILTERS
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(name))
}

/// Ingredients are stored trimmed and lowercase.
pub fn normalize_ingredient(name: &str) -> Option<String> {
    let name = name.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Append new ingredients, skipping blanks and duplicates. Returns how many
/// were added.
pub fn merge_ingredients<I, S>(existing: &mut Vec<String>, new: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let before = existing.len();
    for name in new {
        if let Some(name) = normalize_ingredient(name.as_ref()) {
            if !existing.contains(&name) {
                existing.push(name);
            }
        }
    }
    existing.len() - before
}

/// Credit a successful generation: points for each ingredient used in the
/// request, then today's streak. Empty batches earn nothing.
pub fn award_generation(
    ledger: &mut Ledger,
    request: &RecipeRequest,
    recipes: &[Recipe],
    points_per_ingredient: u64,
) -> GamificationStats {
    if recipes.is_empty() {
        return ledger.stats();
    }
    let count = request.ingredients.len() as u64;
    ledger.add_points(count.saturating_mul(points_per_ingredient));
    ledger.register_use()
}

pub struct Kitchen<P> {
    pipeline: P,
    ledger: Ledger,
    points_per_ingredient: u64,
    ingredients: Vec<String>,
    filters: Vec<&'static str>,
    leftovers: String,
    recipes: Vec<Recipe>,
}

impl<P: RecipePipeline> Kitchen<P> {
    pub fn new(pipeline: P, ledger: Ledger, points_per_ingredient: u64) -> Self {
        Self {
            pipeline,
            ledger,
            points_per_ingredient,
            ingredients: Vec::new(),
            filters: Vec::new(),
            leftovers: String::new(),
            recipes: Vec::new(),
        }
    }

    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    pub fn filters(&self) -> &[&'static str] {
        &self.filters
    }

    pub fn leftovers(&self) -> &str {
        &self.leftovers
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn stats(&self) -> GamificationStats {
        self.ledger.stats()
    }

    pub fn add_ingredient(&mut self, name: &str) -> bool {
        merge_ingredients(&mut self.ingredients, [name]) == 1
    }

    pub fn remove_ingredient(&mut self, name: &str) -> bool {
        let Some(name) = normalize_ingredient(name) else {
            return false;
        };
        let before = self.ingredients.len();
        self.ingredients.retain(|i| *i != name);
        self.ingredients.len() != before
    }

    /// Select or deselect a dietary filter. Returns the new selection state,
    /// or `None` for an unknown filter.
    pub fn toggle_filter(&mut self, name: &str) -> Option<bool> {
        let filter = canonical_filter(name)?;
        if let Some(pos) = self.filters.iter().position(|f| *f == filter) {
            self.filters.remove(pos);
            Some(false)
        } else {
            self.filters.push(filter);
            Some(true)
        }
    }

    pub fn set_leftovers(&mut self, text: &str) {
        self.leftovers = text.trim().to_string();
    }

    pub fn request(&self) -> RecipeRequest {
        RecipeRequest {
            ingredients: self.ingredients.clone(),
            dietary_filters: self.filters.iter().map(|f| f.to_string()).collect(),
            leftovers: self.leftovers.clone(),
        }
    }

    /// Add the ingredients recognised in a photo. Returns how many were new.
    pub async fn scan(&mut self, image: &ImageData) -> Result<usize, PipelineError> {
        let identified = self.pipeline.identify_ingredients(image).await?;
        let added = merge_ingredients(&mut self.ingredients, &identified);
        info!("Scan found {} ingredients ({added} new)", identified.len());
        Ok(added)
    }

    /// Generate a new batch of recipes, replacing the current one.
    pub async fn generate(&mut self) -> Result<&[Recipe], PipelineError> {
        let request = self.request();
        request.validate()?;

        let recipes = self.pipeline.generate_recipes(&request).await?;
        let stats = award_generation(
            &mut self.ledger,
            &request,
            &recipes,
            self.points_per_ingredient,
        );
        debug!("Stats after generation: {} points, {}-day streak", stats.points, stats.streak);

        self.recipes = recipes;
        Ok(&self.recipes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gamification::test_clock::FixedClock;
    use crate::pipeline::fake::FakePipeline;
    use crate::recipe::sample_recipe;
    use crate::storage::MemoryStorage;

    fn kitchen(pipeline: FakePipeline) -> Kitchen<FakePipeline> {
        let ledger = Ledger::load(
            Arc::new(MemoryStorage::new()),
            Arc::new(FixedClock::at(2024, 6, 12, 12)),
        );
        Kitchen::new(pipeline, ledger, 10)
    }

    fn ok_pipeline() -> FakePipeline {
        FakePipeline::new(
            Ok(vec!["Eggs".into(), "spinach".into()]),
            Ok(vec![
                sample_recipe("Frittata", &["Whisk.", "Bake 20 minutes."]),
                sample_recipe("Saag", &["Wilt the spinach."]),
            ]),
        )
    }

    #[test]
    fn test_add_ingredient_normalizes_and_dedups() {
        let mut kitchen = kitchen(ok_pipeline());
        assert!(kitchen.add_ingredient("  Chicken Breast "));
        assert!(!kitchen.add_ingredient("chicken breast"));
        assert!(!kitchen.add_ingredient("   "));
        assert_eq!(kitchen.ingredients(), ["chicken breast"]);

        assert!(kitchen.remove_ingredient("CHICKEN BREAST"));
        assert!(!kitchen.remove_ingredient("tofu"));
        assert!(kitchen.ingredients().is_empty());
    }

    #[test]
    fn test_toggle_filter() {
        let mut kitchen = kitchen(ok_pipeline());
        assert_eq!(kitchen.toggle_filter("vegan"), Some(true));
        assert_eq!(kitchen.toggle_filter("gluten-free"), Some(true));
        assert_eq!(kitchen.filters(), ["Vegan", "Gluten-Free"]);
        assert_eq!(kitchen.toggle_filter("VEGAN"), Some(false));
        assert_eq!(kitchen.filters(), ["Gluten-Free"]);
        assert_eq!(kitchen.toggle_filter("Carnivore"), None);
    }

    #[test]
    fn test_merge_ingredients() {
        let mut existing = vec!["eggs".to_string()];
        let added = merge_ingredients(&mut existing, ["Milk", "EGGS", "", "carrots", "milk"]);
        assert_eq!(added, 2);
        assert_eq!(existing, vec!["eggs", "milk", "carrots"]);
    }

    #[tokio::test]
    async fn test_empty_request_rejected_before_pipeline() {
        let mut kitchen = kitchen(ok_pipeline());
        kitchen.set_leftovers("   ");

        let err = kitchen.generate().await.unwrap_err();
        assert_eq!(err, PipelineError::EmptyRequest);
        assert_eq!(kitchen.pipeline.calls(), 0);
        assert_eq!(kitchen.stats().points, 0);
    }

    #[tokio::test]
    async fn test_generate_awards_points_and_streak() {
        let mut kitchen = kitchen(ok_pipeline());
        kitchen.add_ingredient("eggs");
        kitchen.add_ingredient("spinach");
        kitchen.add_ingredient("feta");
        kitchen.toggle_filter("Vegetarian");

        let recipes = kitchen.generate().await.unwrap();
        assert_eq!(recipes.len(), 2);

        let stats = kitchen.stats();
        assert_eq!(stats.points, 30);
        assert_eq!(stats.streak, 1);

        let sent = kitchen.pipeline.last_request().unwrap();
        assert_eq!(sent.dietary_filters, vec!["Vegetarian"]);
    }

    #[tokio::test]
    async fn test_leftovers_only_generation_earns_streak_not_points() {
        let mut kitchen = kitchen(ok_pipeline());
        kitchen.set_leftovers("half a roast chicken");

        kitchen.generate().await.unwrap();
        assert_eq!(kitchen.stats().points, 0);
        assert_eq!(kitchen.stats().streak, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_earns_nothing() {
        let mut kitchen = kitchen(FakePipeline::new(Ok(vec![]), Ok(vec![])));
        kitchen.add_ingredient("eggs");

        assert!(kitchen.generate().await.unwrap().is_empty());
        assert_eq!(kitchen.stats(), GamificationStats::default());
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_previous_batch() {
        let mut kitchen = kitchen(ok_pipeline());
        kitchen.add_ingredient("eggs");
        kitchen.generate().await.unwrap();
        let points = kitchen.stats().points;

        kitchen.pipeline.recipes = Err(PipelineError::Generation("busy".into()));
        let err = kitchen.generate().await.unwrap_err();

        assert!(matches!(err, PipelineError::Generation(_)));
        assert_eq!(kitchen.recipes().len(), 2);
        assert_eq!(kitchen.ingredients(), ["eggs"]);
        assert_eq!(kitchen.stats().points, points);
    }

    #[tokio::test]
    async fn test_scan_merges_lowercase() {
        let mut kitchen = kitchen(ok_pipeline());
        kitchen.add_ingredient("eggs");

        let image = ImageData::from_bytes("image/png", b"png");
        assert_eq!(kitchen.scan(&image).await.unwrap(), 1);
        assert_eq!(kitchen.ingredients(), ["eggs", "spinach"]);
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_ingredients() {
        let mut kitchen = kitchen(FakePipeline::new(
            Err(PipelineError::Recognition("offline".into())),
            Ok(vec![]),
        ));
        kitchen.add_ingredient("rice");

        let image = ImageData::from_bytes("image/png", b"png");
        assert!(matches!(
            kitchen.scan(&image).await,
            Err(PipelineError::Recognition(_))
        ));
        assert_eq!(kitchen.ingredients(), ["rice"]);
    }
}
