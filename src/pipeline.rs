//! AI recipe pipeline: fridge photo → ingredients, ingredients → recipes.
//!
//! Talks to Ollama's /api/generate endpoint. Ingredient recognition sends the
//! photo to a vision model; recipe generation asks for JSON and parses it into
//! `Recipe`s.

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::error::PipelineError;
use crate::recipe::Recipe;

const IDENTIFY_PROMPT: &str = "Analyze this image of a refrigerator or pantry. Identify all the edible food items and ingredients visible. List them as a simple, comma-separated string. For example: 'eggs, milk, carrots, leftover chicken, cheddar cheese'. Only list the ingredients. If no ingredients are found, return an empty string.";

const RECIPE_PROMPT: &str = r#"Generate 3 distinct recipe ideas based on these details:
Available ingredients: {ingredients}
Dietary preferences: {filters}
{leftovers}
Respond with a JSON object of the form {"recipes": [...]}. Each recipe has:
- "recipeName": creative name of the recipe
- "description": a brief, enticing 1-2 sentence description of the dish
- "cookingTime": estimated total cooking time, e.g. "30 minutes"
- "difficulty": one of "Easy", "Medium" or "Hard"
- "neededIngredients": ingredients required that are NOT in the available list
- "usedIngredients": ingredients from the available list used in this recipe
- "instructions": clear, sequential step-by-step instructions; mention times such as "10 minutes" where a step needs one

Output ONLY the JSON."#;

const UNEXPECTED_FORMAT: &str =
    "The AI returned an unexpected format. Please try modifying your ingredients or filters.";

/// Everything the user supplied for a recipe request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    pub dietary_filters: Vec<String>,
    pub leftovers: String,
}

impl RecipeRequest {
    /// A request needs at least one ingredient or a leftovers description.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let has_ingredients = self.ingredients.iter().any(|i| !i.trim().is_empty());
        if !has_ingredients && self.leftovers.trim().is_empty() {
            return Err(PipelineError::EmptyRequest);
        }
        Ok(())
    }

    pub fn prompt(&self) -> String {
        let filters = if self.dietary_filters.is_empty() {
            "None".to_string()
        } else {
            self.dietary_filters.join(", ")
        };
        let leftovers = match self.leftovers.trim() {
            "" => String::new(),
            text => format!("Leftovers to incorporate: \"{text}\"\n"),
        };

        RECIPE_PROMPT
            .replace("{ingredients}", &self.ingredients.join(", "))
            .replace("{filters}", &filters)
            .replace("{leftovers}", &leftovers)
    }
}

/// A photo, base64-encoded for the vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub base64: String,
}

impl ImageData {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            base64: STANDARD.encode(bytes),
        }
    }

    /// Read an image file; the MIME type comes from the extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            _ => {
                return Err(PipelineError::InvalidImage(format!(
                    "unsupported image type: {}",
                    path.display()
                )))
            }
        };

        let bytes = std::fs::read(path).map_err(|e| {
            PipelineError::InvalidImage(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(Self::from_bytes(mime_type, &bytes))
    }

    /// Parse a browser data URL (`data:image/png;base64,...`).
    pub fn from_data_url(url: &str) -> Result<Self, PipelineError> {
        let invalid = |msg: &str| PipelineError::InvalidImage(msg.to_string());

        let rest = url.strip_prefix("data:").ok_or_else(|| invalid("not a data URL"))?;
        let (header, payload) = rest.split_once(',').ok_or_else(|| invalid("missing payload"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("data URL is not base64-encoded"))?;
        if !mime_type.starts_with("image/") {
            return Err(invalid("data URL is not an image"));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| PipelineError::InvalidImage(format!("bad base64 payload: {e}")))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            base64: payload.to_string(),
        })
    }
}

pub trait RecipePipeline: Send + Sync {
    fn identify_ingredients(
        &self,
        image: &ImageData,
    ) -> impl Future<Output = Result<Vec<String>, PipelineError>> + Send;

    fn generate_recipes(
        &self,
        request: &RecipeRequest,
    ) -> impl Future<Output = Result<Vec<Recipe>, PipelineError>> + Send;
}

/// Split the model's comma-separated ingredient list.
pub fn split_ingredients(text: &str) -> Vec<String> {
    text.split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '.' || c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecipesPayload {
    List(Vec<Recipe>),
    Wrapped { recipes: Vec<Recipe> },
}

/// Parse the model's JSON reply into recipes.
pub fn parse_recipes(text: &str) -> Result<Vec<Recipe>, PipelineError> {
    let text = text.trim();
    // Some models wrap JSON in a Markdown code fence despite format=json
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|t| t.strip_suffix("```"))
        .unwrap_or(text)
        .trim();

    match serde_json::from_str::<RecipesPayload>(text) {
        Ok(RecipesPayload::List(recipes)) | Ok(RecipesPayload::Wrapped { recipes }) => Ok(recipes),
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            warn!("Failed to parse AI recipe response ({e}): {preview}");
            Err(PipelineError::Generation(UNEXPECTED_FORMAT.to_string()))
        }
    }
}

pub struct OllamaPipeline {
    config: AiConfig,
    client: Client,
}

impl OllamaPipeline {
    pub fn new(config: AiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure HTTP client: {e}, using defaults");
                Client::new()
            });

        Self { config, client }
    }

    /// POST to /api/generate and return the `response` text.
    async fn generate(&self, body: serde_json::Value) -> Result<String, String> {
        let url = format!("{}/api/generate", self.config.host);

        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_connect() {
                format!("Cannot connect to Ollama at {}", self.config.host)
            } else if e.is_timeout() {
                "Ollama request timed out".to_string()
            } else {
                format!("Ollama request failed: {e}")
            }
        })?;

        if !resp.status().is_success() {
            return Err(format!("Ollama returned status {}", resp.status()));
        }

        let data = resp
            .json::<serde_json::Value>()
            .await
            .map_err(|e| format!("Failed to read Ollama response: {e}"))?;

        Ok(data["response"].as_str().unwrap_or("").trim().to_string())
    }
}

impl RecipePipeline for OllamaPipeline {
    async fn identify_ingredients(&self, image: &ImageData) -> Result<Vec<String>, PipelineError> {
        let t_start = Instant::now();
        debug!(
            "Sending {} image to vision model '{}'",
            image.mime_type, self.config.vision_model
        );

        let body = json!({
            "model": self.config.vision_model,
            "prompt": IDENTIFY_PROMPT,
            "images": [image.base64],
            "stream": false,
            "options": { "temperature": 0.1 }
        });

        let text = self.generate(body).await.map_err(|e| {
            warn!("Ingredient recognition failed: {e}");
            PipelineError::Recognition(e)
        })?;

        let ingredients = split_ingredients(&text);
        info!(
            "Identified {} ingredients ({:.0}ms)",
            ingredients.len(),
            t_start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(ingredients)
    }

    async fn generate_recipes(&self, request: &RecipeRequest) -> Result<Vec<Recipe>, PipelineError> {
        request.validate()?;
        let t_start = Instant::now();
        debug!("Requesting recipes from '{}'", self.config.model);

        let body = json!({
            "model": self.config.model,
            "prompt": request.prompt(),
            "format": "json",
            "stream": false,
            "options": { "temperature": 0.7 }
        });

        let text = self.generate(body).await.map_err(|e| {
            warn!("Recipe generation failed: {e}");
            PipelineError::Generation(e)
        })?;

        let recipes = parse_recipes(&text)?;
        info!(
            "Generated {} recipes ({:.0}ms)",
            recipes.len(),
            t_start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(recipes)
    }
}
