//! HTTP API for a browser front-end.
//!
//! Exposes recipe generation, photo scanning, stats and the saved-recipe
//! collection over JSON. Runs on 127.0.0.1:8780 by default using axum.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::gamification::{GamificationStats, Ledger};
use crate::kitchen::{award_generation, merge_ingredients};
use crate::pipeline::{ImageData, RecipePipeline, RecipeRequest};
use crate::recipe::Recipe;
use crate::saved::SavedRecipes;

pub struct ApiState<P> {
    pub pipeline: Arc<P>,
    pub ledger: Arc<Mutex<Ledger>>,
    pub saved: Arc<Mutex<SavedRecipes>>,
    pub points_per_ingredient: u64,
}

impl<P> ApiState<P> {
    pub fn new(pipeline: P, ledger: Ledger, saved: SavedRecipes, points_per_ingredient: u64) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            ledger: Arc::new(Mutex::new(ledger)),
            saved: Arc::new(Mutex::new(saved)),
            points_per_ingredient,
        }
    }
}

impl<P> Clone for ApiState<P> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            ledger: self.ledger.clone(),
            saved: self.saved.clone(),
            points_per_ingredient: self.points_per_ingredient,
        }
    }
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct IdentifyRequest {
    image: String,
    #[serde(default)]
    ingredients: Vec<String>,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match e {
            PipelineError::EmptyRequest | PipelineError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            PipelineError::Recognition(_) | PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(SimpleResponse::err(self.message))).into_response()
    }
}

/// Build the axum router.
pub fn router<P: RecipePipeline + 'static>(state: ApiState<P>) -> Router {
    Router::new()
        .route("/stats", get(handle_stats::<P>))
        .route("/recipes/generate", post(handle_generate::<P>))
        .route("/ingredients/identify", post(handle_identify::<P>))
        .route("/saved", get(handle_list_saved::<P>).post(handle_save::<P>))
        .route("/saved/{name}", delete(handle_unsave::<P>))
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve<P: RecipePipeline + 'static>(
    state: ApiState<P>,
    port: u16,
) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Shutting down API server");
        })
        .await
}

// --- Handlers ---

async fn handle_stats<P>(State(state): State<ApiState<P>>) -> Json<GamificationStats> {
    Json(state.ledger.lock().await.stats())
}

async fn handle_generate<P: RecipePipeline>(
    State(state): State<ApiState<P>>,
    Json(mut req): Json<RecipeRequest>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    // Same ingredient rules as the CLI kitchen: trimmed, lowercase, no repeats
    let mut ingredients = Vec::new();
    merge_ingredients(&mut ingredients, &req.ingredients);
    req.ingredients = ingredients;

    req.validate()?;
    info!(
        "HTTP /recipes/generate: {} ingredients, filters={:?}",
        req.ingredients.len(),
        req.dietary_filters
    );

    let recipes = state.pipeline.generate_recipes(&req).await?;
    let mut ledger = state.ledger.lock().await;
    award_generation(&mut ledger, &req, &recipes, state.points_per_ingredient);
    Ok(Json(recipes))
}

async fn handle_identify<P: RecipePipeline>(
    State(state): State<ApiState<P>>,
    Json(req): Json<IdentifyRequest>,
) -> Result<Json<Vec<String>>, ApiError> {
    let image = ImageData::from_data_url(&req.image)?;
    let identified = state.pipeline.identify_ingredients(&image).await?;

    let mut merged = Vec::new();
    merge_ingredients(&mut merged, &req.ingredients);
    let added = merge_ingredients(&mut merged, &identified);
    info!("HTTP /ingredients/identify: {added} new ingredients");
    Ok(Json(merged))
}

async fn handle_list_saved<P>(State(state): State<ApiState<P>>) -> Json<Vec<Recipe>> {
    Json(state.saved.lock().await.list().to_vec())
}

async fn handle_save<P>(
    State(state): State<ApiState<P>>,
    Json(recipe): Json<Recipe>,
) -> Json<SimpleResponse> {
    if recipe.name.trim().is_empty() {
        return Json(SimpleResponse::err("recipe name is empty"));
    }
    let saved = state.saved.lock().await.save(recipe);
    Json(SimpleResponse::ok(if saved { "saved" } else { "already saved" }))
}

async fn handle_unsave<P>(
    State(state): State<ApiState<P>>,
    Path(name): Path<String>,
) -> Json<SimpleResponse> {
    let removed = state.saved.lock().await.unsave(&name);
    Json(SimpleResponse::ok(if removed { "removed" } else { "not saved" }))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::gamification::test_clock::FixedClock;
    use crate::pipeline::fake::FakePipeline;
    use crate::recipe::sample_recipe;
    use crate::storage::MemoryStorage;

    async fn spawn(pipeline: FakePipeline) -> (String, ApiState<FakePipeline>) {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = Ledger::load(storage.clone(), Arc::new(FixedClock::at(2024, 6, 12, 9)));
        let saved = SavedRecipes::load(storage);
        let state = ApiState::new(pipeline, ledger, saved, 10);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    fn pipeline() -> FakePipeline {
        FakePipeline::new(
            Ok(vec!["Tomato".into(), "basil".into()]),
            Ok(vec![sample_recipe("Bruschetta", &["Toast the bread."])]),
        )
    }

    #[tokio::test]
    async fn test_generate_awards_points() {
        let (base, state) = spawn(pipeline()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/recipes/generate"))
            .json(&json!({"ingredients": ["bread", "tomato"], "dietaryFilters": ["Vegan"]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body[0]["recipeName"], "Bruschetta");

        let stats: Value = client
            .get(format!("{base}/stats"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["points"], 20);
        assert_eq!(stats["streak"], 1);
        assert_eq!(state.pipeline.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_normalizes_ingredients_before_awarding() {
        let (base, state) = spawn(pipeline()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/recipes/generate"))
            .json(&json!({"ingredients": ["", " ", "eggs", "EGGS", " Eggs "], "leftovers": "rice"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let sent = state.pipeline.last_request().unwrap();
        assert_eq!(sent.ingredients, vec!["eggs"]);
        assert_eq!(sent.leftovers, "rice");
        assert_eq!(state.ledger.lock().await.stats().points, 10);
    }

    #[tokio::test]
    async fn test_generate_blank_ingredients_only_is_bad_request() {
        let (base, state) = spawn(pipeline()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/recipes/generate"))
            .json(&json!({"ingredients": ["", "   "]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(state.pipeline.calls(), 0);
        assert_eq!(state.ledger.lock().await.stats().points, 0);
    }

    #[tokio::test]
    async fn test_generate_empty_request_is_bad_request() {
        let (base, state) = spawn(pipeline()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/recipes/generate"))
            .json(&json!({"ingredients": [], "leftovers": "  "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Please add some ingredients or leftovers first!");
        assert_eq!(state.pipeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_failure_is_bad_gateway() {
        let failing = FakePipeline::new(
            Ok(vec![]),
            Err(PipelineError::Generation("model offline".into())),
        );
        let (base, state) = spawn(failing).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/recipes/generate"))
            .json(&json!({"ingredients": ["rice"]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 502);
        assert_eq!(state.ledger.lock().await.stats().points, 0);
    }

    #[tokio::test]
    async fn test_identify_merges_ingredients() {
        let (base, _state) = spawn(pipeline()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/ingredients/identify"))
            .json(&json!({
                "image": "data:image/jpeg;base64,aGVsbG8=",
                "ingredients": ["Basil", "garlic"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Vec<String> = resp.json().await.unwrap();
        assert_eq!(body, vec!["basil", "garlic", "tomato"]);
    }

    #[tokio::test]
    async fn test_identify_rejects_bad_image() {
        let (base, state) = spawn(pipeline()).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/ingredients/identify"))
            .json(&json!({"image": "not a data url"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert_eq!(state.pipeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_saved_roundtrip() {
        let (base, _state) = spawn(pipeline()).await;
        let client = reqwest::Client::new();
        let recipe = sample_recipe("Tomato Soup", &["Simmer 20 minutes."]);

        for expected in ["saved", "already saved"] {
            let body: Value = client
                .post(format!("{base}/saved"))
                .json(&recipe)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(body["status"], expected);
        }

        let list: Vec<Recipe> = client
            .get(format!("{base}/saved"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list.len(), 1);

        let body: Value = client
            .delete(format!("{base}/saved/Tomato%20Soup"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "removed");

        let body: Value = client
            .delete(format!("{base}/saved/Tomato%20Soup"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "not saved");
    }
}
