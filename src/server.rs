//! Prediction API over a loaded `ClassifierArtifact`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::training::ClassifierArtifact;

pub struct AppState {
    pub artifact: ClassifierArtifact,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PredictResponse {
    pub input_text: String,
    /// One of `Negative`, `Neutral`, `Positive`.
    pub sentiment: String,
    /// Maximum class probability, rounded to two decimals.
    pub confidence_score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(home, predict),
    components(schemas(PredictRequest, PredictResponse, StatusResponse)),
    tags((name = "sentiment", description = "Review sentiment classification"))
)]
struct ApiDoc;

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
    tag = "sentiment"
)]
pub async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Sentiment API is running. Interactive documentation is at /docs".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/predict",
    request_body = PredictRequest,
    responses((status = 200, description = "Predicted sentiment", body = PredictResponse)),
    tag = "sentiment"
)]
pub async fn predict(State(state): State<Arc<AppState>>, Json(req): Json<PredictRequest>) -> Json<PredictResponse> {
    let prediction = state.artifact.predict(&req.text);
    Json(PredictResponse {
        sentiment: prediction.sentiment.to_string(),
        confidence_score: (prediction.confidence * 100.0).round() / 100.0,
        input_text: req.text,
    })
}

pub fn router(artifact: ClassifierArtifact) -> Router {
    let state = Arc::new(AppState { artifact });

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(home))
        .route("/predict", post(predict))
        .with_state(state)
}

pub async fn serve(artifact: ClassifierArtifact, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(artifact);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("🌐 Listening on http://{} (docs at /docs)", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
