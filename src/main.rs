//! Org Chart Tree - serves a flat team list as a nested org chart.

mod child_index;
mod config;
mod encode;
mod generator;
mod nested_json;
mod record;
mod team_store;
mod tree;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use config::ServerConfig;
use record::{Record, RecordId};
use serde_json::Value;
use team_store::TeamStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "org_chart_tree=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let store = config.open_store()?;
    info!("Org chart ready: {} teams", store.len());

    let app = router(store);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(store: TeamStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/teams", get(list_teams))
        .route("/tree", get(get_tree).put(put_tree))
        .route("/tree.js", get(get_tree_js))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The flat team list.
async fn list_teams(State(store): State<TeamStore>) -> Json<Vec<Record>> {
    Json(store.teams())
}

#[derive(serde::Deserialize)]
struct TreeQuery {
    /// Id of the team to use as root instead of the org chart root.
    root: Option<String>,
}

impl TreeQuery {
    fn root_id(&self) -> Option<RecordId> {
        self.root
            .as_ref()
            .and_then(|root| RecordId::from_value(&Value::String(root.clone())))
    }
}

/// The nested org chart as standard JSON (`null` when empty).
async fn get_tree(
    State(store): State<TeamStore>,
    Query(query): Query<TreeQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], String), (StatusCode, String)> {
    let root = store.nested(query.root_id().as_ref());
    let json = nested_json::encode_nested(root.as_ref()).map_err(|e| {
        error!("JSON encoding failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Cannot encode org chart: {}", e))
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

/// The nested org chart in the legacy script encoding.
async fn get_tree_js(
    State(store): State<TeamStore>,
    Query(query): Query<TreeQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], String), (StatusCode, String)> {
    let js = store.nested_js(query.root_id().as_ref()).map_err(|e| {
        error!("Legacy encoding failed: {}", e);
        (StatusCode::UNPROCESSABLE_ENTITY, format!("Cannot encode org chart: {}", e))
    })?;
    Ok(([(header::CONTENT_TYPE, "application/javascript")], js))
}

#[derive(Debug, serde::Serialize)]
struct UpdateResponse {
    teams: usize,
}

/// Replace the org chart with a nested tree. Malformed input empties the chart.
async fn put_tree(
    State(store): State<TeamStore>,
    body: String,
) -> Result<Json<UpdateResponse>, (StatusCode, String)> {
    let stored = tokio::task::spawn_blocking(move || store.replace_from_json(&body))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|result| result);
    let teams = stored.map_err(|e| {
        error!("Failed to store org chart: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to store org chart: {}", e))
    })?;

    info!("Org chart updated: {} teams", teams);
    Ok(Json(UpdateResponse { teams }))
}
