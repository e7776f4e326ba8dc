//! HTTP server for the contract API.
//!
//! Plays the part of the invoking peer: every request becomes one contract
//! invocation, with the caller identity taken from request headers.

use crate::apis::{self, ApiError, InvokeRequest, InvokeResponse};
use axum::{
	extract::{Path, State},
	http::HeaderMap,
	response::Json,
	routing::{get, post},
	Router,
};
use scm_config::ApiConfig;
use scm_core::ScmContract;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// The contract every request is executed against.
	pub contract: Arc<ScmContract>,
}

/// Builds the API router with the /api base path.
pub fn router(contract: Arc<ScmContract>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/invoke", post(handle_invoke))
				.route("/orders", get(handle_list_orders))
				.route("/orders/{id}/history", get(handle_order_history)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { contract })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	contract: Arc<ScmContract>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(contract);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Contract API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/invoke requests.
async fn handle_invoke(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
	let identity = apis::identity_from_headers(&headers);
	apis::invoke::process_invoke_request(request, identity, &state.contract)
		.await
		.map(Json)
}

/// Handles GET /api/orders requests.
async fn handle_list_orders(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	apis::orders::list_orders(&state.contract).await.map(Json)
}

/// Handles GET /api/orders/{id}/history requests.
async fn handle_order_history(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
	apis::orders::order_history(&state.contract, id)
		.await
		.map(Json)
}
