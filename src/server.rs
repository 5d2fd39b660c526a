use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

use crate::tools::{ToolRegistry, ToolSpecification, generic_invocation_spec};

pub struct ServerState {
    pub registry: ToolRegistry,
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub tool: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_specification: Option<Value>,
}

impl InvokeResponse {
    fn failure(tool: &str, error: String) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            data: None,
            error: Some(error),
            invocation_specification: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    success: bool,
    message: String,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/invoke", post(invoke_tool))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn list_tools(State(state): State<Arc<ServerState>>) -> Json<Vec<ToolSpecification>> {
    Json(state.registry.specifications())
}

/// Runs one invocation: lookup, validate, describe, execute. Terminal at
/// the first failing step; every failure becomes the uniform envelope.
async fn invoke_tool(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<InvokeRequest>,
) -> (StatusCode, Json<InvokeResponse>) {
    if let Some(context) = &request.context {
        debug!("Invocation context for \"{}\": {context}", request.tool);
    }

    let Some(entry) = state.registry.find(&request.tool) else {
        return (
            StatusCode::NOT_FOUND,
            Json(InvokeResponse::failure(
                &request.tool,
                format!("Tool \"{}\" not found.", request.tool),
            )),
        );
    };

    let validated = match (entry.validate)(&request.parameters) {
        Ok(params) => params,
        Err(problems) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(InvokeResponse::failure(
                    &request.tool,
                    format!(
                        "Invalid parameters for tool \"{}\": {}",
                        request.tool,
                        problems.join(", ")
                    ),
                )),
            );
        }
    };

    let invocation_spec = match &entry.invocation_spec {
        Some(build) => build(&validated),
        None => generic_invocation_spec(entry.name, &validated),
    };

    match (entry.handler)(validated).await {
        Ok(data) => (
            StatusCode::OK,
            Json(InvokeResponse {
                tool: request.tool,
                success: true,
                data: Some(data),
                error: None,
                invocation_specification: Some(invocation_spec),
            }),
        ),
        Err(e) => {
            error!("Error executing tool \"{}\": {e:#}", request.tool);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(InvokeResponse::failure(
                    &request.tool,
                    format!("Internal server error: {e}"),
                )),
            )
        }
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "Service is healthy".to_string(),
    })
}
