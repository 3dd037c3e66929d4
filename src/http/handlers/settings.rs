use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::domain::donation::err;
use crate::gateways::GatewayKind;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwitchGatewayRequest {
    pub gateway: String,
}

/// GET /admin/settings/gateway
pub async fn get_gateway(State(state): State<AppState>) -> impl IntoResponse {
    match state.settings_cache.current_gateway().await {
        Ok(kind) => (
            StatusCode::OK,
            Json(json!({
                "gateway": kind.as_str(),
                "available": state.registry.available(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to read gateway setting: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "failed to read gateway setting")),
            )
                .into_response()
        }
    }
}

/// PUT /admin/settings/gateway — switches the default for *future* checkouts;
/// donations already pinned keep their gateway.
pub async fn put_gateway(
    State(state): State<AppState>,
    Json(req): Json<SwitchGatewayRequest>,
) -> impl IntoResponse {
    let Some(kind) = GatewayKind::parse(&req.gateway) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(err("UNKNOWN_GATEWAY", &format!("unknown gateway: {}", req.gateway))),
        )
            .into_response();
    };

    match state.settings_cache.set_current_gateway(kind).await {
        Ok(()) => {
            tracing::info!(gateway = kind.as_str(), "default payment gateway switched");
            (StatusCode::OK, Json(json!({ "success": true, "gateway": kind.as_str() }))).into_response()
        }
        Err(e) => {
            tracing::error!("failed to switch gateway: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "failed to switch gateway")),
            )
                .into_response()
        }
    }
}
