use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::domain::donation::{err, validate_request, CreateDonationRequest, CreatedBy};
use crate::lifecycle::transitions::{advance, LifecycleEvent, Transition};
use crate::AppState;

/// POST /donations
pub async fn create_donation(
    State(state): State<AppState>,
    Json(req): Json<CreateDonationRequest>,
) -> impl IntoResponse {
    let errors = validate_request(&req);
    if !errors.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "errors": errors })),
        )
            .into_response();
    }

    match state.donations_repo.insert(&req, CreatedBy::Frontend).await {
        Ok(donation) => {
            tracing::info!(donation_id = donation.id, amount = donation.amount, "donation created");
            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "donation_id": donation.id,
                    "checkout_url": format!("/payments/{}/checkout", donation.id),
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("failed to create donation: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "failed to create donation")),
            )
                .into_response()
        }
    }
}

/// GET /donations/:id
pub async fn get_donation(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.donations_repo.find(id).await {
        Ok(Some(donation)) => (StatusCode::OK, Json(json!({ "donation": donation }))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(err("NOT_FOUND", "donation not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to load donation: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "failed to load donation")),
            )
                .into_response()
        }
    }
}

/// POST /admin/donations/:id/mark_paid — office override for payments that
/// arrived out of band (bank transfer slips, cash).
pub async fn mark_paid(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    apply_admin_event(state, id, LifecycleEvent::ManualMarkPaid).await
}

/// POST /admin/donations/:id/cancel
pub async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    apply_admin_event(state, id, LifecycleEvent::Cancel).await
}

async fn apply_admin_event(
    state: AppState,
    id: i64,
    event: LifecycleEvent,
) -> axum::response::Response {
    let donation = match state.donations_repo.find(id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(err("NOT_FOUND", "donation not found")),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("failed to load donation: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "failed to load donation")),
            )
                .into_response();
        }
    };

    match advance(donation.status, event) {
        Transition::Apply(_) => {}
        Transition::Noop => {
            return (StatusCode::OK, Json(json!({ "success": true, "updated": false }))).into_response()
        }
        Transition::Rejected(reason) => {
            return (StatusCode::CONFLICT, Json(err("INVALID_TRANSITION", reason))).into_response()
        }
    }

    let updated = match event {
        LifecycleEvent::ManualMarkPaid => state.donations_repo.manual_mark_paid(id).await,
        LifecycleEvent::Cancel => state.donations_repo.cancel(id).await,
        _ => unreachable!("admin endpoints only emit manual events"),
    };

    match updated {
        Ok(updated) => {
            tracing::info!(donation_id = id, ?event, updated, "admin lifecycle event");
            (StatusCode::OK, Json(json!({ "success": true, "updated": updated }))).into_response()
        }
        Err(e) => {
            tracing::error!("admin lifecycle event failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(err("INTERNAL", "update failed")),
            )
                .into_response()
        }
    }
}
