//! Routes for the Overdue Escalation bounded context.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use tourly_escalation::application::registry::EndOutcome;
use tourly_escalation::domain::commands::{self, EndRequester};
use tourly_escalation::domain::timer::MonitorSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /activate.
#[derive(Debug, Deserialize)]
pub struct ActivateOrderRequest {
    /// The order that just became active.
    pub order_id: Uuid,
    /// Guide assigned to the order.
    pub guide_name: String,
    /// When the service is scheduled to end.
    pub scheduled_end_time: DateTime<Utc>,
}

/// Query parameters for POST /{order_id}/end.
#[derive(Debug, Deserialize)]
pub struct EndOrderParams {
    /// Origin of the request; defaults to the user.
    #[serde(default = "default_requester")]
    pub requested_by: EndRequester,
}

fn default_requester() -> EndRequester {
    EndRequester::User
}

/// POST /activate
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn activate_order(
    State(state): State<AppState>,
    Json(request): Json<ActivateOrderRequest>,
) -> Result<Json<MonitorSnapshot>, ApiError> {
    let command = commands::ActivateOrder {
        correlation_id: Uuid::new_v4(),
        order_id: request.order_id,
        guide_name: request.guide_name,
        scheduled_end_time: request.scheduled_end_time,
    };

    info!(correlation_id = %command.correlation_id, "handling activate_order command");

    let snapshot = state.monitors.activate(&command)?;
    Ok(Json(snapshot))
}

/// POST /{order_id}/end
///
/// Idempotent: ending an order that is not monitored reports `not_active`.
#[instrument(skip(state, params), fields(requested_by = ?params.requested_by))]
async fn end_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Query(params): Query<EndOrderParams>,
) -> Json<EndOutcome> {
    let command = commands::EndOrder {
        correlation_id: Uuid::new_v4(),
        order_id,
        requested_by: params.requested_by,
    };

    info!(correlation_id = %command.correlation_id, "handling end_order command");

    Json(state.monitors.end(&command))
}

/// GET /{order_id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<MonitorSnapshot>, ApiError> {
    Ok(Json(state.monitors.snapshot(order_id)?))
}

/// Returns the router for the order monitoring context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activate", post(activate_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/end", post(end_order))
}
