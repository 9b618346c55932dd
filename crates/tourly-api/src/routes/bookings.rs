//! Routes for the Booking & Pricing bounded context.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tourly_booking::application::{command_handlers, query_handlers};
use tourly_booking::domain::commands;
use tourly_booking::domain::pricing::{self, BookingQuote};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /quote.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Number of days to book.
    pub days: u32,
    /// Daily start hour.
    pub start_hour: u32,
    /// Daily end hour.
    pub end_hour: u32,
}

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Number of days to book.
    pub days: u32,
    /// Daily start hour.
    pub start_hour: u32,
    /// Daily end hour.
    pub end_hour: u32,
    /// Where the guide meets the customer.
    pub meeting_point: String,
}

/// Response body returned after a booking is created.
#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    /// The new booking's ID.
    pub booking_id: Uuid,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

/// POST /quote
///
/// Live price preview. Never fails: out-of-range windows are clamped.
#[instrument(skip(request), fields(days = request.days, start_hour = request.start_hour, end_hour = request.end_hour))]
async fn quote(Json(request): Json<QuoteRequest>) -> Json<BookingQuote> {
    Json(pricing::compute_price(
        request.days,
        request.start_hour,
        request.end_hour,
    ))
}

/// POST /
#[instrument(skip(state, request), fields(days = request.days))]
async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<BookingCreatedResponse>, ApiError> {
    let command = commands::QuoteBooking {
        correlation_id: Uuid::new_v4(),
        days: request.days,
        start_hour: request.start_hour,
        end_hour: request.end_hour,
        meeting_point: request.meeting_point,
    };

    info!(correlation_id = %command.correlation_id, "handling quote_booking command");

    let result = command_handlers::handle_quote_booking(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(BookingCreatedResponse {
        booking_id: result.aggregate_id,
        event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
    }))
}

/// POST /{booking_id}/confirm
#[instrument(skip(state))]
async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::ConfirmBooking {
        correlation_id: Uuid::new_v4(),
        booking_id,
    };

    info!(correlation_id = %command.correlation_id, "handling confirm_booking command");

    let result = command_handlers::handle_confirm_booking(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    let event_ids = result.stored_events.iter().map(|e| e.event_id).collect();

    Ok(Json(CommandResponse { event_ids }))
}

/// GET /{booking_id}
async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<query_handlers::BookingView>, ApiError> {
    let view = query_handlers::get_booking_by_id(booking_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the booking context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/quote", post(quote))
        .route("/{booking_id}", get(get_booking))
        .route("/{booking_id}/confirm", post(confirm_booking))
}
