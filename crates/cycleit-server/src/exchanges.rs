//! Exchange tracker: creation from a conversation and status changes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use cycleit_shared::exchange::{counterparty_for, ExchangeBoard};
use cycleit_shared::protocol::{CreateExchangeRequest, UpdateExchangeStatusRequest};
use cycleit_shared::ExchangeStatus;
use cycleit_store::{Exchange, ExchangeDetail, StoreError};

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;

pub async fn board(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ExchangeBoard>, ServerError> {
    let details = state.db()?.exchange_details_for_user(user.user_id)?;
    Ok(Json(ExchangeBoard::partition(details)))
}

/// Start a pending exchange on a product.
///
/// A non-owner caller becomes the counterparty. The owner must name the
/// other participant.
pub async fn create_exchange(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<ExchangeDetail>), ServerError> {
    let detail = {
        let db = state.db()?;
        let product = db.get_product(req.product_id)?;
        let counterparty = counterparty_for(product.owner_id, user.user_id, req.counterparty_id)?;

        match db.get_profile_summary(counterparty) {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(ServerError::NotFound("counterparty not found".into()))
            }
            Err(e) => return Err(e.into()),
        }

        let exchange = Exchange {
            id: Uuid::new_v4(),
            product_id: product.id,
            owner_id: product.owner_id,
            counterparty_id: counterparty,
            status: ExchangeStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
            completed_at: None,
        };
        db.create_exchange(&exchange)?;
        db.get_exchange_detail(exchange.id)?
    };

    info!(
        id = %detail.exchange.id,
        product = %detail.exchange.product_id,
        by = %user.user_id,
        "exchange started"
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Move an exchange along its lifecycle. Either participant may do so.
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateExchangeStatusRequest>,
) -> Result<Json<ExchangeDetail>, ServerError> {
    let (from, detail) = {
        let db = state.db()?;
        let exchange = db.get_exchange(id)?;
        if !exchange.involves(user.user_id) {
            return Err(ServerError::Forbidden("not a participant of this exchange".into()));
        }

        let next = exchange.status.transition(req.status)?;
        if !db.transition_exchange(id, exchange.status, next, Utc::now())? {
            return Err(ServerError::Conflict(format!(
                "exchange is no longer {}",
                exchange.status
            )));
        }
        (exchange.status, db.get_exchange_detail(id)?)
    };

    info!(id = %id, from = %from, to = %detail.exchange.status, by = %user.user_id, "exchange status changed");
    Ok(Json(detail))
}
