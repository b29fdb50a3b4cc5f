//! Settlement API endpoints

use api_types::settlement::{SettleUp, SettlementCreated, SettlementListResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{MoneyCents, SettleCmd};

use crate::{ServerError, server::ServerState, user, views};

/// Records a payment from the session user and pays down what they owe
pub async fn settle_up(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettleUp>,
) -> Result<(StatusCode, Json<SettlementCreated>), ServerError> {
    let mut cmd = SettleCmd::new(
        user.id,
        payload.to_user_id,
        MoneyCents::new(payload.amount_minor),
    );
    cmd.remark = payload.remark;
    cmd.group_id = payload.group_id;

    let receipt = state.engine.settle(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(SettlementCreated {
            id: receipt.settlement.id,
            applied_minor: receipt.applied.cents(),
            unapplied_minor: receipt.unapplied.cents(),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SettlementListResponse>, ServerError> {
    let settlements = state.engine.settlements_for_user(user.id).await?;
    Ok(Json(SettlementListResponse {
        settlements: settlements.into_iter().map(views::settlement).collect(),
    }))
}

pub async fn with_friend(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(friend_id): Path<i64>,
) -> Result<Json<SettlementListResponse>, ServerError> {
    let settlements = state
        .engine
        .settlements_between(user.id, friend_id)
        .await?;
    Ok(Json(SettlementListResponse {
        settlements: settlements.into_iter().map(views::settlement).collect(),
    }))
}
