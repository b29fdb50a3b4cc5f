//! Balance API endpoints

use api_types::balance::{BalanceView, CounterpartiesResponse, CounterpartyView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{ServerError, server::ServerState, user, views};

pub async fn overall(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state.engine.overall_balance(user.id).await?;
    Ok(Json(views::balance(balance)))
}

pub async fn with_friend(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(friend_id): Path<i64>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state.engine.balance_between(user.id, friend_id).await?;
    Ok(Json(views::balance(balance)))
}

/// Signed net against everyone the session user has an open balance with
pub async fn counterparties(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CounterpartiesResponse>, ServerError> {
    let nets = state.engine.balances_by_counterparty(user.id).await?;
    Ok(Json(CounterpartiesResponse {
        counterparties: nets
            .into_iter()
            .map(|c| CounterpartyView {
                user_id: c.user_id,
                username: c.username,
                net_minor: c.net.cents(),
            })
            .collect(),
    }))
}
