//! Group API endpoints
//!
//! Every route here is restricted to members of the group.

use api_types::{
    expense::ExpenseListResponse,
    group::{GroupBalancesResponse, MemberBalanceView, MembersResponse},
    settlement::{EntryError, GroupSettleUp, GroupSettleUpResponse, SettlementListResponse},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{BatchEntry, MoneyCents, UserInfo};

use crate::{ServerError, message_for_engine_error, server::ServerState, user, views};

/// Returns the group's members, or `Forbidden` if `user_id` is not one.
async fn require_member(
    state: &ServerState,
    group_id: i64,
    user_id: i64,
) -> Result<Vec<UserInfo>, ServerError> {
    let members = state.engine.group_members(group_id).await?;
    if !members.iter().any(|member| member.id == user_id) {
        return Err(ServerError::forbidden(format!(
            "not a member of group {group_id}"
        )));
    }
    Ok(members)
}

pub async fn expenses(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    require_member(&state, group_id, user.id).await?;
    let expenses = state.engine.group_expenses(group_id).await?;
    Ok(Json(ExpenseListResponse {
        expenses: expenses.into_iter().map(views::expense).collect(),
    }))
}

pub async fn settlements(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<SettlementListResponse>, ServerError> {
    require_member(&state, group_id, user.id).await?;
    let settlements = state.engine.group_settlements(group_id).await?;
    Ok(Json(SettlementListResponse {
        settlements: settlements.into_iter().map(views::settlement).collect(),
    }))
}

pub async fn balances(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<GroupBalancesResponse>, ServerError> {
    require_member(&state, group_id, user.id).await?;
    let balances = state.engine.group_balances(group_id).await?;
    Ok(Json(GroupBalancesResponse {
        balances: balances
            .into_iter()
            .map(|member| MemberBalanceView {
                user_id: member.user_id,
                username: member.username,
                balance: views::balance(member.balance),
            })
            .collect(),
    }))
}

pub async fn members(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
) -> Result<Json<MembersResponse>, ServerError> {
    let members = require_member(&state, group_id, user.id).await?;
    Ok(Json(MembersResponse {
        members: members.into_iter().map(views::user).collect(),
    }))
}

/// Settles several debts at once on behalf of the session user.
///
/// Entries are independent: rejected ones are reported by index and do not
/// stop the rest.
pub async fn settle_up(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<i64>,
    Json(payload): Json<GroupSettleUp>,
) -> Result<(StatusCode, Json<GroupSettleUpResponse>), ServerError> {
    require_member(&state, group_id, user.id).await?;
    if payload.settlements.is_empty() {
        return Err(ServerError::Generic("no settlements given".to_string()));
    }

    let entries = payload
        .settlements
        .into_iter()
        .map(|entry| BatchEntry {
            to_user_id: entry.to_user_id,
            amount: MoneyCents::new(entry.amount_minor),
            remark: entry.remark,
        })
        .collect();

    let mut response = GroupSettleUpResponse {
        settlements: Vec::new(),
        errors: Vec::new(),
    };
    for (index, result) in state
        .engine
        .settle_batch(user.id, Some(group_id), entries)
        .await
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(receipt) => response.settlements.push(receipt.settlement.id),
            Err(err) => response.errors.push(EntryError {
                index,
                error: message_for_engine_error(err),
            }),
        }
    }

    Ok((StatusCode::CREATED, Json(response)))
}
