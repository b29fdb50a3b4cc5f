//! Expense API endpoints

use api_types::expense::{
    ExpenseCreated, ExpenseListResponse, ExpenseNew, ExpenseView, OwedExpensesResponse,
    RelatedExpensesResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ExpenseCmd, MoneyCents, SplitInput};

use crate::{ServerError, server::ServerState, user, views};

/// Records an expense paid by the session user
pub async fn expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    if let Some(group_id) = payload.group_id
        && !state.engine.is_group_member(group_id, user.id).await?
    {
        return Err(ServerError::forbidden(format!(
            "not a member of group {group_id}"
        )));
    }

    let splits = payload
        .splits
        .into_iter()
        .map(|split| {
            SplitInput::new(
                split.username.as_str(),
                MoneyCents::new(split.amount_owed_minor),
            )
        })
        .collect();
    let mut cmd = ExpenseCmd::new(
        user.id,
        payload.description,
        MoneyCents::new(payload.amount_minor),
    )
    .splits(splits);
    cmd.group_id = payload.group_id;

    let expense = state.engine.record_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(ExpenseCreated { id: expense.id })))
}

/// Expenses the session user paid and splits they owe
pub async fn related(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<RelatedExpensesResponse>, ServerError> {
    let related = state.engine.related_expenses(user.id).await?;
    Ok(Json(RelatedExpensesResponse {
        paid: related.paid.into_iter().map(views::expense_header).collect(),
        owed: related.owed.into_iter().map(views::owed_expense).collect(),
    }))
}

/// One expense, visible to its payer and debtors
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseView>, ServerError> {
    let detail = state.engine.expense(id).await?;
    let involved = detail.expense.payer_id == user.id
        || detail.splits.iter().any(|split| split.debtor_id == user.id);
    if !involved {
        return Err(ServerError::forbidden(format!("not involved in expense {id}")));
    }
    Ok(Json(views::expense(detail)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Expenses shared between the session user and `friend_id`
pub async fn with_friend(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(friend_id): Path<i64>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let expenses = state.engine.expenses_between(user.id, friend_id).await?;
    Ok(Json(ExpenseListResponse {
        expenses: expenses.into_iter().map(views::expense).collect(),
    }))
}

/// Splits owed by `user_id`; only the user themself or a friend may look
pub async fn owed(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
) -> Result<Json<OwedExpensesResponse>, ServerError> {
    if user_id != user.id && !state.engine.is_friend(user.id, user_id).await? {
        return Err(ServerError::forbidden(format!(
            "user {user_id} is not a friend"
        )));
    }
    let owed = state.engine.owed_expenses(user_id).await?;
    Ok(Json(OwedExpensesResponse {
        expenses: owed.into_iter().map(views::owed_expense).collect(),
    }))
}
