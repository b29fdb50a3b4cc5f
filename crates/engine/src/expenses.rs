//! Expenses.
//!
//! An [`Expense`] records who paid how much for what. What every other user
//! owes for it lives in its [`Split`](crate::Split)s; the expense itself is
//! immutable once recorded.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{MoneyCents, Split};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: MoneyCents,
    pub payer_id: i64,
    pub group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// An expense together with (a selection of) its splits, in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub splits: Vec<Split>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub amount_minor: i64,
    pub payer_id: i64,
    pub group_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::splits::Entity")]
    Splits,
}

impl Related<super::splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            payer_id: model.payer_id,
            group_id: model.group_id,
            created_at: model.created_at,
        }
    }
}

/// Builds the row for a new expense; the id is assigned by the database.
pub(crate) fn new_active_model(
    description: String,
    amount: MoneyCents,
    payer_id: i64,
    group_id: Option<i64>,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        description: ActiveValue::Set(description),
        amount_minor: ActiveValue::Set(amount.cents()),
        payer_id: ActiveValue::Set(payer_id),
        group_id: ActiveValue::Set(group_id),
        created_at: ActiveValue::Set(created_at),
    }
}
