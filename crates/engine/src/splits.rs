//! Splits: a single debtor's owed portion of one expense.
//!
//! `amount` is what the debtor originally owed and never changes.
//! `amount_owed` is what is still outstanding: only the settlement allocator
//! touches it, and only downwards.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: i64,
    pub expense_id: i64,
    pub debtor_id: i64,
    pub amount: MoneyCents,
    pub amount_owed: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "splits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub expense_id: i64,
    pub debtor_id: i64,
    pub amount_minor: i64,
    pub amount_owed_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Split {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            expense_id: model.expense_id,
            debtor_id: model.debtor_id,
            amount: MoneyCents::new(model.amount_minor),
            amount_owed: MoneyCents::new(model.amount_owed_minor),
        }
    }
}

/// Builds the row for a new split: nothing has been paid down yet.
pub(crate) fn new_active_model(expense_id: i64, debtor_id: i64, amount: MoneyCents) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        expense_id: ActiveValue::Set(expense_id),
        debtor_id: ActiveValue::Set(debtor_id),
        amount_minor: ActiveValue::Set(amount.cents()),
        amount_owed_minor: ActiveValue::Set(amount.cents()),
    }
}
