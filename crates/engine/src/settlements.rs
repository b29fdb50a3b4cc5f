//! Settlements: recorded payments from one user to another.
//!
//! A settlement is a historical record. It is inserted once by the
//! allocator and never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub amount: MoneyCents,
    pub remark: Option<String>,
    pub group_id: Option<i64>,
    pub settled_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub amount_minor: i64,
    pub remark: Option<String>,
    pub group_id: Option<i64>,
    pub settled_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Settlement {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount: MoneyCents::new(model.amount_minor),
            remark: model.remark,
            group_id: model.group_id,
            settled_at: model.settled_at,
        }
    }
}

pub(crate) fn new_active_model(
    from_user_id: i64,
    to_user_id: i64,
    amount: MoneyCents,
    remark: Option<String>,
    group_id: Option<i64>,
    settled_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        from_user_id: ActiveValue::Set(from_user_id),
        to_user_id: ActiveValue::Set(to_user_id),
        amount_minor: ActiveValue::Set(amount.cents()),
        remark: ActiveValue::Set(remark),
        group_id: ActiveValue::Set(group_id),
        settled_at: ActiveValue::Set(settled_at),
    }
}
