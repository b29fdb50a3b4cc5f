//! Balance aggregator.
//!
//! Balances are derived on demand from the original split amounts and the
//! settlement history (see [`Ledger`]). Nothing here writes: every query
//! reads splits and settlements inside one transaction so it sees a single
//! consistent snapshot.

use sea_orm::{Condition, DatabaseTransaction, QueryFilter, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Balance, Ledger, MoneyCents, ResultEngine, expenses, settlements, splits,
};

use super::{Engine, settlements::pair_condition};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub user_id: i64,
    pub username: String,
    pub balance: Balance,
}

/// Signed net against one counterparty (positive: they owe the user).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyBalance {
    pub user_id: i64,
    pub username: String,
    pub net: MoneyCents,
}

impl Engine {
    /// What others owe the user and what the user owes others, over every
    /// expense and settlement the user is part of.
    pub async fn overall_balance(&self, user_id: i64) -> ResultEngine<Balance> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                let ledger = engine.user_ledger(db_tx, user_id).await?;
                Ok(ledger.balance_of(user_id))
            })
        })
        .await
    }

    /// Balance of the user restricted to one counterparty.
    pub async fn balance_between(
        &self,
        user_id: i64,
        counterparty_id: i64,
    ) -> ResultEngine<Balance> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine.require_user(db_tx, counterparty_id).await?;

                let debts = Condition::any()
                    .add(
                        Condition::all()
                            .add(expenses::Column::PayerId.eq(user_id))
                            .add(splits::Column::DebtorId.eq(counterparty_id)),
                    )
                    .add(
                        Condition::all()
                            .add(expenses::Column::PayerId.eq(counterparty_id))
                            .add(splits::Column::DebtorId.eq(user_id)),
                    );
                let ledger = engine
                    .ledger(db_tx, debts, pair_condition(user_id, counterparty_id))
                    .await?;
                Ok(ledger.balance_between(user_id, counterparty_id))
            })
        })
        .await
    }

    /// Per-member balances restricted to the group's expenses and
    /// settlements, ordered by user id.
    ///
    /// Users who appear in the group's ledger without being members are
    /// listed too.
    pub async fn group_balances(&self, group_id: i64) -> ResultEngine<Vec<MemberBalance>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;

                let ledger = engine
                    .ledger(
                        db_tx,
                        Condition::all().add(expenses::Column::GroupId.eq(group_id)),
                        Condition::all().add(settlements::Column::GroupId.eq(group_id)),
                    )
                    .await?;

                let mut user_ids = ledger.users();
                user_ids.extend(engine.member_ids(db_tx, group_id).await?);
                let names = engine.usernames(db_tx, user_ids.iter().copied()).await?;

                Ok(user_ids
                    .into_iter()
                    .map(|user_id| MemberBalance {
                        user_id,
                        username: names.get(&user_id).cloned().unwrap_or_default(),
                        balance: ledger.balance_of(user_id),
                    })
                    .collect())
            })
        })
        .await
    }

    /// Non-zero nets of the user against each counterparty, ordered by id.
    pub async fn balances_by_counterparty(
        &self,
        user_id: i64,
    ) -> ResultEngine<Vec<CounterpartyBalance>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                let ledger = engine.user_ledger(db_tx, user_id).await?;
                let nets = ledger.counterparties(user_id);
                let names = engine
                    .usernames(db_tx, nets.iter().map(|(id, _)| *id))
                    .await?;

                Ok(nets
                    .into_iter()
                    .map(|(id, net)| CounterpartyBalance {
                        user_id: id,
                        username: names.get(&id).cloned().unwrap_or_default(),
                        net,
                    })
                    .collect())
            })
        })
        .await
    }

    /// Ledger of every debt and payment edge touching `user_id`.
    async fn user_ledger(&self, db: &DatabaseTransaction, user_id: i64) -> ResultEngine<Ledger> {
        let debts = Condition::any()
            .add(expenses::Column::PayerId.eq(user_id))
            .add(splits::Column::DebtorId.eq(user_id));
        let payments = Condition::any()
            .add(settlements::Column::FromUserId.eq(user_id))
            .add(settlements::Column::ToUserId.eq(user_id));
        self.ledger(db, debts, payments).await
    }

    /// Builds a ledger from the splits (joined with their expense) and the
    /// settlements matching the given conditions.
    ///
    /// Splits contribute their original amount: paid-down debt is accounted
    /// for by the settlement that paid it, not twice.
    async fn ledger(
        &self,
        db: &DatabaseTransaction,
        debts: Condition,
        payments: Condition,
    ) -> ResultEngine<Ledger> {
        let mut ledger = Ledger::new();

        let rows = splits::Entity::find()
            .find_also_related(expenses::Entity)
            .filter(debts)
            .all(db)
            .await?;
        for (split, expense) in rows {
            if let Some(expense) = expense {
                ledger.record_debt(
                    expense.payer_id,
                    split.debtor_id,
                    MoneyCents::new(split.amount_minor),
                );
            }
        }

        for settlement in settlements::Entity::find().filter(payments).all(db).await? {
            ledger.record_payment(
                settlement.from_user_id,
                settlement.to_user_id,
                MoneyCents::new(settlement.amount_minor),
            );
        }

        Ok(ledger)
    }
}
