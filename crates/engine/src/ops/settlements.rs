//! Settlement allocator: records payments and pays down the payer's oldest
//! debts to the payee first.

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    BatchEntry, EngineError, MoneyCents, ResultEngine, SettleCmd, Settlement,
    allocation::{OpenSplit, Paydown, allocate},
    expenses, settlements, splits,
};

use super::{Engine, ensure_within_limit, normalize_optional_text};

/// Outcome of one settlement.
///
/// `unapplied` is the part of the payment that found no debt to absorb. It
/// is reported here only: it is not stored, credited or refunded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub settlement: Settlement,
    pub paydowns: Vec<Paydown>,
    pub applied: MoneyCents,
    pub unapplied: MoneyCents,
}

impl Engine {
    /// Records a payment from `cmd.from_user_id` to `cmd.to_user_id` and
    /// pays down the splits the payer owes on expenses the payee paid,
    /// oldest split first.
    ///
    /// The settlement row is written even when there is no debt to absorb
    /// it. Settlement and split updates commit together or not at all. If a
    /// split changed between read and write (another process settled the
    /// same debt), the whole operation fails with `Conflict`.
    pub async fn settle(&self, cmd: SettleCmd) -> ResultEngine<SettlementReceipt> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }
        ensure_within_limit(cmd.amount, "settlement amount")?;
        if cmd.from_user_id == cmd.to_user_id {
            return Err(EngineError::InvalidInput(
                "cannot settle with yourself".to_string(),
            ));
        }

        let _guard = self.pair_locks.lock(cmd.from_user_id, cmd.to_user_id).await;
        self.with_tx(|engine, db_tx| Box::pin(async move { engine.settle_in(db_tx, cmd).await }))
            .await
    }

    /// Settles each entry independently on behalf of `from_user_id`.
    ///
    /// A failing entry does not affect the others; results are returned in
    /// input order.
    pub async fn settle_batch(
        &self,
        from_user_id: i64,
        group_id: Option<i64>,
        entries: Vec<BatchEntry>,
    ) -> Vec<ResultEngine<SettlementReceipt>> {
        let mut results = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let mut cmd = SettleCmd::new(from_user_id, entry.to_user_id, entry.amount);
            cmd.remark = entry.remark;
            cmd.group_id = group_id;

            let result = self.settle(cmd).await;
            if let Err(err) = &result {
                tracing::warn!(index, from_user_id, "batch settlement entry rejected: {err}");
            }
            results.push(result);
        }
        results
    }

    async fn settle_in(
        &self,
        db: &DatabaseTransaction,
        cmd: SettleCmd,
    ) -> ResultEngine<SettlementReceipt> {
        self.require_user(db, cmd.from_user_id).await?;
        self.require_user(db, cmd.to_user_id).await?;
        self.require_optional_group(db, cmd.group_id).await?;

        let settlement = settlements::new_active_model(
            cmd.from_user_id,
            cmd.to_user_id,
            cmd.amount,
            normalize_optional_text(cmd.remark.as_deref()),
            cmd.group_id,
            cmd.settled_at,
        )
        .insert(db)
        .await?;

        let open: Vec<OpenSplit> = splits::Entity::find()
            .inner_join(expenses::Entity)
            .filter(splits::Column::DebtorId.eq(cmd.from_user_id))
            .filter(expenses::Column::PayerId.eq(cmd.to_user_id))
            .filter(splits::Column::AmountOwedMinor.gt(0))
            .order_by_asc(splits::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|split| OpenSplit {
                split_id: split.id,
                expense_id: split.expense_id,
                amount_owed: MoneyCents::new(split.amount_owed_minor),
            })
            .collect();

        let allocation = allocate(cmd.amount, &open);

        for paydown in &allocation.paydowns {
            let updated = splits::Entity::update_many()
                .col_expr(
                    splits::Column::AmountOwedMinor,
                    Expr::value(paydown.after.cents()),
                )
                .filter(splits::Column::Id.eq(paydown.split_id))
                .filter(splits::Column::AmountOwedMinor.eq(paydown.before.cents()))
                .exec(db)
                .await?;
            if updated.rows_affected != 1 {
                return Err(EngineError::Conflict(format!(
                    "split {} changed while settling",
                    paydown.split_id
                )));
            }
            tracing::debug!(
                settlement_id = settlement.id,
                split_id = paydown.split_id,
                paid = paydown.paid().cents(),
                before = paydown.before.cents(),
                after = paydown.after.cents(),
                "split paid down"
            );
        }

        if allocation.unapplied.is_positive() {
            tracing::info!(
                settlement_id = settlement.id,
                unapplied = allocation.unapplied.cents(),
                "settlement exceeds outstanding debt, excess is not carried"
            );
        }
        tracing::info!(
            settlement_id = settlement.id,
            from_user_id = cmd.from_user_id,
            to_user_id = cmd.to_user_id,
            amount = cmd.amount.cents(),
            splits = allocation.paydowns.len(),
            "settlement recorded"
        );

        Ok(SettlementReceipt {
            settlement: Settlement::from(settlement),
            paydowns: allocation.paydowns,
            applied: allocation.applied,
            unapplied: allocation.unapplied,
        })
    }

    /// Settlements the user made or received, newest first.
    pub async fn settlements_for_user(&self, user_id: i64) -> ResultEngine<Vec<Settlement>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine
                    .load_settlements(
                        db_tx,
                        Condition::any()
                            .add(settlements::Column::FromUserId.eq(user_id))
                            .add(settlements::Column::ToUserId.eq(user_id)),
                    )
                    .await
            })
        })
        .await
    }

    /// Settlements between the two users in either direction, newest first.
    pub async fn settlements_between(
        &self,
        user_id: i64,
        counterparty_id: i64,
    ) -> ResultEngine<Vec<Settlement>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine.require_user(db_tx, counterparty_id).await?;
                engine
                    .load_settlements(db_tx, pair_condition(user_id, counterparty_id))
                    .await
            })
        })
        .await
    }

    /// Settlements tagged with the group, newest first.
    pub async fn group_settlements(&self, group_id: i64) -> ResultEngine<Vec<Settlement>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;
                engine
                    .load_settlements(
                        db_tx,
                        Condition::all().add(settlements::Column::GroupId.eq(group_id)),
                    )
                    .await
            })
        })
        .await
    }

    async fn load_settlements(
        &self,
        db: &DatabaseTransaction,
        condition: Condition,
    ) -> ResultEngine<Vec<Settlement>> {
        Ok(settlements::Entity::find()
            .filter(condition)
            .order_by_desc(settlements::Column::SettledAt)
            .order_by_desc(settlements::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(Settlement::from)
            .collect())
    }
}

/// Settlements in either direction between `a` and `b`.
pub(super) fn pair_condition(a: i64, b: i64) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(settlements::Column::FromUserId.eq(a))
                .add(settlements::Column::ToUserId.eq(b)),
        )
        .add(
            Condition::all()
                .add(settlements::Column::FromUserId.eq(b))
                .add(settlements::Column::ToUserId.eq(a)),
        )
}
