//! Ledger store: recording expenses with their splits, and the read queries
//! over them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use sea_orm::{Condition, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Expense, ExpenseCmd, ExpenseDetail, MoneyCents, ResultEngine, Split, expenses,
    groups, splits,
};

use super::{Engine, ensure_within_limit, normalize_required_text};

/// A split owed by the querying user, flattened with its expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwedExpense {
    pub split_id: i64,
    pub expense_id: i64,
    pub description: String,
    pub total_amount: MoneyCents,
    pub paid_by: String,
    pub group: Option<String>,
    pub amount_owed: MoneyCents,
}

/// Everything a user is involved in, split by role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedExpenses {
    pub paid: Vec<Expense>,
    pub owed: Vec<OwedExpense>,
}

impl Engine {
    /// Records an expense and its splits as one unit of work.
    ///
    /// Fails with:
    /// - `InvalidAmount` if the amount is not positive, a split is negative,
    ///   any amount exceeds [`MoneyCents::MAX`] (or, with strict split totals,
    ///   if splits exceed the amount);
    /// - `InvalidInput` if the description is blank, the payer is listed as a
    ///   debtor, or a debtor appears twice;
    /// - `KeyNotFound` if the payer, a debtor or the group does not exist.
    ///
    /// Splits are stored in input order.
    pub async fn record_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Expense> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }
        ensure_within_limit(cmd.amount, "expense amount")?;
        let description = normalize_required_text(&cmd.description, "description")?;
        if let Some(split) = cmd.splits.iter().find(|s| s.amount_owed.is_negative()) {
            return Err(EngineError::InvalidAmount(format!(
                "split amount must be >= 0, got {}",
                split.amount_owed
            )));
        }
        for split in &cmd.splits {
            ensure_within_limit(split.amount_owed, "split amount")?;
        }
        if self.strict_split_totals {
            let total = MoneyCents::checked_sum(cmd.splits.iter().map(|s| s.amount_owed))
                .ok_or_else(|| {
                    EngineError::InvalidAmount("splits total overflows".to_string())
                })?;
            if total > cmd.amount {
                return Err(EngineError::InvalidAmount(format!(
                    "splits total {total} exceeds expense amount {}",
                    cmd.amount
                )));
            }
        }

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, cmd.payer_id).await?;
                engine.require_optional_group(db_tx, cmd.group_id).await?;

                let mut debtors = Vec::with_capacity(cmd.splits.len());
                let mut seen = HashSet::with_capacity(cmd.splits.len());
                for split in &cmd.splits {
                    let debtor = engine.resolve_user(db_tx, &split.debtor).await?;
                    if debtor.id == cmd.payer_id {
                        return Err(EngineError::InvalidInput(
                            "the payer cannot owe themself".to_string(),
                        ));
                    }
                    if !seen.insert(debtor.id) {
                        return Err(EngineError::InvalidInput(format!(
                            "debtor '{}' listed more than once",
                            debtor.username
                        )));
                    }
                    debtors.push((debtor.id, split.amount_owed));
                }

                let expense = expenses::new_active_model(
                    description,
                    cmd.amount,
                    cmd.payer_id,
                    cmd.group_id,
                    cmd.created_at,
                )
                .insert(db_tx)
                .await?;

                for (debtor_id, amount_owed) in debtors {
                    splits::new_active_model(expense.id, debtor_id, amount_owed)
                        .insert(db_tx)
                        .await?;
                }

                tracing::info!(
                    expense_id = expense.id,
                    payer_id = expense.payer_id,
                    amount = expense.amount_minor,
                    splits = cmd.splits.len(),
                    "expense recorded"
                );
                Ok(Expense::from(expense))
            })
        })
        .await
    }

    /// Deletes an expense together with its splits. Only the payer may do
    /// this; settlements already recorded are left untouched.
    pub async fn delete_expense(&self, expense_id: i64, actor_id: i64) -> ResultEngine<()> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let expense = engine.require_expense(db_tx, expense_id).await?;
                if expense.payer_id != actor_id {
                    return Err(EngineError::Forbidden(format!(
                        "only the payer can delete expense {expense_id}"
                    )));
                }

                splits::Entity::delete_many()
                    .filter(splits::Column::ExpenseId.eq(expense_id))
                    .exec(db_tx)
                    .await?;
                expenses::Entity::delete_by_id(expense_id)
                    .exec(db_tx)
                    .await?;

                tracing::info!(expense_id, "expense deleted");
                Ok(())
            })
        })
        .await
    }

    /// Returns one expense with all its splits in creation order.
    pub async fn expense(&self, expense_id: i64) -> ResultEngine<ExpenseDetail> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let expense = engine.require_expense(db_tx, expense_id).await?;
                let mut details = engine.load_details(db_tx, vec![expense], None).await?;
                details
                    .pop()
                    .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense_id}")))
            })
        })
        .await
    }

    /// Splits the user owes, oldest first, with their expense context.
    pub async fn owed_expenses(&self, user_id: i64) -> ResultEngine<Vec<OwedExpense>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine.load_owed(db_tx, user_id).await
            })
        })
        .await
    }

    /// Expenses the user paid (newest first) and splits the user owes.
    pub async fn related_expenses(&self, user_id: i64) -> ResultEngine<RelatedExpenses> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                let paid = expenses::Entity::find()
                    .filter(expenses::Column::PayerId.eq(user_id))
                    .order_by_desc(expenses::Column::CreatedAt)
                    .order_by_desc(expenses::Column::Id)
                    .all(db_tx)
                    .await?
                    .into_iter()
                    .map(Expense::from)
                    .collect();
                let owed = engine.load_owed(db_tx, user_id).await?;
                Ok(RelatedExpenses { paid, owed })
            })
        })
        .await
    }

    /// Expenses tagged with the group, newest first, with all their splits.
    pub async fn group_expenses(&self, group_id: i64) -> ResultEngine<Vec<ExpenseDetail>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_group(db_tx, group_id).await?;
                let rows = expenses::Entity::find()
                    .filter(expenses::Column::GroupId.eq(group_id))
                    .order_by_desc(expenses::Column::CreatedAt)
                    .order_by_desc(expenses::Column::Id)
                    .all(db_tx)
                    .await?;
                engine.load_details(db_tx, rows, None).await
            })
        })
        .await
    }

    /// Expenses where one of the two users paid and the other owes a split,
    /// newest first. Only the two users' splits are included.
    pub async fn expenses_between(
        &self,
        user_id: i64,
        counterparty_id: i64,
    ) -> ResultEngine<Vec<ExpenseDetail>> {
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine.require_user(db_tx, counterparty_id).await?;

                let expense_ids: BTreeSet<i64> = splits::Entity::find()
                    .inner_join(expenses::Entity)
                    .filter(
                        Condition::any()
                            .add(
                                Condition::all()
                                    .add(expenses::Column::PayerId.eq(user_id))
                                    .add(splits::Column::DebtorId.eq(counterparty_id)),
                            )
                            .add(
                                Condition::all()
                                    .add(expenses::Column::PayerId.eq(counterparty_id))
                                    .add(splits::Column::DebtorId.eq(user_id)),
                            ),
                    )
                    .all(db_tx)
                    .await?
                    .into_iter()
                    .map(|s| s.expense_id)
                    .collect();
                if expense_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let rows = expenses::Entity::find()
                    .filter(expenses::Column::Id.is_in(expense_ids))
                    .order_by_desc(expenses::Column::CreatedAt)
                    .order_by_desc(expenses::Column::Id)
                    .all(db_tx)
                    .await?;
                engine
                    .load_details(db_tx, rows, Some([user_id, counterparty_id]))
                    .await
            })
        })
        .await
    }

    pub(super) async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: i64,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(expense_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense_id}")))
    }

    /// Attaches splits to expenses, keeping the expenses' order.
    async fn load_details(
        &self,
        db: &DatabaseTransaction,
        rows: Vec<expenses::Model>,
        debtors: Option<[i64; 2]>,
    ) -> ResultEngine<Vec<ExpenseDetail>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|e| e.id).collect();

        let mut query = splits::Entity::find().filter(splits::Column::ExpenseId.is_in(ids));
        if let Some(debtors) = debtors {
            query = query.filter(splits::Column::DebtorId.is_in(debtors));
        }
        let mut by_expense: BTreeMap<i64, Vec<Split>> = BTreeMap::new();
        for split in query.order_by_asc(splits::Column::Id).all(db).await? {
            by_expense
                .entry(split.expense_id)
                .or_default()
                .push(Split::from(split));
        }

        Ok(rows
            .into_iter()
            .map(|row| ExpenseDetail {
                splits: by_expense.remove(&row.id).unwrap_or_default(),
                expense: Expense::from(row),
            })
            .collect())
    }

    async fn load_owed(
        &self,
        db: &DatabaseTransaction,
        user_id: i64,
    ) -> ResultEngine<Vec<OwedExpense>> {
        let rows = splits::Entity::find()
            .filter(splits::Column::DebtorId.eq(user_id))
            .order_by_asc(splits::Column::Id)
            .find_also_related(expenses::Entity)
            .all(db)
            .await?;

        let pairs: Vec<(splits::Model, expenses::Model)> = rows
            .into_iter()
            .filter_map(|(split, expense)| expense.map(|e| (split, e)))
            .collect();

        let payer_names = self
            .usernames(db, pairs.iter().map(|(_, e)| e.payer_id))
            .await?;
        let group_ids: Vec<i64> = pairs.iter().filter_map(|(_, e)| e.group_id).collect();
        let group_names: HashMap<i64, String> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            groups::Entity::find()
                .filter(groups::Column::Id.is_in(group_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|g| (g.id, g.name))
                .collect()
        };

        Ok(pairs
            .into_iter()
            .map(|(split, expense)| OwedExpense {
                split_id: split.id,
                expense_id: expense.id,
                description: expense.description,
                total_amount: MoneyCents::new(expense.amount_minor),
                paid_by: payer_names
                    .get(&expense.payer_id)
                    .cloned()
                    .unwrap_or_default(),
                group: expense.group_id.and_then(|id| group_names.get(&id).cloned()),
                amount_owed: MoneyCents::new(split.amount_owed_minor),
            })
            .collect())
    }
}
