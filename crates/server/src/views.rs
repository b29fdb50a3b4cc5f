//! Conversions from engine values to wire types.

use api_types::{
    balance::BalanceView,
    expense::{ExpenseView, OwedExpenseView, SplitView},
    settlement::SettlementView,
    user::UserView,
};
use engine::{Balance, Expense, ExpenseDetail, OwedExpense, Settlement, UserInfo};

/// Expense without its splits.
pub(crate) fn expense_header(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        description: expense.description,
        amount_minor: expense.amount.cents(),
        payer_id: expense.payer_id,
        group_id: expense.group_id,
        created_at: expense.created_at,
        splits: Vec::new(),
    }
}

pub(crate) fn expense(detail: ExpenseDetail) -> ExpenseView {
    let ExpenseDetail { expense, splits } = detail;
    ExpenseView {
        splits: splits
            .into_iter()
            .map(|split| SplitView {
                id: split.id,
                debtor_id: split.debtor_id,
                amount_minor: split.amount.cents(),
                amount_owed_minor: split.amount_owed.cents(),
            })
            .collect(),
        ..expense_header(expense)
    }
}

pub(crate) fn owed_expense(owed: OwedExpense) -> OwedExpenseView {
    OwedExpenseView {
        split_id: owed.split_id,
        expense_id: owed.expense_id,
        description: owed.description,
        total_amount_minor: owed.total_amount.cents(),
        paid_by: owed.paid_by,
        group: owed.group,
        amount_owed_minor: owed.amount_owed.cents(),
    }
}

pub(crate) fn settlement(settlement: Settlement) -> SettlementView {
    SettlementView {
        id: settlement.id,
        from_user_id: settlement.from_user_id,
        to_user_id: settlement.to_user_id,
        amount_minor: settlement.amount.cents(),
        remark: settlement.remark,
        group_id: settlement.group_id,
        settled_at: settlement.settled_at,
    }
}

pub(crate) fn balance(balance: Balance) -> BalanceView {
    BalanceView {
        you_are_owed_minor: balance.you_are_owed.cents(),
        you_owe_minor: balance.you_owe.cents(),
        total_minor: balance.total.cents(),
    }
}

pub(crate) fn user(user: UserInfo) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
    }
}
