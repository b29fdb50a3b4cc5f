use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserView {
        pub id: i64,
        pub username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FriendsResponse {
        pub friends: Vec<UserView>,
    }
}

pub mod expense {
    use super::*;

    /// One debtor's share. Debtors are referenced by username.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub username: String,
        pub amount_owed_minor: i64,
    }

    /// Request body for recording an expense paid by the session user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub description: String,
        /// Must be > 0.
        pub amount_minor: i64,
        pub group_id: Option<i64>,
        #[serde(default)]
        pub splits: Vec<SplitNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: i64,
        pub debtor_id: i64,
        pub amount_minor: i64,
        /// What is still owed after settlements.
        pub amount_owed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: i64,
        pub description: String,
        pub amount_minor: i64,
        pub payer_id: i64,
        pub group_id: Option<i64>,
        pub created_at: DateTime<Utc>,
        pub splits: Vec<SplitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OwedExpenseView {
        pub split_id: i64,
        pub expense_id: i64,
        pub description: String,
        pub total_amount_minor: i64,
        pub paid_by: String,
        pub group: Option<String>,
        pub amount_owed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RelatedExpensesResponse {
        pub paid: Vec<ExpenseView>,
        pub owed: Vec<OwedExpenseView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OwedExpensesResponse {
        pub expenses: Vec<OwedExpenseView>,
    }
}

pub mod settlement {
    use super::*;

    /// Request body for paying another user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleUp {
        pub to_user_id: i64,
        /// Must be > 0.
        pub amount_minor: i64,
        pub remark: Option<String>,
        pub group_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementCreated {
        pub id: i64,
        /// Part of the payment that paid down open splits.
        pub applied_minor: i64,
        /// Part of the payment with no debt left to absorb it.
        pub unapplied_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSettleUpEntry {
        pub to_user_id: i64,
        pub amount_minor: i64,
        pub remark: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSettleUp {
        pub settlements: Vec<GroupSettleUpEntry>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryError {
        /// Position of the rejected entry in the request.
        pub index: usize,
        pub error: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSettleUpResponse {
        /// Ids of the settlements that were recorded, in request order.
        pub settlements: Vec<i64>,
        pub errors: Vec<EntryError>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: i64,
        pub from_user_id: i64,
        pub to_user_id: i64,
        pub amount_minor: i64,
        pub remark: Option<String>,
        pub group_id: Option<i64>,
        pub settled_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementListResponse {
        pub settlements: Vec<SettlementView>,
    }
}

pub mod balance {
    use super::*;

    /// Positive amounts are owed to the user, negative ones by the user.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BalanceView {
        pub you_are_owed_minor: i64,
        pub you_owe_minor: i64,
        pub total_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CounterpartyView {
        pub user_id: i64,
        pub username: String,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CounterpartiesResponse {
        pub counterparties: Vec<CounterpartyView>,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberBalanceView {
        pub user_id: i64,
        pub username: String,
        pub balance: balance::BalanceView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalancesResponse {
        pub balances: Vec<MemberBalanceView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<user::UserView>,
    }
}
