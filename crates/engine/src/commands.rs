//! Command structs for engine write operations.
//!
//! These types replace loosely shaped payloads with one field per input,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::MoneyCents;

/// Reference to a user, either by surrogate id or by username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserRef {
    Id(i64),
    Username(String),
}

impl From<i64> for UserRef {
    fn from(value: i64) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for UserRef {
    fn from(value: &str) -> Self {
        Self::Username(value.to_string())
    }
}

/// One debtor's share of an expense, already computed by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitInput {
    pub debtor: UserRef,
    pub amount_owed: MoneyCents,
}

impl SplitInput {
    #[must_use]
    pub fn new(debtor: impl Into<UserRef>, amount_owed: MoneyCents) -> Self {
        Self {
            debtor: debtor.into(),
            amount_owed,
        }
    }
}

/// Record an expense paid by `payer_id`.
///
/// Splits are persisted in the order given; that order is the FIFO
/// tie-break used later by settlements.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub payer_id: i64,
    pub description: String,
    pub amount: MoneyCents,
    pub group_id: Option<i64>,
    pub splits: Vec<SplitInput>,
    pub created_at: DateTime<Utc>,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(payer_id: i64, description: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            payer_id,
            description: description.into(),
            amount,
            group_id: None,
            splits: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    #[must_use]
    pub fn split(mut self, debtor: impl Into<UserRef>, amount_owed: MoneyCents) -> Self {
        self.splits.push(SplitInput::new(debtor, amount_owed));
        self
    }

    #[must_use]
    pub fn splits(mut self, splits: Vec<SplitInput>) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Record a payment from `from_user_id` to `to_user_id`.
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub amount: MoneyCents,
    pub remark: Option<String>,
    pub group_id: Option<i64>,
    pub settled_at: DateTime<Utc>,
}

impl SettleCmd {
    #[must_use]
    pub fn new(from_user_id: i64, to_user_id: i64, amount: MoneyCents) -> Self {
        Self {
            from_user_id,
            to_user_id,
            amount,
            remark: None,
            group_id: None,
            settled_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    #[must_use]
    pub fn settled_at(mut self, settled_at: DateTime<Utc>) -> Self {
        self.settled_at = settled_at;
        self
    }
}

/// One entry of a group settle-up batch.
#[derive(Clone, Debug)]
pub struct BatchEntry {
    pub to_user_id: i64,
    pub amount: MoneyCents,
    pub remark: Option<String>,
}

impl BatchEntry {
    #[must_use]
    pub fn new(to_user_id: i64, amount: MoneyCents) -> Self {
        Self {
            to_user_id,
            amount,
            remark: None,
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}
