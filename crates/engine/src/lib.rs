//! Debt ledger engine.
//!
//! Records shared expenses as per-debtor splits, applies settlements to the
//! payer's oldest debts first and derives balances on demand. All state
//! lives in the database; [`Engine`] is a thin handle over the pool.

pub use allocation::Paydown;
pub use balance::{Balance, Ledger};
pub use commands::{BatchEntry, ExpenseCmd, SettleCmd, SplitInput, UserRef};
pub use error::{EngineError, ErrorKind};
pub use expenses::{Expense, ExpenseDetail};
pub use money::MoneyCents;
pub use ops::{
    CounterpartyBalance, Engine, EngineBuilder, MemberBalance, OwedExpense, RelatedExpenses,
    SettlementReceipt,
};
pub use settlements::Settlement;
pub use splits::Split;
pub use users::UserInfo;

pub mod allocation;
mod balance;
mod commands;
mod error;
mod expenses;
mod friendships;
mod group_members;
mod groups;
mod locks;
mod money;
mod ops;
mod settlements;
mod splits;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
