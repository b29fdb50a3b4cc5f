//! FIFO settlement allocation.
//!
//! Given a payment and the outstanding splits the payer owes the payee
//! (oldest first), [`allocate`] decides how much each split is paid down.
//! It is a pure function: the caller persists the result.
//!
//! The walk is greedy: the oldest split is fully paid before the next one is
//! touched. Whatever is left once every split reaches zero is reported as
//! `unapplied` and is not carried anywhere else.

use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// An outstanding split as seen by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenSplit {
    pub split_id: i64,
    pub expense_id: i64,
    pub amount_owed: MoneyCents,
}

/// The change applied to one split by a settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paydown {
    pub split_id: i64,
    pub expense_id: i64,
    pub before: MoneyCents,
    pub after: MoneyCents,
}

impl Paydown {
    #[must_use]
    pub fn paid(&self) -> MoneyCents {
        self.before - self.after
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    pub paydowns: Vec<Paydown>,
    pub applied: MoneyCents,
    pub unapplied: MoneyCents,
}

/// Pays down `open` splits in the given order until `amount` is exhausted.
///
/// `open` must already be sorted by creation order. Splits with nothing
/// owed produce no paydown.
#[must_use]
pub fn allocate(amount: MoneyCents, open: &[OpenSplit]) -> Allocation {
    let mut remaining = amount;
    let mut paydowns = Vec::new();

    for split in open {
        if !remaining.is_positive() {
            break;
        }
        if !split.amount_owed.is_positive() {
            continue;
        }

        let after = if split.amount_owed <= remaining {
            remaining -= split.amount_owed;
            MoneyCents::ZERO
        } else {
            let after = split.amount_owed - remaining;
            remaining = MoneyCents::ZERO;
            after
        };

        paydowns.push(Paydown {
            split_id: split.split_id,
            expense_id: split.expense_id,
            before: split.amount_owed,
            after,
        });
    }

    Allocation {
        paydowns,
        applied: amount - remaining,
        unapplied: remaining,
    }
}
