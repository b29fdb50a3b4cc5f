//! Directed pairwise ledger.
//!
//! Balances follow one sign convention, fixed here: from a user's point of
//! view a positive amount is owed *to* them (credit), a negative amount is
//! owed *by* them (debit). A [`Ledger`] keeps, for every ordered pair of
//! users, what the debtor still owes the creditor on the creditor's
//! expenses. The two directions between the same users are never merged, so
//! a user's credit and debit stay visible side by side.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// What others owe the user. Never negative.
    pub you_are_owed: MoneyCents,
    /// What the user owes others. Never positive.
    pub you_owe: MoneyCents,
    pub total: MoneyCents,
}

impl Balance {
    /// Folds `(incoming, outgoing)` pairs, one per counterparty, into a
    /// balance.
    ///
    /// `incoming` is what the counterparty still owes the user, `outgoing`
    /// what the user still owes the counterparty. A direction pushed below
    /// zero by payments flips to the other side.
    pub fn from_directions(directions: impl IntoIterator<Item = (MoneyCents, MoneyCents)>) -> Self {
        let (you_are_owed, you_owe) = directions.into_iter().fold(
            (MoneyCents::ZERO, MoneyCents::ZERO),
            |(owed, owe), (incoming, outgoing)| {
                (
                    owed + incoming.credit() - outgoing.debit(),
                    owe + incoming.debit() - outgoing.credit(),
                )
            },
        );
        Self {
            you_are_owed,
            you_owe,
            total: you_are_owed + you_owe,
        }
    }
}

/// Outstanding amounts per `(creditor, debtor)` direction.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    flows: BTreeMap<(i64, i64), MoneyCents>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `debtor` owes `creditor` a further `amount`. Self-debts are ignored.
    pub fn record_debt(&mut self, creditor: i64, debtor: i64, amount: MoneyCents) {
        if creditor == debtor {
            return;
        }
        *self.flows.entry((creditor, debtor)).or_default() += amount;
    }

    /// `from` paid `to` `amount`: `from` owes `to` that much less.
    pub fn record_payment(&mut self, from: i64, to: i64, amount: MoneyCents) {
        if from == to {
            return;
        }
        *self.flows.entry((to, from)).or_default() -= amount;
    }

    /// What `debtor` still owes `creditor` in that direction alone.
    fn flow(&self, creditor: i64, debtor: i64) -> MoneyCents {
        self.flows
            .get(&(creditor, debtor))
            .copied()
            .unwrap_or_default()
    }

    /// Signed net of `user` against `counterparty` (positive: counterparty
    /// owes user).
    #[must_use]
    pub fn net(&self, user: i64, counterparty: i64) -> MoneyCents {
        self.flow(user, counterparty) - self.flow(counterparty, user)
    }

    /// Balance of `user` against `counterparty` only.
    #[must_use]
    pub fn balance_between(&self, user: i64, counterparty: i64) -> Balance {
        Balance::from_directions([(
            self.flow(user, counterparty),
            self.flow(counterparty, user),
        )])
    }

    /// Non-zero nets of `user`, ordered by counterparty id.
    #[must_use]
    pub fn counterparties(&self, user: i64) -> Vec<(i64, MoneyCents)> {
        self.counterparty_ids(user)
            .into_iter()
            .map(|other| (other, self.net(user, other)))
            .filter(|(_, net)| !net.is_zero())
            .collect()
    }

    #[must_use]
    pub fn balance_of(&self, user: i64) -> Balance {
        Balance::from_directions(
            self.counterparty_ids(user)
                .into_iter()
                .map(|other| (self.flow(user, other), self.flow(other, user))),
        )
    }

    /// Every user appearing in at least one recorded direction.
    #[must_use]
    pub fn users(&self) -> BTreeSet<i64> {
        self.flows
            .keys()
            .flat_map(|&(creditor, debtor)| [creditor, debtor])
            .collect()
    }

    fn counterparty_ids(&self, user: i64) -> BTreeSet<i64> {
        self.flows
            .keys()
            .filter_map(|&(creditor, debtor)| {
                if creditor == user {
                    Some(debtor)
                } else if debtor == user {
                    Some(creditor)
                } else {
                    None
                }
            })
            .collect()
    }
}
