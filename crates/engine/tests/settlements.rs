mod common;

use chrono::{Duration, Utc};
use engine::{BatchEntry, EngineError, ExpenseCmd, MoneyCents, SettleCmd};

use common::{cents, count_rows, engine_with_db, seed_users};

async fn owed(engine: &engine::Engine, expense_id: i64) -> Vec<MoneyCents> {
    engine
        .expense(expense_id)
        .await
        .unwrap()
        .splits
        .iter()
        .map(|s| s.amount_owed)
        .collect()
}

#[tokio::test]
async fn exact_settlement_clears_the_split() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let expense = engine
        .record_expense(ExpenseCmd::new(u1, "Dinner", cents(10000)).split(u2, cents(4000)))
        .await
        .unwrap();

    let receipt = engine
        .settle(SettleCmd::new(u2, u1, cents(4000)))
        .await
        .unwrap();
    assert_eq!(receipt.applied, cents(4000));
    assert_eq!(receipt.unapplied, MoneyCents::ZERO);
    assert_eq!(receipt.paydowns.len(), 1);
    assert_eq!(owed(&engine, expense.id).await, vec![MoneyCents::ZERO]);

    let balance = engine.overall_balance(u1).await.unwrap();
    assert_eq!(balance.you_are_owed, MoneyCents::ZERO);
    assert_eq!(balance.total, MoneyCents::ZERO);
    assert_eq!(balance.total.to_string(), "0.00");
}

#[tokio::test]
async fn oldest_split_is_paid_first() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let first = engine
        .record_expense(ExpenseCmd::new(u1, "Lunch", cents(6000)).split(u2, cents(3000)))
        .await
        .unwrap();
    let second = engine
        .record_expense(ExpenseCmd::new(u1, "Concert", cents(10000)).split(u2, cents(5000)))
        .await
        .unwrap();

    let receipt = engine
        .settle(SettleCmd::new(u2, u1, cents(4000)))
        .await
        .unwrap();
    assert_eq!(receipt.applied, cents(4000));

    assert_eq!(owed(&engine, first.id).await, vec![MoneyCents::ZERO]);
    assert_eq!(owed(&engine, second.id).await, vec![cents(4000)]);

    let paid: Vec<(i64, MoneyCents)> = receipt
        .paydowns
        .iter()
        .map(|p| (p.expense_id, p.paid()))
        .collect();
    assert_eq!(paid, vec![(first.id, cents(3000)), (second.id, cents(1000))]);
}

#[tokio::test]
async fn overpayment_clears_everything_and_reports_the_excess() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let expense = engine
        .record_expense(ExpenseCmd::new(u1, "Books", cents(6000)).split(u2, cents(3000)))
        .await
        .unwrap();

    let receipt = engine
        .settle(SettleCmd::new(u2, u1, cents(5000)))
        .await
        .unwrap();
    assert_eq!(receipt.applied, cents(3000));
    assert_eq!(receipt.unapplied, cents(2000));
    assert_eq!(owed(&engine, expense.id).await, vec![MoneyCents::ZERO]);

    // The excess is not stored anywhere but the settlement itself, so it
    // still shows in the pair's net.
    let balance = engine.balance_between(u2, u1).await.unwrap();
    assert_eq!(balance.total, cents(2000));
}

#[tokio::test]
async fn settlement_without_debt_is_still_recorded() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let receipt = engine
        .settle(SettleCmd::new(u1, u2, cents(1500)).remark("  advance "))
        .await
        .unwrap();
    assert!(receipt.paydowns.is_empty());
    assert_eq!(receipt.unapplied, cents(1500));
    assert_eq!(receipt.settlement.remark.as_deref(), Some("advance"));

    let history = engine.settlements_between(u2, u1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, cents(1500));

    assert_eq!(engine.overall_balance(u1).await.unwrap().total, cents(1500));
    assert_eq!(engine.overall_balance(u2).await.unwrap().total, cents(-1500));
}

#[tokio::test]
async fn only_debts_to_the_payee_are_touched() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2", "u3"]).await;
    let (u1, u2, u3) = (ids[0], ids[1], ids[2]);

    let to_u1 = engine
        .record_expense(ExpenseCmd::new(u1, "Gas", cents(3000)).split(u2, cents(1500)))
        .await
        .unwrap();
    let to_u3 = engine
        .record_expense(ExpenseCmd::new(u3, "Snacks", cents(3000)).split(u2, cents(1500)))
        .await
        .unwrap();
    let u1_owes_u3 = engine
        .record_expense(ExpenseCmd::new(u3, "Tickets", cents(3000)).split(u1, cents(1500)))
        .await
        .unwrap();

    engine
        .settle(SettleCmd::new(u2, u3, cents(1500)))
        .await
        .unwrap();

    assert_eq!(owed(&engine, to_u1.id).await, vec![cents(1500)]);
    assert_eq!(owed(&engine, to_u3.id).await, vec![MoneyCents::ZERO]);
    assert_eq!(owed(&engine, u1_owes_u3.id).await, vec![cents(1500)]);
}

#[tokio::test]
async fn paydowns_conserve_the_applied_amount() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let mut expense_ids = Vec::new();
    for (i, share) in [1250, 799, 3001].into_iter().enumerate() {
        let expense = engine
            .record_expense(
                ExpenseCmd::new(u1, format!("item {i}"), cents(share * 2)).split(u2, cents(share)),
            )
            .await
            .unwrap();
        expense_ids.push(expense.id);
    }

    let mut before = MoneyCents::ZERO;
    for id in &expense_ids {
        before += owed(&engine, *id).await.into_iter().sum::<MoneyCents>();
    }

    let receipt = engine
        .settle(SettleCmd::new(u2, u1, cents(2500)))
        .await
        .unwrap();

    let mut after = MoneyCents::ZERO;
    for id in &expense_ids {
        let amounts = owed(&engine, *id).await;
        assert!(amounts.iter().all(|a| !a.is_negative()));
        after += amounts.into_iter().sum::<MoneyCents>();
    }
    assert_eq!(before - after, receipt.applied);
    assert_eq!(receipt.applied + receipt.unapplied, cents(2500));
}

#[tokio::test]
async fn invalid_settlements_are_rejected_without_side_effects() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    for amount in [0, -100] {
        let err = engine
            .settle(SettleCmd::new(u2, u1, cents(amount)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)), "{err:?}");
    }

    let err = engine
        .settle(SettleCmd::new(u1, u1, cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)), "{err:?}");

    let err = engine
        .settle(SettleCmd::new(u1, 999, cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)), "{err:?}");

    let err = engine
        .settle(SettleCmd::new(u1, u2, cents(100)).group(77))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)), "{err:?}");

    assert_eq!(count_rows(&db, "settlements").await, 0);
}

#[tokio::test]
async fn batch_entries_succeed_or_fail_independently() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2", "u3"]).await;
    let (u1, u2, u3) = (ids[0], ids[1], ids[2]);
    let group = engine.create_group("Trip").await.unwrap();

    let expense = engine
        .record_expense(
            ExpenseCmd::new(u2, "Cabin", cents(9000))
                .group(group)
                .split(u1, cents(3000)),
        )
        .await
        .unwrap();

    let results = engine
        .settle_batch(
            u1,
            Some(group),
            vec![
                BatchEntry::new(u2, cents(3000)).remark("cabin"),
                BatchEntry::new(u3, cents(0)),
                BatchEntry::new(404, cents(100)),
                BatchEntry::new(u3, cents(500)),
            ],
        )
        .await;

    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(EngineError::InvalidAmount(_))));
    assert!(matches!(results[2], Err(EngineError::KeyNotFound(_))));
    assert!(results[3].is_ok());

    assert_eq!(owed(&engine, expense.id).await, vec![MoneyCents::ZERO]);
    let recorded = engine.group_settlements(group).await.unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|s| s.group_id == Some(group)));
    assert_eq!(count_rows(&db, "settlements").await, 2);
}

#[tokio::test]
async fn settlement_history_is_newest_first() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2", "u3"]).await;
    let (u1, u2, u3) = (ids[0], ids[1], ids[2]);
    let now = Utc::now();

    engine
        .settle(SettleCmd::new(u1, u2, cents(100)).settled_at(now - Duration::days(2)))
        .await
        .unwrap();
    engine
        .settle(SettleCmd::new(u2, u1, cents(200)).settled_at(now - Duration::days(1)))
        .await
        .unwrap();
    engine
        .settle(SettleCmd::new(u3, u1, cents(300)).settled_at(now))
        .await
        .unwrap();

    let amounts: Vec<MoneyCents> = engine
        .settlements_for_user(u1)
        .await
        .unwrap()
        .iter()
        .map(|s| s.amount)
        .collect();
    assert_eq!(amounts, vec![cents(300), cents(200), cents(100)]);

    let pair = engine.settlements_between(u1, u2).await.unwrap();
    assert_eq!(pair.len(), 2);
    assert_eq!(pair[0].from_user_id, u2);
}

#[tokio::test]
async fn settlement_above_the_limit_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["u1", "u2"]).await;
    let (u1, u2) = (ids[0], ids[1]);

    let err = engine
        .settle(SettleCmd::new(u2, u1, MoneyCents::MAX + cents(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)), "{err:?}");
    assert_eq!(count_rows(&db, "settlements").await, 0);

    let receipt = engine
        .settle(SettleCmd::new(u2, u1, MoneyCents::MAX))
        .await
        .unwrap();
    assert_eq!(receipt.unapplied, MoneyCents::MAX);
}

