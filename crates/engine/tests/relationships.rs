mod common;

use engine::EngineError;

use common::{count_rows, engine_with_db, seed_users};

#[tokio::test]
async fn group_is_created_with_its_members() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["alice", "bob", "carol"]).await;

    let group_id = engine
        .create_group_with_members(" Trip ", vec![ids[2], ids[0]])
        .await
        .unwrap();

    let members: Vec<String> = engine
        .group_members(group_id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(members, vec!["alice", "carol"]);
    assert!(engine.is_group_member(group_id, ids[0]).await.unwrap());
    assert!(!engine.is_group_member(group_id, ids[1]).await.unwrap());
}

#[tokio::test]
async fn failing_member_leaves_no_group_behind() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["alice", "bob"]).await;

    let err = engine
        .create_group_with_members("Trip", vec![ids[0], 999])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)), "{err:?}");

    let err = engine
        .create_group_with_members("Trip", vec![ids[0], ids[1], ids[0]])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)), "{err:?}");

    assert_eq!(count_rows(&db, "\"groups\"").await, 0);
    assert_eq!(count_rows(&db, "group_members").await, 0);
}

#[tokio::test]
async fn member_is_added_once() {
    let (engine, db) = engine_with_db().await;
    let ids = seed_users(&db, &["alice"]).await;

    let group_id = engine.create_group("Flat").await.unwrap();
    engine.add_group_member(group_id, ids[0]).await.unwrap();

    let err = engine.add_group_member(group_id, ids[0]).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)), "{err:?}");

    let err = engine.add_group_member(4242, ids[0]).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)), "{err:?}");
}
