use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

const PASSWORD: &str = "password";

struct TestApp {
    app: Router,
    engine: Arc<Engine>,
    alice: i64,
    bob: i64,
    carol: i64,
}

async fn test_app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db.clone()).build().await.unwrap());

    let alice = engine.create_user("alice", PASSWORD).await.unwrap().id;
    let bob = engine.create_user("bob", PASSWORD).await.unwrap().id;
    let carol = engine.create_user("carol", PASSWORD).await.unwrap().id;

    let app = router(ServerState {
        engine: Arc::clone(&engine),
        db,
    });
    TestApp {
        app,
        engine,
        alice,
        bob,
        carol,
    }
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn as_user(
    app: &Router,
    username: &str,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    call(app, method, uri, Some(basic(username, PASSWORD)), body).await
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let t = test_app().await;

    let (status, _) = call(&t.app, Method::GET, "/balance", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &t.app,
        Method::GET,
        "/balance",
        Some(basic("alice", "wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expense_then_settlement_clears_the_balance() {
    let t = test_app().await;

    let (status, created) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Dinner",
            "amount_minor": 10000,
            "group_id": null,
            "splits": [{"username": "bob", "amount_owed_minor": 4000}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = created["id"].as_i64().unwrap();

    let (status, balance) = as_user(&t.app, "alice", Method::GET, "/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["you_are_owed_minor"], 4000);

    let uri = format!("/expenses/{expense_id}");
    let (status, expense) = as_user(&t.app, "bob", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expense["splits"][0]["amount_owed_minor"], 4000);

    let (status, receipt) = as_user(
        &t.app,
        "bob",
        Method::POST,
        "/settle-up",
        Some(json!({"to_user_id": t.alice, "amount_minor": 4000, "remark": null, "group_id": null})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["applied_minor"], 4000);
    assert_eq!(receipt["unapplied_minor"], 0);

    let (_, balance) = as_user(&t.app, "alice", Method::GET, "/balance", None).await;
    assert_eq!(balance["total_minor"], 0);

    let (_, expense) = as_user(&t.app, "alice", Method::GET, &uri, None).await;
    assert_eq!(expense["splits"][0]["amount_owed_minor"], 0);

    let uri = format!("/settlements/with/{}", t.alice);
    let (status, history) = as_user(&t.app, "bob", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["settlements"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn engine_errors_map_to_status_codes() {
    let t = test_app().await;

    let (status, body) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({"description": "Nothing", "amount_minor": 0, "group_id": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some());

    let (status, _) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Ghost",
            "amount_minor": 500,
            "group_id": null,
            "splits": [{"username": "nobody", "amount_owed_minor": 100}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/settle-up",
        Some(json!({"to_user_id": t.alice, "amount_minor": 100, "remark": null, "group_id": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = as_user(&t.app, "alice", Method::GET, "/expenses/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_involved_users_see_and_only_the_payer_deletes() {
    let t = test_app().await;

    let (_, created) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Taxi",
            "amount_minor": 3000,
            "group_id": null,
            "splits": [{"username": "bob", "amount_owed_minor": 1500}]
        })),
    )
    .await;
    let uri = format!("/expenses/{}", created["id"]);

    let (status, _) = as_user(&t.app, "carol", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = as_user(&t.app, "bob", Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = as_user(&t.app, "alice", Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = as_user(&t.app, "alice", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owed_expenses_are_visible_to_friends_only() {
    let t = test_app().await;

    as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Lunch",
            "amount_minor": 2000,
            "group_id": null,
            "splits": [{"username": "bob", "amount_owed_minor": 1000}]
        })),
    )
    .await;

    let uri = format!("/owed-expenses/{}", t.bob);
    let (status, _) = as_user(&t.app, "carol", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    t.engine.add_friendship(t.bob, t.carol).await.unwrap();
    let (status, owed) = as_user(&t.app, "carol", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owed["expenses"][0]["paid_by"], "alice");
    assert_eq!(owed["expenses"][0]["amount_owed_minor"], 1000);

    let (status, own) = as_user(&t.app, "bob", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["expenses"].as_array().unwrap().len(), 1);

    let (_, friends) = as_user(&t.app, "carol", Method::GET, "/friends", None).await;
    assert_eq!(friends["friends"][0]["username"], "bob");
}

#[tokio::test]
async fn group_routes_require_membership() {
    let t = test_app().await;
    let group = t.engine.create_group("Trip").await.unwrap();
    t.engine.add_group_member(group, t.alice).await.unwrap();
    t.engine.add_group_member(group, t.bob).await.unwrap();

    let (status, _) = as_user(
        &t.app,
        "carol",
        Method::POST,
        "/expenses",
        Some(json!({"description": "Crash", "amount_minor": 100, "group_id": group})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Cabin",
            "amount_minor": 9000,
            "group_id": group,
            "splits": [{"username": "bob", "amount_owed_minor": 4500}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/group/{group}/balances");
    let (status, _) = as_user(&t.app, "carol", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, balances) = as_user(&t.app, "bob", Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balances["balances"][0]["username"], "alice");
    assert_eq!(balances["balances"][0]["balance"]["total_minor"], 4500);
    assert_eq!(balances["balances"][1]["balance"]["total_minor"], -4500);

    let (status, _) = as_user(&t.app, "bob", Method::GET, "/group/404/expenses", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, members) = as_user(
        &t.app,
        "alice",
        Method::GET,
        &format!("/group/{group}/members"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn group_settle_up_reports_rejected_entries() {
    let t = test_app().await;
    let group = t.engine.create_group("Flat").await.unwrap();
    for member in [t.alice, t.bob, t.carol] {
        t.engine.add_group_member(group, member).await.unwrap();
    }

    as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Rent",
            "amount_minor": 90000,
            "group_id": group,
            "splits": [
                {"username": "bob", "amount_owed_minor": 30000},
                {"username": "carol", "amount_owed_minor": 30000}
            ]
        })),
    )
    .await;

    let (status, body) = as_user(
        &t.app,
        "bob",
        Method::POST,
        &format!("/group/{group}/settleup"),
        Some(json!({"settlements": [
            {"to_user_id": t.alice, "amount_minor": 30000, "remark": "rent"},
            {"to_user_id": t.carol, "amount_minor": -5, "remark": null}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["settlements"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["index"], 1);

    let (_, settlements) = as_user(
        &t.app,
        "carol",
        Method::GET,
        &format!("/group/{group}/settlements"),
        None,
    )
    .await;
    assert_eq!(settlements["settlements"].as_array().unwrap().len(), 1);

    let (_, nets) = as_user(&t.app, "alice", Method::GET, "/balance/counterparties", None).await;
    let nets = nets["counterparties"].as_array().unwrap();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0]["username"], "carol");
    assert_eq!(nets[0]["net_minor"], 30000);
}

#[tokio::test]
async fn related_expenses_list_paid_and_owed() {
    let t = test_app().await;

    let (status, _) = as_user(
        &t.app,
        "alice",
        Method::POST,
        "/expenses",
        Some(json!({
            "description": "Taxi",
            "amount_minor": 3000,
            "group_id": null,
            "splits": [{"username": "bob", "amount_owed_minor": 1500}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, alice) = as_user(&t.app, "alice", Method::GET, "/expenses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alice["paid"].as_array().unwrap().len(), 1);
    assert!(alice["owed"].as_array().unwrap().is_empty());

    let (_, bob) = as_user(&t.app, "bob", Method::GET, "/expenses", None).await;
    assert!(bob["paid"].as_array().unwrap().is_empty());
    assert_eq!(bob["owed"][0]["description"], "Taxi");
    assert_eq!(bob["owed"][0]["paid_by"], "alice");
    assert_eq!(bob["owed"][0]["amount_owed_minor"], 1500);
}
