mod common;

use serde_json::{json, Value};

use common::{create_product, login_as_admin, setup_test_app};

#[tokio::test]
async fn exit_decrements_stock_and_records_audit_row() {
    let (server, db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let id = create_product(
        &server,
        &token,
        json!({ "name": "Perfume X", "category": "Perfumes", "quantity": 10, "minThreshold": 2 }),
    )
    .await;

    let response = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 9 }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());

    let body: Value = response.json();
    assert_eq!(body["product"]["id"], id.as_str());
    assert_eq!(body["product"]["name"], "Perfume X");
    assert_eq!(body["product"]["quantity"], 1);
    assert_eq!(body["exitQuantity"], 9);
    assert_eq!(body["newQuantity"], 1);
    assert_eq!(body["isLowStock"], true);
    assert!(body["timestamp"].as_str().is_some());

    // One audit row with the exact before/after quantities.
    let audit = db
        .prepare("SELECT * FROM inventory_exits WHERE product_id = ?")
        .all(&[id.clone().into()])
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].integer("quantity").unwrap(), 9);
    assert_eq!(audit[0].integer("previous_quantity").unwrap(), 10);
    assert_eq!(audit[0].integer("new_quantity").unwrap(), 1);

    // Only one unit is left now; asking for five must change nothing.
    let rejected = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 5 }))
        .await;
    assert_eq!(rejected.status_code(), 400);

    let audit = db
        .prepare("SELECT * FROM inventory_exits WHERE product_id = ?")
        .all(&[id.into()])
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn exit_larger_than_stock_is_rejected_and_writes_nothing() {
    let (server, db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let id = create_product(
        &server,
        &token,
        json!({ "name": "Crema Y", "category": "Cremas", "quantity": 1, "minThreshold": 0 }),
    )
    .await;

    let response = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 5 }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "La cantidad a descontar es mayor que el stock disponible"
    );

    let product: Value = server
        .get(&format!("/api/products/{}", id))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(product["quantity"], 1);

    let audit = db
        .prepare("SELECT * FROM inventory_exits WHERE product_id = ?")
        .all(&[id.into()])
        .await
        .unwrap();
    assert!(audit.is_empty());
}

#[tokio::test]
async fn exit_quantity_must_be_a_positive_integer() {
    let (server, _db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let id = create_product(
        &server,
        &token,
        json!({ "name": "Labial Z", "category": "Maquillajes", "quantity": 5, "minThreshold": 1 }),
    )
    .await;

    for bad in [json!({ "quantity": 0 }), json!({ "quantity": -2 }), json!({ "quantity": 1.5 }), json!({})] {
        let response = server
            .post(&format!("/api/products/{}/exit", id))
            .authorization_bearer(&token)
            .json(&bad)
            .await;
        assert_eq!(response.status_code(), 400, "payload {} should be rejected", bad);
        let body: Value = response.json();
        assert_eq!(body["error"], "Validation Error");
    }
}

#[tokio::test]
async fn exit_on_missing_product_is_404() {
    let (server, _db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let response = server
        .post("/api/products/no-such-id/exit")
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 1 }))
        .await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["message"], "Producto no encontrado");
}

#[tokio::test]
async fn draining_the_stock_exactly_leaves_zero() {
    let (server, _db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let id = create_product(
        &server,
        &token,
        json!({ "name": "Otros W", "category": "Otros", "quantity": 3, "minThreshold": 0 }),
    )
    .await;

    let response = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 3 }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["newQuantity"], 0);
    assert_eq!(body["isLowStock"], true);

    // Nothing left to draw.
    let again = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 1 }))
        .await;
    assert_eq!(again.status_code(), 400);
}

#[tokio::test]
async fn concurrent_exits_never_oversell() {
    let (server, db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let id = create_product(
        &server,
        &token,
        json!({ "name": "Perfume Raro", "category": "Perfumes", "quantity": 5, "minThreshold": 0 }),
    )
    .await;

    // Two simultaneous requests each asking for the whole stock. The
    // compare-and-set inside the transaction lets at most one commit.
    let first = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 5 }));
    let second = server
        .post(&format!("/api/products/{}/exit", id))
        .authorization_bearer(&token)
        .json(&json!({ "quantity": 5 }));

    let (a, b) = tokio::join!(first, second);
    let statuses = [a.status_code().as_u16(), b.status_code().as_u16()];
    let successes = statuses.iter().filter(|&&s| s == 200).count();
    assert_eq!(successes, 1, "exactly one exit may win, got {:?}", statuses);

    let product: Value = server
        .get(&format!("/api/products/{}", id))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(product["quantity"], 0);

    let audit = db
        .prepare("SELECT * FROM inventory_exits WHERE product_id = ?")
        .all(&[id.into()])
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
}
