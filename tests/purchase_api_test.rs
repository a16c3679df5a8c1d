mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn signup_returns_created_profile() {
    let state = test_state();

    let (status, body) = post_json(
        &state,
        "/auth/signup",
        &json!({"email": "alice@example.com", "uid": "alice"}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = expect_success(status, &body);
    assert_eq!(data["uid"], "alice");
    assert_eq!(data["email"], "alice@example.com");
    assert_eq!(data["role"], "user");
    assert_eq!(dec_field(&data["credits"]), dec("0"));
    assert_eq!(data["purchasedNumbers"], json!([]));
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let state = test_state();
    seed_user(&state, "alice@example.com", "alice").await;

    let (status, body) = post_json(
        &state,
        "/auth/signup",
        &json!({"email": "Alice@Example.com", "uid": "alice2"}),
    )
    .await;

    expect_failure(status, &body, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_rejects_malformed_email() {
    let state = test_state();

    let (status, body) =
        post_json(&state, "/auth/signup", &json!({"email": "not-an-email"})).await;

    expect_failure(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_resolves_email_case_insensitively() {
    let state = test_state();
    seed_user(&state, "bob@example.com", "bob").await;

    let (status, body) = post_json(
        &state,
        "/auth/login",
        &json!({"email": "BOB@example.COM"}),
    )
    .await;

    let data = expect_success(status, &body);
    assert_eq!(data["uid"], "bob");
}

#[tokio::test]
async fn login_unknown_email_is_not_found() {
    let state = test_state();

    let (status, body) =
        post_json(&state, "/auth/login", &json!({"email": "ghost@example.com"})).await;

    expect_failure(status, &body, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_unknown_uid_is_not_found() {
    let state = test_state();

    let (status, body) = get(&state, "/user/ghost").await;

    expect_failure(status, &body, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn buy_transfers_number_and_debits_credits() {
    let state = test_state();
    let uid = seed_user(&state, "carol@example.com", "carol").await;
    seed_credits(&state, &uid, "5.00").await;
    let number_id = seed_number(&state, "+15550001111", "1.25").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": uid, "numberId": number_id}),
    )
    .await;

    let data = expect_success(status, &body);
    assert_eq!(data["purchasedNumber"], "+15550001111");
    assert_eq!(dec_field(&data["price"]), dec("1.25"));
    assert_eq!(dec_field(&data["newBalance"]), dec("3.75"));

    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    assert_eq!(listed.as_array().expect("listing").len(), 0);

    let (status, body) = get(&state, &format!("/user/{uid}")).await;
    let profile = expect_success(status, &body);
    assert_eq!(profile["purchasedNumbers"], json!(["+15550001111"]));
    let recent = profile["recentTransactions"]
        .as_array()
        .expect("transactions");
    assert!(recent
        .iter()
        .any(|entry| entry["type"] == "single_purchase"));
}

#[tokio::test]
async fn buy_rejects_insufficient_credits_without_effects() {
    let state = test_state();
    let uid = seed_user(&state, "dave@example.com", "dave").await;
    seed_credits(&state, &uid, "0.10").await;
    let number_id = seed_number(&state, "+15550002222", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": uid, "numberId": number_id}),
    )
    .await;

    expect_failure(status, &body, StatusCode::PAYMENT_REQUIRED);

    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    assert_eq!(listed.as_array().expect("listing").len(), 1);

    let (status, body) = get(&state, &format!("/user/{uid}")).await;
    let profile = expect_success(status, &body);
    assert_eq!(dec_field(&profile["credits"]), dec("0.10"));
}

#[tokio::test]
async fn buy_rejects_unknown_number() {
    let state = test_state();
    let uid = seed_user(&state, "erin@example.com", "erin").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": uid, "numberId": "no-such-number"}),
    )
    .await;

    expect_failure(status, &body, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn buy_rejects_unknown_user() {
    let state = test_state();
    let number_id = seed_number(&state, "+15550003333", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": "ghost", "numberId": number_id}),
    )
    .await;

    expect_failure(status, &body, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn buy_rejects_sold_number() {
    let state = test_state();
    let first = seed_user(&state, "frank@example.com", "frank").await;
    let second = seed_user(&state, "grace@example.com", "grace").await;
    seed_credits(&state, &first, "1.00").await;
    seed_credits(&state, &second, "1.00").await;
    let number_id = seed_number(&state, "+15550004444", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": first, "numberId": number_id}),
    )
    .await;
    expect_success(status, &body);

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": second, "numberId": number_id}),
    )
    .await;
    expect_failure(status, &body, StatusCode::CONFLICT);
}

#[tokio::test]
async fn buy_charges_positive_client_price() {
    let state = test_state();
    let uid = seed_user(&state, "henry@example.com", "henry").await;
    seed_credits(&state, &uid, "5.00").await;
    let number_id = seed_number(&state, "+15550005555", "1.00").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": uid, "numberId": number_id, "price": "2.50"}),
    )
    .await;

    let data = expect_success(status, &body);
    assert_eq!(dec_field(&data["price"]), dec("2.50"));
    assert_eq!(dec_field(&data["newBalance"]), dec("2.50"));
}

#[tokio::test]
async fn buy_ignores_non_positive_client_price() {
    let state = test_state();
    let uid = seed_user(&state, "iris@example.com", "iris").await;
    seed_credits(&state, &uid, "5.00").await;
    let number_id = seed_number(&state, "+15550006666", "1.00").await;

    let (status, body) = post_json(
        &state,
        "/numbers/buy",
        &json!({"uid": uid, "numberId": number_id, "price": "0"}),
    )
    .await;

    let data = expect_success(status, &body);
    assert_eq!(dec_field(&data["price"]), dec("1.00"));
    assert_eq!(dec_field(&data["newBalance"]), dec("4.00"));
}

#[tokio::test]
async fn bulk_buy_transfers_batch_for_exact_total() {
    let state = test_state();
    let uid = seed_user(&state, "judy@example.com", "judy").await;
    seed_credits(&state, &uid, "1.00").await;
    let first = seed_number(&state, "+15550007001", "0.30").await;
    let second = seed_number(&state, "+15550007002", "0.30").await;
    let third = seed_number(&state, "+15550007003", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({
            "uid": uid,
            "numberIds": [first, second, third],
            "totalPrice": "0.75",
            "quantity": 3
        }),
    )
    .await;

    let data = expect_success(status, &body);
    assert_eq!(data["purchasedCount"], 3);
    assert_eq!(dec_field(&data["totalPrice"]), dec("0.75"));
    assert_eq!(dec_field(&data["newBalance"]), dec("0.25"));

    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    assert_eq!(listed.as_array().expect("listing").len(), 0);

    // Per-number snapshot prices must add up to the charged total exactly.
    let (status, body) = get(&state, &format!("/user/{uid}/numbers")).await;
    let owned = expect_success(status, &body);
    let snapshots = owned["purchasedNumbersData"].as_array().expect("snapshots");
    assert_eq!(snapshots.len(), 3);
    let sum = snapshots.iter().fold(dec("0"), |acc, snapshot| {
        acc + dec_field(&snapshot["price"])
    });
    assert_eq!(sum, dec("0.75"));
}

#[tokio::test]
async fn bulk_buy_rejects_quantity_mismatch() {
    let state = test_state();
    let uid = seed_user(&state, "kate@example.com", "kate").await;
    seed_credits(&state, &uid, "1.00").await;
    let first = seed_number(&state, "+15550008001", "0.30").await;
    let second = seed_number(&state, "+15550008002", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({
            "uid": uid,
            "numberIds": [first, second],
            "totalPrice": "0.60",
            "quantity": 3
        }),
    )
    .await;

    expect_failure(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_buy_rejects_empty_batch() {
    let state = test_state();
    let uid = seed_user(&state, "liam@example.com", "liam").await;

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({"uid": uid, "numberIds": [], "totalPrice": "0.00", "quantity": 0}),
    )
    .await;

    expect_failure(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_buy_rejects_duplicate_ids() {
    let state = test_state();
    let uid = seed_user(&state, "mona@example.com", "mona").await;
    seed_credits(&state, &uid, "1.00").await;
    let number_id = seed_number(&state, "+15550009001", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({
            "uid": uid,
            "numberIds": [number_id.clone(), number_id],
            "totalPrice": "0.60",
            "quantity": 2
        }),
    )
    .await;

    expect_failure(status, &body, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_buy_is_all_or_nothing_when_a_number_is_taken() {
    let state = test_state();
    let buyer = seed_user(&state, "nina@example.com", "nina").await;
    let rival = seed_user(&state, "oscar@example.com", "oscar").await;
    seed_credits(&state, &buyer, "1.00").await;
    seed_credits(&state, &rival, "1.00").await;
    let first = seed_number(&state, "+15550010001", "0.30").await;
    let second = seed_number(&state, "+15550010002", "0.30").await;

    state
        .coordinator
        .purchase_single(&rival, &second, None)
        .await
        .expect("rival purchase");

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({
            "uid": buyer,
            "numberIds": [first, second],
            "totalPrice": "0.60",
            "quantity": 2
        }),
    )
    .await;

    expect_failure(status, &body, StatusCode::CONFLICT);

    // Nothing moved: the untouched number is still for sale and the buyer
    // keeps the full balance with no purchase history.
    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    assert_eq!(listed.as_array().expect("listing").len(), 1);

    let (status, body) = get(&state, &format!("/user/{buyer}")).await;
    let profile = expect_success(status, &body);
    assert_eq!(dec_field(&profile["credits"]), dec("1.00"));
    assert_eq!(profile["purchasedNumbers"], json!([]));
    let recent = profile["recentTransactions"]
        .as_array()
        .expect("transactions");
    assert!(recent.iter().all(|entry| entry["type"] == "credit_added"));
}

#[tokio::test]
async fn bulk_buy_rejects_insufficient_credits() {
    let state = test_state();
    let uid = seed_user(&state, "pete@example.com", "pete").await;
    seed_credits(&state, &uid, "0.50").await;
    let first = seed_number(&state, "+15550011001", "0.30").await;
    let second = seed_number(&state, "+15550011002", "0.30").await;

    let (status, body) = post_json(
        &state,
        "/numbers/bulk-buy",
        &json!({
            "uid": uid,
            "numberIds": [first, second],
            "totalPrice": "0.60",
            "quantity": 2
        }),
    )
    .await;

    expect_failure(status, &body, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn removing_owned_numbers_does_not_restock_inventory() {
    let state = test_state();
    let uid = seed_user(&state, "ruth@example.com", "ruth").await;
    seed_credits(&state, &uid, "1.00").await;
    let number_id = seed_number(&state, "+15550012001", "0.30").await;

    state
        .coordinator
        .purchase_single(&uid, &number_id, None)
        .await
        .expect("purchase");

    let (status, body) = post_json(
        &state,
        "/user/numbers/delete",
        &json!({"uid": uid, "phoneNumbers": ["+15550012001"]}),
    )
    .await;
    expect_success(status, &body);

    let (status, body) = get(&state, &format!("/user/{uid}/numbers")).await;
    let owned = expect_success(status, &body);
    assert_eq!(owned["purchasedNumbers"], json!([]));

    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    assert_eq!(listed.as_array().expect("listing").len(), 0);
}

#[tokio::test]
async fn available_lists_only_unsold_numbers() {
    let state = test_state();
    let uid = seed_user(&state, "sara@example.com", "sara").await;
    seed_credits(&state, &uid, "1.00").await;
    let sold = seed_number(&state, "+15550013001", "0.30").await;
    seed_number(&state, "+15550013002", "0.30").await;

    state
        .coordinator
        .purchase_single(&uid, &sold, None)
        .await
        .expect("purchase");

    let (status, body) = get(&state, "/numbers/available").await;
    let listed = expect_success(status, &body);
    let phones: Vec<&str> = listed
        .as_array()
        .expect("listing")
        .iter()
        .map(|n| n["phoneNumber"].as_str().expect("phone"))
        .collect();
    assert_eq!(phones, vec!["+15550013002"]);
}
