//! Reservation store integration tests.
//!
//! These exercise the atomic admission semantics against a real Redis.
//! Run with: docker run -d -p 6379:6379 redis:7-alpine
//! then: cargo test -- --ignored --test-threads=1
//! (single-threaded because rotate_cleanup sweeps shared key patterns)

mod common;

use flashsale_backend::models::purchase::CodePayload;
use flashsale_backend::services::checkout_code;
use flashsale_backend::services::redis_scripts::AdmitStatus;
use flashsale_backend::services::reservation_store::{
    CODE_TTL_SECONDS, INITIAL_STOCK, MAX_ITEMS_PER_USER,
};

use crate::common::{setup_test_store, unique_test_sale_id};

fn test_user() -> String {
    format!("user-{}", uuid::Uuid::new_v4())
}

fn test_payload(user_id: &str, sale_id: i32) -> CodePayload {
    CodePayload {
        user_id: user_id.to_string(),
        sale_id: sale_id.to_string(),
        item_id: "1".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_admit_updates_all_three_counters() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, INITIAL_STOCK, 0).await.unwrap();

    let outcome = store.admit(sale_id, &test_user()).await.unwrap();

    assert_eq!(outcome.status, AdmitStatus::Success);
    assert_eq!(outcome.stock_remaining, INITIAL_STOCK - 1);
    assert_eq!(outcome.user_count, 1);
    assert_eq!(outcome.items_sold, 1);
    assert_eq!(
        store.stock_remaining(sale_id).await.unwrap(),
        Some(INITIAL_STOCK - 1)
    );
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(1));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_admit_enforces_user_cap() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, INITIAL_STOCK, 0).await.unwrap();

    let user = test_user();
    for i in 1..=MAX_ITEMS_PER_USER {
        let outcome = store.admit(sale_id, &user).await.unwrap();
        assert_eq!(outcome.status, AdmitStatus::Success, "admit {i} should pass");
        assert_eq!(outcome.user_count, i);
    }

    // The 11th admission is rejected and mutates nothing
    let rejected = store.admit(sale_id, &user).await.unwrap();
    assert_eq!(rejected.status, AdmitStatus::UserLimit);
    assert_eq!(rejected.user_count, MAX_ITEMS_PER_USER);
    assert_eq!(
        store.stock_remaining(sale_id).await.unwrap(),
        Some(INITIAL_STOCK - MAX_ITEMS_PER_USER)
    );
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_admit_enforces_stock() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, 2, 0).await.unwrap();

    assert_eq!(
        store.admit(sale_id, &test_user()).await.unwrap().status,
        AdmitStatus::Success
    );
    assert_eq!(
        store.admit(sale_id, &test_user()).await.unwrap().status,
        AdmitStatus::Success
    );

    let rejected = store.admit(sale_id, &test_user()).await.unwrap();
    assert_eq!(rejected.status, AdmitStatus::OutOfStock);
    assert_eq!(rejected.stock_remaining, 0);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_concurrent_admits_never_oversell() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    let stock = 50;
    store.init_sale(sale_id, stock, 0).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..200 {
        let store = store.clone();
        let user = test_user();
        handles.push(tokio::spawn(async move {
            store.admit(sale_id, &user).await.unwrap().status
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AdmitStatus::Success => successes += 1,
            AdmitStatus::OutOfStock => rejections += 1,
            other => panic!("unexpected status {other:?}"),
        }
    }

    assert_eq!(successes, stock);
    assert_eq!(rejections, 200 - stock);
    assert_eq!(store.stock_remaining(sale_id).await.unwrap(), Some(0));
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(stock));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_take_code_has_exactly_one_winner() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    let code = checkout_code::generate_code();
    store
        .set_code(&code, &test_payload("u1", sale_id), CODE_TTL_SECONDS)
        .await
        .unwrap();

    let first = {
        let store = store.clone();
        let code = code.clone();
        tokio::spawn(async move { store.take_code(&code).await.unwrap() })
    };
    let second = {
        let store = store.clone();
        let code = code.clone();
        tokio::spawn(async move { store.take_code(&code).await.unwrap() })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_some()).count();
    assert_eq!(winners, 1, "exactly one concurrent redeemer may win");

    // The code is gone for everyone afterwards
    assert_eq!(store.take_code(&code).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_take_code_on_missing_code_returns_none() {
    let store = setup_test_store().await;
    assert_eq!(store.take_code("NOSUCHCODE123456").await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_code_expires_after_ttl() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    let code = checkout_code::generate_code();
    store
        .set_code(&code, &test_payload("u1", sale_id), 1)
        .await
        .unwrap();

    assert!(store.get_code(&code).await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    assert_eq!(store.get_code(&code).await.unwrap(), None);
    assert_eq!(store.take_code(&code).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_rotation_clears_user_counts_and_codes() {
    let store = setup_test_store().await;
    let first_sale = unique_test_sale_id();
    store.init_sale(first_sale, INITIAL_STOCK, 0).await.unwrap();

    let user = test_user();
    for _ in 0..3 {
        store.admit(first_sale, &user).await.unwrap();
    }
    let code = checkout_code::generate_code();
    store
        .set_code(&code, &test_payload(&user, first_sale), CODE_TTL_SECONDS)
        .await
        .unwrap();

    // Rotate to a fresh sale and sweep the prior per-user state
    let second_sale = unique_test_sale_id();
    store.init_sale(second_sale, INITIAL_STOCK, 0).await.unwrap();
    store.rotate_cleanup().await.unwrap();

    assert_eq!(store.get_code(&code).await.unwrap(), None);

    // The prior user count must not leak into the new sale
    let outcome = store.admit(second_sale, &user).await.unwrap();
    assert_eq!(outcome.status, AdmitStatus::Success);
    assert_eq!(outcome.user_count, 1);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_rollback_restores_counters_and_clamps_at_zero() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, 5, 0).await.unwrap();

    let user = test_user();
    store.admit(sale_id, &user).await.unwrap();
    store.rollback(sale_id, &user).await.unwrap();

    assert_eq!(store.stock_remaining(sale_id).await.unwrap(), Some(5));
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(0));

    // A second rollback clamps the consumed counters but not the stock
    store.rollback(sale_id, &user).await.unwrap();
    assert_eq!(store.stock_remaining(sale_id).await.unwrap(), Some(6));
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(0));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_reap_expired_restores_counters_like_rollback() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, 5, 0).await.unwrap();

    let user = test_user();
    store.admit(sale_id, &user).await.unwrap();
    store.reap_expired(sale_id, &user).await.unwrap();

    assert_eq!(store.stock_remaining(sale_id).await.unwrap(), Some(5));
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(0));

    // The reaped slot is free again for the same user
    let outcome = store.admit(sale_id, &user).await.unwrap();
    assert_eq!(outcome.status, AdmitStatus::Success);
    assert_eq!(outcome.user_count, 1);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_init_sale_moves_active_pointer() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();
    store.init_sale(sale_id, INITIAL_STOCK, 0).await.unwrap();

    assert_eq!(store.active_sale_id().await.unwrap(), Some(sale_id));
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_restored_sale_keeps_sold_count() {
    let store = setup_test_store().await;
    let sale_id = unique_test_sale_id();

    // Mid-hour restore after a crash: 40 items were already admitted
    store.init_sale(sale_id, INITIAL_STOCK - 40, 40).await.unwrap();

    assert_eq!(
        store.stock_remaining(sale_id).await.unwrap(),
        Some(INITIAL_STOCK - 40)
    );
    assert_eq!(store.items_sold(sale_id).await.unwrap(), Some(40));
}
