//! Shared fixtures for integration tests.
//!
//! Each test gets its own database file in a temp directory; the pool hands
//! out real connections so concurrency behavior matches production.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use collabmarket::db::{self, AppState, DbPool, queries};
use collabmarket::models::*;
use collabmarket::notify::Notifier;

pub struct TestDb {
    pub pool: DbPool,
    _dir: TempDir,
}

pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let pool = db::create_pool(path.to_str().unwrap()).unwrap();
    TestDb { pool, _dir: dir }
}

pub fn test_state(pool: DbPool) -> AppState {
    AppState {
        db: pool,
        notifier: Notifier::disabled(),
    }
}

pub fn test_app(pool: DbPool) -> Router {
    collabmarket::handlers::app(test_state(pool))
}

// ============ Fixtures ============

pub fn create_test_user(conn: &Connection, id: &str, role: UserRole) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            id: id.to_string(),
            name: format!("Test {}", id),
            email: Some(format!("{}@example.com", id)),
            role,
        },
    )
    .unwrap()
}

/// Shop with its own fresh owner (owner ids are unique per shop).
pub fn create_test_shop(conn: &Connection, owner_id: &str) -> Shop {
    create_test_user(conn, owner_id, UserRole::ShopOwner);
    queries::create_shop(
        conn,
        &CreateShop {
            name: format!("Shop of {}", owner_id),
            owner_id: owner_id.to_string(),
            approved: true,
        },
    )
    .unwrap()
}

pub fn create_test_deal(
    conn: &Connection,
    shop_id: i64,
    max_purchase_limit: i64,
    max_purchase_per_user: i64,
) -> Deal {
    queries::create_deal(
        conn,
        &CreateDeal {
            shop_id,
            title: "Free coffee for a story".to_string(),
            description: "Post a story, get a coffee".to_string(),
            max_purchase_limit,
            max_purchase_per_user,
            available_until: None,
        },
    )
    .unwrap()
}

pub fn create_test_plan(conn: &Connection, max_collabs: i64) -> SubscriptionPlan {
    queries::create_subscription_plan(
        conn,
        &CreateSubscriptionPlan {
            name: "Starter".to_string(),
            amount: 29.0,
            interval: "month".to_string(),
            max_collabs,
            is_active: true,
        },
    )
    .unwrap()
}

/// Give a shop `n` redeemable collab slots.
pub fn seed_quota(conn: &Connection, shop_id: i64, n: i64) {
    queries::add_collabs(conn, shop_id, n).unwrap();
}

pub fn remaining_collabs(conn: &Connection, shop_id: i64) -> i64 {
    queries::get_shop_by_id(conn, shop_id)
        .unwrap()
        .unwrap()
        .remaining_collabs
}

/// Standard scene: a shop with quota, one deal, one influencer, one admin.
pub struct Scene {
    pub shop: Shop,
    pub deal: Deal,
    pub user: User,
    pub admin: User,
}

pub fn setup_scene(conn: &Connection) -> Scene {
    let shop = create_test_shop(conn, "owner-1");
    seed_quota(conn, shop.id, 10);
    let deal = create_test_deal(conn, shop.id, 100, 10);
    let user = create_test_user(conn, "influencer-1", UserRole::User);
    let admin = create_test_user(conn, "admin-1", UserRole::Admin);
    Scene {
        shop,
        deal,
        user,
        admin,
    }
}

/// Drive a redemption all the way to approved: use the coupon, submit
/// evidence, close with an approval.
pub fn approve_redemption(
    pool: &DbPool,
    redemption: &Redemption,
    owner_id: &str,
    admin_id: &str,
    evidence: &SubmitEvidence,
) -> Redemption {
    let mut conn = pool.get().unwrap();
    queries::use_redemption(&mut conn, &redemption.coupon_code, owner_id).unwrap();
    queries::submit_evidence(&mut conn, redemption.id, &redemption.user_id, evidence).unwrap();
    queries::close_redemption(
        &mut conn,
        redemption.id,
        admin_id,
        &CloseRedemption {
            status: ApprovalDecision::Approved,
            admin_comment: None,
        },
    )
    .unwrap()
}

// ============ HTTP helpers ============

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    uid: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", uid));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
