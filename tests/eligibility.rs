//! Eligibility rules for redemption creation: quota, the one-open-deal rule,
//! and the per-user / per-deal caps, in that order.

mod common;

use collabmarket::db::queries;
use collabmarket::error::AppError;
use collabmarket::models::*;
use common::*;

fn create(pool: &collabmarket::db::DbPool, deal_id: i64, user_id: &str) -> collabmarket::Result<Redemption> {
    let mut conn = pool.get().unwrap();
    queries::create_redemption_atomic(
        &mut conn,
        &CreateRedemption {
            deal_id,
            social_media_link: None,
            additional_info: None,
        },
        user_id,
    )
}

#[test]
fn denied_when_shop_has_no_slots() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let shop = create_test_shop(&conn, "owner-1");
    let deal = create_test_deal(&conn, shop.id, 100, 10);
    create_test_user(&conn, "influencer-1", UserRole::User);
    drop(conn);

    let err = create(&db.pool, deal.id, "influencer-1").unwrap_err();
    match err {
        AppError::EligibilityDenied(msg) => assert!(msg.contains("No slots remaining")),
        other => panic!("expected eligibility denial, got {:?}", other),
    }
}

#[test]
fn denied_while_another_redemption_is_open() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let scene = setup_scene(&conn);
    // A second deal at a second shop: the open-deal rule is global.
    let shop2 = create_test_shop(&conn, "owner-2");
    seed_quota(&conn, shop2.id, 10);
    let deal2 = create_test_deal(&conn, shop2.id, 100, 10);
    drop(conn);

    create(&db.pool, scene.deal.id, &scene.user.id).unwrap();

    let err = create(&db.pool, deal2.id, &scene.user.id).unwrap_err();
    match err {
        AppError::EligibilityDenied(msg) => assert!(msg.contains("open deal")),
        other => panic!("expected eligibility denial, got {:?}", other),
    }
}

#[test]
fn canceled_redemption_does_not_block_a_new_one() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let scene = setup_scene(&conn);
    drop(conn);

    let first = create(&db.pool, scene.deal.id, &scene.user.id).unwrap();
    let mut conn = db.pool.get().unwrap();
    queries::cancel_redemption(&mut conn, first.id, &scene.user.id).unwrap();
    drop(conn);

    create(&db.pool, scene.deal.id, &scene.user.id).unwrap();
}

#[test]
fn per_user_cap_counts_completed_redemptions() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let shop = create_test_shop(&conn, "owner-1");
    seed_quota(&conn, shop.id, 10);
    let deal = create_test_deal(&conn, shop.id, 100, 1);
    let user = create_test_user(&conn, "influencer-1", UserRole::User);
    create_test_user(&conn, "admin-1", UserRole::Admin);
    drop(conn);

    let first = create(&db.pool, deal.id, &user.id).unwrap();
    approve_redemption(
        &db.pool,
        &first,
        "owner-1",
        "admin-1",
        &SubmitEvidence::default(),
    );

    // Approved is no longer "open", so only the per-user cap can block now.
    let err = create(&db.pool, deal.id, &user.id).unwrap_err();
    match err {
        AppError::EligibilityDenied(msg) => assert!(msg.contains("limit reached")),
        other => panic!("expected eligibility denial, got {:?}", other),
    }
}

#[test]
fn deal_wide_cap_blocks_other_users() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let shop = create_test_shop(&conn, "owner-1");
    seed_quota(&conn, shop.id, 10);
    let deal = create_test_deal(&conn, shop.id, 1, 5);
    create_test_user(&conn, "influencer-1", UserRole::User);
    create_test_user(&conn, "influencer-2", UserRole::User);
    drop(conn);

    create(&db.pool, deal.id, "influencer-1").unwrap();

    let err = create(&db.pool, deal.id, "influencer-2").unwrap_err();
    match err {
        AppError::EligibilityDenied(msg) => assert!(msg.contains("limit reached")),
        other => panic!("expected eligibility denial, got {:?}", other),
    }
}

#[test]
fn quota_rule_wins_over_open_deal_rule() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let scene = setup_scene(&conn);
    drop(conn);

    create(&db.pool, scene.deal.id, &scene.user.id).unwrap();

    // Exhaust the shop's remaining quota so rule 1 fires before rule 2.
    let conn = db.pool.get().unwrap();
    let remaining = remaining_collabs(&conn, scene.shop.id);
    conn.execute(
        "UPDATE shops SET remaining_collabs = 0 WHERE id = ?1",
        rusqlite::params![scene.shop.id],
    )
    .unwrap();
    assert!(remaining > 0);
    drop(conn);

    let err = create(&db.pool, scene.deal.id, &scene.user.id).unwrap_err();
    match err {
        AppError::EligibilityDenied(msg) => assert!(msg.contains("No slots remaining")),
        other => panic!("expected eligibility denial, got {:?}", other),
    }
}

#[test]
fn missing_deal_and_missing_user_are_not_found() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let scene = setup_scene(&conn);
    drop(conn);

    let err = create(&db.pool, 9999, &scene.user.id).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = create(&db.pool, scene.deal.id, "nobody").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn soft_deleted_deal_is_not_redeemable() {
    let db = test_db();
    let conn = db.pool.get().unwrap();
    let scene = setup_scene(&conn);
    queries::delete_deal(&conn, scene.deal.id).unwrap();
    drop(conn);

    let err = create(&db.pool, scene.deal.id, &scene.user.id).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
