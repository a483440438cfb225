use chrono::{Datelike, Utc};
use rusqlite::{Connection, TransactionBehavior, params, types::Value};

use crate::coupon::{COUPON_INSERT_ATTEMPTS, generate_coupon_code};
use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    DEAL_COLS, PLAN_COLS, POINT_TX_COLS, REDEMPTION_COLS, SHOP_COLS, USER_COLS, query_all,
    query_one,
};
use super::soft_delete;

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query for efficiency.
struct UpdateBuilder {
    table: &'static str,
    id: Value,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: impl Into<Value>) -> Self {
        Self {
            table,
            id: id.into(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id);
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

/// Create a user record for a uid supplied by the identity provider.
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let now = now();

    conn.execute(
        "INSERT INTO users (id, name, email, role, current_month_points, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        params![&input.id, &input.name, &input.email, input.role.as_ref(), now],
    )?;

    Ok(User {
        id: input.id.clone(),
        name: input.name.clone(),
        email: input.email.clone(),
        role: input.role,
        current_month_points: 0.0,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL",
            USER_COLS
        ),
        &[&id],
    )
}

// ============ Subscription Plans ============

pub fn create_subscription_plan(
    conn: &Connection,
    input: &CreateSubscriptionPlan,
) -> Result<SubscriptionPlan> {
    let now = now();

    conn.execute(
        "INSERT INTO subscription_plans (name, amount, interval, max_collabs, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &input.name,
            input.amount,
            &input.interval,
            input.max_collabs,
            input.is_active,
            now
        ],
    )?;

    Ok(SubscriptionPlan {
        id: conn.last_insert_rowid(),
        name: input.name.clone(),
        amount: input.amount,
        interval: input.interval.clone(),
        max_collabs: input.max_collabs,
        is_active: input.is_active,
        created_at: now,
    })
}

pub fn get_subscription_plan(conn: &Connection, id: i64) -> Result<Option<SubscriptionPlan>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM subscription_plans WHERE id = ?1 AND deleted_at IS NULL",
            PLAN_COLS
        ),
        params![id],
    )
}

// ============ Shops & Quota Ledger ============
//
// `remaining_collabs` is the shop's metered allowance of redemptions. It is
// mutated only here (plan application, collab grants, subscription teardown)
// and by the redemption create/cancel transactions below. Approval, rejection
// and usage never touch it.

pub fn create_shop(conn: &Connection, input: &CreateShop) -> Result<Shop> {
    let now = now();

    conn.execute(
        "INSERT INTO shops (name, owner_id, approved, remaining_collabs, monthly_collabs,
                            created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
        params![&input.name, &input.owner_id, input.approved, now],
    )?;

    Ok(Shop {
        id: conn.last_insert_rowid(),
        name: input.name.clone(),
        owner_id: input.owner_id.clone(),
        approved: input.approved,
        subscription_state: None,
        remaining_collabs: 0,
        monthly_collabs: 0,
        active_plan_id: None,
        plan_activated_at: None,
        subscription_end_at: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_shop_by_id(conn: &Connection, id: i64) -> Result<Option<Shop>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM shops WHERE id = ?1 AND deleted_at IS NULL",
            SHOP_COLS
        ),
        params![id],
    )
}

pub fn get_shop_by_owner(conn: &Connection, owner_id: &str) -> Result<Option<Shop>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM shops WHERE owner_id = ?1 AND deleted_at IS NULL",
            SHOP_COLS
        ),
        &[&owner_id],
    )
}

/// Apply a subscription plan to a shop.
///
/// Resets the quota: `remaining_collabs = monthly_collabs = plan.max_collabs`.
/// `months` controls how far out the subscription end is pushed.
pub fn apply_subscription_plan(
    conn: &Connection,
    shop_id: i64,
    plan: &SubscriptionPlan,
    months: u32,
) -> Result<Shop> {
    let now = Utc::now();
    let end_at = now.timestamp() + (months as i64) * 30 * 86400;

    let updated = UpdateBuilder::new("shops", shop_id)
        .with_updated_at()
        .set("subscription_state", SubscriptionState::Active.as_ref().to_string())
        .set("active_plan_id", plan.id)
        .set("monthly_collabs", plan.max_collabs)
        .set("remaining_collabs", plan.max_collabs)
        .set("plan_activated_at", now.timestamp())
        .set("subscription_end_at", end_at)
        .execute(conn)?;

    if !updated {
        return Err(AppError::NotFound("Shop not found".into()));
    }

    get_shop_by_id(conn, shop_id)?.ok_or_else(|| AppError::NotFound("Shop not found".into()))
}

/// Grant extra collab slots to a shop on top of its plan quota.
pub fn add_collabs(conn: &Connection, shop_id: i64, collabs: i64) -> Result<Shop> {
    let affected = conn.execute(
        "UPDATE shops SET remaining_collabs = remaining_collabs + ?1, updated_at = ?2
         WHERE id = ?3 AND deleted_at IS NULL",
        params![collabs, now(), shop_id],
    )?;

    if affected == 0 {
        return Err(AppError::NotFound("Shop not found".into()));
    }

    get_shop_by_id(conn, shop_id)?.ok_or_else(|| AppError::NotFound("Shop not found".into()))
}

/// Record a subscription state change reported by the payment collaborator.
/// Touches only the state column; quota changes ride on plan application.
pub fn set_subscription_state(
    conn: &Connection,
    shop_id: i64,
    state: SubscriptionState,
) -> Result<bool> {
    UpdateBuilder::new("shops", shop_id)
        .with_updated_at()
        .set("subscription_state", state.as_ref().to_string())
        .execute(conn)
}

/// Tear down a shop's subscription: plan cleared, quota zeroed.
pub fn cancel_shop_subscription(conn: &Connection, shop_id: i64) -> Result<Shop> {
    let affected = conn.execute(
        "UPDATE shops SET subscription_state = ?1, active_plan_id = NULL,
                plan_activated_at = NULL, subscription_end_at = NULL,
                remaining_collabs = 0, monthly_collabs = 0, updated_at = ?2
         WHERE id = ?3 AND deleted_at IS NULL",
        params![SubscriptionState::Canceled.as_ref(), now(), shop_id],
    )?;

    if affected == 0 {
        return Err(AppError::NotFound("Shop not found".into()));
    }

    get_shop_by_id(conn, shop_id)?.ok_or_else(|| AppError::NotFound("Shop not found".into()))
}

/// Soft-delete a shop, cascading the tombstone to its deals. Redemptions are
/// deliberately not cascaded: historical records must stay readable.
pub fn delete_shop(conn: &Connection, id: i64) -> Result<bool> {
    let result = soft_delete::soft_delete_entity(conn, "shops", id)?;
    if result.deleted {
        soft_delete::cascade_delete_direct(conn, "deals", "shop_id", id, result.deleted_at, 1)?;
    }
    Ok(result.deleted)
}

pub fn restore_shop(conn: &Connection, id: i64, deleted_at: i64) -> Result<bool> {
    let restored = soft_delete::restore_entity(conn, "shops", id)?;
    if restored > 0 {
        soft_delete::restore_cascaded_direct(conn, "deals", "shop_id", id, deleted_at)?;
    }
    Ok(restored > 0)
}

// ============ Deals ============

pub fn create_deal(conn: &Connection, input: &CreateDeal) -> Result<Deal> {
    let now = now();

    conn.execute(
        "INSERT INTO deals (shop_id, title, description, max_purchase_limit,
                            max_purchase_per_user, available_until, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            input.shop_id,
            &input.title,
            &input.description,
            input.max_purchase_limit,
            input.max_purchase_per_user,
            input.available_until,
            now
        ],
    )?;

    Ok(Deal {
        id: conn.last_insert_rowid(),
        shop_id: input.shop_id,
        title: input.title.clone(),
        description: input.description.clone(),
        max_purchase_limit: input.max_purchase_limit,
        max_purchase_per_user: input.max_purchase_per_user,
        available_until: input.available_until,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

pub fn get_deal(conn: &Connection, id: i64) -> Result<Option<Deal>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM deals WHERE id = ?1 AND deleted_at IS NULL",
            DEAL_COLS
        ),
        params![id],
    )
}

/// Explicit include-deleted fetch, used to backfill the deal reference on
/// historical redemptions after the deal itself was tombstoned.
pub fn get_deal_any(conn: &Connection, id: i64) -> Result<Option<Deal>> {
    query_one(
        conn,
        &format!("SELECT {} FROM deals WHERE id = ?1", DEAL_COLS),
        params![id],
    )
}

pub fn delete_deal(conn: &Connection, id: i64) -> Result<bool> {
    Ok(soft_delete::soft_delete_entity(conn, "deals", id)?.deleted)
}

// ============ Eligibility Evaluator ============

const NO_SLOTS_REMAINING: &str = "No slots remaining for this deal's shop.";
const OPEN_DEAL_CONFLICT: &str = "You already have an open deal. Complete or cancel it first.";
const LIMIT_REACHED: &str = "Redemption limit reached for this deal.";

/// Decide whether `user_id` may create a new redemption of `deal`.
///
/// Read-only; rules run in order and the first failure wins:
/// 1. the deal's shop has collab slots remaining;
/// 2. the user has no open redemption (any status except canceled/approved)
///    across all deals;
/// 3. the user's non-canceled count for this deal is below the per-user cap;
/// 4. the deal's total non-canceled count is below the overall cap.
///
/// Callers that go on to create must run this inside the same IMMEDIATE
/// transaction as the insert and quota decrement; evaluation on its own
/// proves nothing once the snapshot is released.
pub fn check_redeemable(conn: &Connection, deal: &Deal, user_id: &str) -> Result<()> {
    let remaining: i64 = conn.query_row(
        "SELECT remaining_collabs FROM shops WHERE id = ?1",
        params![deal.shop_id],
        |row| row.get(0),
    )?;
    if remaining <= 0 {
        return Err(AppError::EligibilityDenied(NO_SLOTS_REMAINING.into()));
    }

    let open_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM redemptions
         WHERE user_id = ?1 AND deleted_at IS NULL
           AND status NOT IN ('canceled', 'approved')",
        params![user_id],
        |row| row.get(0),
    )?;
    if open_count > 0 {
        return Err(AppError::EligibilityDenied(OPEN_DEAL_CONFLICT.into()));
    }

    let user_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM redemptions
         WHERE deal_id = ?1 AND user_id = ?2 AND deleted_at IS NULL
           AND status != 'canceled'",
        params![deal.id, user_id],
        |row| row.get(0),
    )?;
    if user_count >= deal.max_purchase_per_user {
        return Err(AppError::EligibilityDenied(LIMIT_REACHED.into()));
    }

    let total_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM redemptions
         WHERE deal_id = ?1 AND deleted_at IS NULL AND status != 'canceled'",
        params![deal.id],
        |row| row.get(0),
    )?;
    if total_count >= deal.max_purchase_limit {
        return Err(AppError::EligibilityDenied(LIMIT_REACHED.into()));
    }

    Ok(())
}

// ============ Redemptions ============

fn get_redemption_inner(
    conn: &Connection,
    id: i64,
    include_deleted: bool,
) -> Result<Option<Redemption>> {
    let filter = if include_deleted {
        ""
    } else {
        " AND deleted_at IS NULL"
    };
    query_one(
        conn,
        &format!(
            "SELECT {} FROM redemptions WHERE id = ?1{}",
            REDEMPTION_COLS, filter
        ),
        params![id],
    )
}

pub fn get_redemption(conn: &Connection, id: i64, include_deleted: bool) -> Result<Option<Redemption>> {
    get_redemption_inner(conn, id, include_deleted)
}

pub fn get_redemption_by_coupon(
    conn: &Connection,
    coupon_code: &str,
    include_deleted: bool,
) -> Result<Option<Redemption>> {
    let filter = if include_deleted {
        ""
    } else {
        " AND deleted_at IS NULL"
    };
    query_one(
        conn,
        &format!(
            "SELECT {} FROM redemptions WHERE coupon_code = ?1{}",
            REDEMPTION_COLS, filter
        ),
        &[&coupon_code],
    )
}

/// Attach deal metadata to a redemption, backfilling through the deal's
/// tombstone so historical records keep their context.
pub fn with_deal(conn: &Connection, redemption: Redemption) -> Result<RedemptionWithDeal> {
    let deal = get_deal_any(conn, redemption.deal_id)?;
    Ok(RedemptionWithDeal { redemption, deal })
}

pub fn list_redemptions_for_user(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Redemption>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM redemptions
             WHERE user_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            REDEMPTION_COLS
        ),
        params![user_id, limit, offset],
    )
}

/// Redemptions against any deal belonging to the acting owner's shop.
/// The coupon code is masked at the handler layer before leaving the API.
pub fn list_redemptions_for_shop_owner(
    conn: &Connection,
    owner_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Redemption>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM redemptions
             WHERE deleted_at IS NULL
               AND deal_id IN (SELECT id FROM deals WHERE shop_id IN
                   (SELECT id FROM shops WHERE owner_id = ?1))
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            REDEMPTION_COLS
        ),
        params![owner_id, limit, offset],
    )
}

/// Create a redemption: eligibility check, coupon issuance, record insert and
/// shop quota decrement as one atomic unit.
///
/// Uses an IMMEDIATE transaction so the write lock is held from the first
/// read. Two concurrent creates against a shop with one slot left serialize
/// here; the loser re-reads a zero quota and gets the eligibility denial.
/// The guarded decrement (`remaining_collabs > 0`) means a negative quota is
/// never observable regardless.
pub fn create_redemption_atomic(
    conn: &mut Connection,
    input: &CreateRedemption,
    user_id: &str,
) -> Result<Redemption> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let user = get_user_by_id(&tx, user_id)?;
    if user.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    let deal = get_deal(&tx, input.deal_id)?
        .ok_or_else(|| AppError::NotFound("Deal not found".into()))?;

    check_redeemable(&tx, &deal, user_id)?;

    // The actual compare-and-swap. check_redeemable already saw a positive
    // quota under this transaction's lock, so a zero here is unreachable,
    // but the guard keeps the counter non-negative no matter what.
    let charged = tx.execute(
        "UPDATE shops SET remaining_collabs = remaining_collabs - 1, updated_at = ?1
         WHERE id = ?2 AND remaining_collabs > 0",
        params![now(), deal.shop_id],
    )?;
    if charged == 0 {
        return Err(AppError::EligibilityDenied(NO_SLOTS_REMAINING.into()));
    }

    // Coupon codes carry a unique constraint; a collision retries the insert
    // with a fresh code rather than ever overwriting.
    let created_at = now();
    let mut redemption_id = None;
    for _ in 0..COUPON_INSERT_ATTEMPTS {
        let code = generate_coupon_code();
        let inserted = tx.execute(
            "INSERT INTO redemptions (coupon_code, deal_id, user_id, status,
                                      social_media_link, additional_info, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                &code,
                deal.id,
                user_id,
                RedemptionStatus::PendingUsage.as_ref(),
                &input.social_media_link,
                &input.additional_info,
                created_at
            ],
        );
        match inserted {
            Ok(_) => {
                redemption_id = Some(tx.last_insert_rowid());
                break;
            }
            Err(rusqlite::Error::SqliteFailure(e, Some(ref msg)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.contains("coupon_code") =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    let redemption_id = redemption_id
        .ok_or_else(|| AppError::Internal("Could not issue a unique coupon code".into()))?;

    let redemption = get_redemption_inner(&tx, redemption_id, false)?
        .ok_or_else(|| AppError::Internal("Redemption vanished during creation".into()))?;

    tx.commit()?;
    Ok(redemption)
}

/// Submit (or re-submit) evidence for approval.
///
/// Owner-scoped lookup: a wrong `user_id` is indistinguishable from a missing
/// record. New images are appended to the existing list, and the deal
/// reference is immutable regardless of what the caller sends.
pub fn submit_evidence(
    conn: &mut Connection,
    id: i64,
    user_id: &str,
    input: &SubmitEvidence,
) -> Result<Redemption> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let redemption: Redemption = query_one(
        &tx,
        &format!(
            "SELECT {} FROM redemptions WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            REDEMPTION_COLS
        ),
        params![id, user_id],
    )?
    .ok_or_else(|| AppError::NotFound("Redemption not found".into()))?;

    if !redemption.status.allows_evidence() {
        return Err(AppError::InvalidTransition(
            "You are not allowed to request approval for this coupon.".into(),
        ));
    }

    let mut images = redemption.images.clone();
    images.extend(input.images.iter().cloned());
    let images_json = serde_json::to_string(&images)
        .map_err(|e| AppError::Internal(format!("failed to encode image list: {}", e)))?;

    UpdateBuilder::new("redemptions", id)
        .with_updated_at()
        .set("status", RedemptionStatus::PendingApproval.as_ref().to_string())
        .set("images", images_json)
        .set_opt("social_media_link", input.social_media_link.clone())
        .set_opt("additional_info", input.additional_info.clone())
        .set_opt("total_views", input.total_views)
        .set_opt("total_likes", input.total_likes)
        .set_opt("total_comments", input.total_comments)
        .set_opt("amount_spent", input.amount_spent)
        .execute(&tx)?;

    let updated = get_redemption_inner(&tx, id, false)?
        .ok_or_else(|| AppError::Internal("Redemption vanished during update".into()))?;

    tx.commit()?;
    Ok(updated)
}

/// Close a pending redemption with an approval decision.
///
/// The decision (approved / rejected / re-submission requested) becomes the
/// new status verbatim. On approval the points credit happens inside the same
/// transaction; the outcome notification is the caller's business and stays
/// outside it.
///
/// The approver must exist and hold the admin role. The HTTP layer already
/// rejects non-admin callers, so a failure here is a programming error and is
/// reported as an integrity violation, not a client error.
pub fn close_redemption(
    conn: &mut Connection,
    id: i64,
    approver_id: &str,
    input: &CloseRedemption,
) -> Result<Redemption> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let redemption = get_redemption_inner(&tx, id, false)?
        .ok_or_else(|| AppError::NotFound("Redemption not found".into()))?;

    if redemption.status != RedemptionStatus::PendingApproval {
        return Err(AppError::InvalidTransition(format!(
            "Cannot close a redemption in status '{}'",
            redemption.status.as_ref()
        )));
    }

    let approver = get_user_by_id(&tx, approver_id)?.ok_or_else(|| {
        AppError::Integrity("approval decision recorded without an approving user".into())
    })?;
    if !approver.role.is_admin() {
        return Err(AppError::Integrity(
            "approval decision recorded by a non-admin user".into(),
        ));
    }

    let approved = input.status == ApprovalDecision::Approved;

    UpdateBuilder::new("redemptions", id)
        .with_updated_at()
        .set("status", input.status.status().as_ref().to_string())
        .set("approved", approved)
        .set("approved_at", now())
        .set("approved_by", approver.id.clone())
        .set_opt("admin_comment", input.admin_comment.clone())
        .execute(&tx)?;

    let updated = get_redemption_inner(&tx, id, false)?
        .ok_or_else(|| AppError::Internal("Redemption vanished during close".into()))?;

    if approved {
        let deal = get_deal_any(&tx, updated.deal_id)?;
        let deal_title = deal.as_ref().map(|d| d.title.as_str()).unwrap_or("Unknown");
        credit_collab_points(&tx, &updated, deal_title)?;
    }

    tx.commit()?;
    Ok(updated)
}

/// Mark a coupon as consumed in person by the owning shop.
///
/// A missing coupon and a coupon belonging to someone else's shop produce the
/// identical not-found error, so existence never leaks to other shops.
pub fn use_redemption(
    conn: &mut Connection,
    coupon_code: &str,
    acting_owner_id: &str,
) -> Result<Redemption> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let redemption: Redemption = query_one(
        &tx,
        &format!(
            "SELECT {} FROM redemptions
             WHERE coupon_code = ?1 AND deleted_at IS NULL
               AND deal_id IN (SELECT id FROM deals WHERE shop_id IN
                   (SELECT id FROM shops WHERE owner_id = ?2))",
            REDEMPTION_COLS
        ),
        params![coupon_code, acting_owner_id],
    )?
    .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;

    if redemption.status != RedemptionStatus::PendingUsage {
        return Err(AppError::InvalidTransition(
            "Coupon already used or expired".into(),
        ));
    }

    UpdateBuilder::new("redemptions", redemption.id)
        .with_updated_at()
        .set("status", RedemptionStatus::Used.as_ref().to_string())
        .set("used", true)
        .set("used_at", now())
        .execute(&tx)?;

    let updated = get_redemption_inner(&tx, redemption.id, false)?
        .ok_or_else(|| AppError::Internal("Redemption vanished during use".into()))?;

    tx.commit()?;
    Ok(updated)
}

/// Withdraw a redemption and return its reserved slot to the shop.
///
/// Allowed from any state except the absorbing ones (approved, canceled), so
/// the quota increment can happen at most once per redemption.
pub fn cancel_redemption(conn: &mut Connection, id: i64, user_id: &str) -> Result<Redemption> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let redemption: Redemption = query_one(
        &tx,
        &format!(
            "SELECT {} FROM redemptions WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            REDEMPTION_COLS
        ),
        params![id, user_id],
    )?
    .ok_or_else(|| AppError::NotFound("Redemption not found".into()))?;

    if redemption.status.is_absorbing() {
        return Err(AppError::InvalidTransition(format!(
            "Cannot cancel a redemption in status '{}'",
            redemption.status.as_ref()
        )));
    }

    UpdateBuilder::new("redemptions", id)
        .with_updated_at()
        .set("status", RedemptionStatus::Canceled.as_ref().to_string())
        .execute(&tx)?;

    tx.execute(
        "UPDATE shops SET remaining_collabs = remaining_collabs + 1, updated_at = ?1
         WHERE id = (SELECT shop_id FROM deals WHERE id = ?2)",
        params![now(), redemption.deal_id],
    )?;

    let updated = get_redemption_inner(&tx, id, false)?
        .ok_or_else(|| AppError::Internal("Redemption vanished during cancel".into()))?;

    tx.commit()?;
    Ok(updated)
}

/// Rescind a coupon: tombstone the redemption. The record stays retrievable
/// through the include-deleted read paths.
pub fn rescind_redemption(conn: &Connection, id: i64) -> Result<bool> {
    Ok(soft_delete::soft_delete_entity(conn, "redemptions", id)?.deleted)
}

// ============ Points Ledger ============

/// Append one transaction to the ledger and refresh the user's denormalized
/// current-month total.
///
/// The refresh is a full recompute of the active month/year bucket, not an
/// increment, so it stays correct when credits land out of order or a failed
/// credit is retried later.
pub fn credit_points(
    conn: &Connection,
    user_id: &str,
    r#type: PointTransactionType,
    points: f64,
    description: Option<&str>,
    redemption_id: Option<i64>,
) -> Result<PointTransaction> {
    let now_dt = Utc::now();
    let (month, year) = (now_dt.month() as i32, now_dt.year());
    let created_at = now_dt.timestamp();

    conn.execute(
        "INSERT INTO point_transactions (user_id, type, points, description, redemption_id,
                                         month, year, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user_id,
            r#type.as_ref(),
            points,
            description,
            redemption_id,
            month,
            year,
            created_at
        ],
    )?;
    let id = conn.last_insert_rowid();

    recompute_current_month_points(conn, user_id)?;

    Ok(PointTransaction {
        id,
        user_id: user_id.to_string(),
        r#type,
        points,
        description: description.map(String::from),
        redemption_id,
        month,
        year,
        created_at,
    })
}

/// Credit all point awards earned by an approved redemption: a flat collab
/// completion award plus metric-based bonuses for any metric that is present
/// and positive.
pub fn credit_collab_points(
    conn: &Connection,
    redemption: &Redemption,
    deal_title: &str,
) -> Result<Vec<PointTransaction>> {
    let mut transactions = Vec::new();
    let user_id = &redemption.user_id;

    // 100 points for collab completion
    transactions.push(credit_points(
        conn,
        user_id,
        PointTransactionType::CollabCompletion,
        100.0,
        Some(&format!("Collab completion for deal: {}", deal_title)),
        Some(redemption.id),
    )?);

    // 5 points per currency unit spent
    if let Some(amount) = redemption.amount_spent.filter(|a| *a > 0.0) {
        transactions.push(credit_points(
            conn,
            user_id,
            PointTransactionType::MoneySpent,
            amount * 5.0,
            Some(&format!("Money spent: €{}", amount)),
            Some(redemption.id),
        )?);
    }

    // 0.5 points per view
    if let Some(views) = redemption.total_views.filter(|v| *v > 0) {
        transactions.push(credit_points(
            conn,
            user_id,
            PointTransactionType::Views,
            views as f64 * 0.5,
            Some(&format!("Views: {}", views)),
            Some(redemption.id),
        )?);
    }

    // 1 point per like
    if let Some(likes) = redemption.total_likes.filter(|l| *l > 0) {
        transactions.push(credit_points(
            conn,
            user_id,
            PointTransactionType::Likes,
            likes as f64 * 1.0,
            Some(&format!("Likes: {}", likes)),
            Some(redemption.id),
        )?);
    }

    Ok(transactions)
}

/// Sum of a user's ledger entries for an explicit month/year bucket. Survives
/// leaderboard resets, which only touch the denormalized totals.
pub fn monthly_points(conn: &Connection, user_id: &str, month: i32, year: i32) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM point_transactions
         WHERE user_id = ?1 AND month = ?2 AND year = ?3",
        params![user_id, month, year],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn recompute_current_month_points(conn: &Connection, user_id: &str) -> Result<f64> {
    let now_dt = Utc::now();
    let total = monthly_points(conn, user_id, now_dt.month() as i32, now_dt.year())?;
    conn.execute(
        "UPDATE users SET current_month_points = ?1, updated_at = ?2 WHERE id = ?3",
        params![total, now_dt.timestamp(), user_id],
    )?;
    Ok(total)
}

pub fn current_month_points(conn: &Connection, user_id: &str) -> Result<f64> {
    let points: f64 = conn.query_row(
        "SELECT current_month_points FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(points)
}

pub fn list_point_transactions(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<PointTransaction>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM point_transactions
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            POINT_TX_COLS
        ),
        params![user_id, limit, offset],
    )
}

/// Users ranked by denormalized current-month total, above-zero only.
pub fn leaderboard(conn: &Connection, limit: i64) -> Result<Vec<LeaderboardEntry>> {
    query_all(
        conn,
        "SELECT id, name, current_month_points FROM users
         WHERE current_month_points > 0 AND deleted_at IS NULL
         ORDER BY current_month_points DESC LIMIT ?1",
        params![limit],
    )
}

/// Zero the denormalized totals of everyone currently above zero. The ledger
/// itself is untouched; historical month totals remain queryable.
pub fn reset_leaderboard(conn: &Connection) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE users SET current_month_points = 0, updated_at = ?1
         WHERE current_month_points > 0",
        params![now()],
    )?;
    Ok(affected)
}
