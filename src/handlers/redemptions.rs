//! Redemption lifecycle endpoints.
//!
//! Users create, submit evidence for, and cancel their own redemptions; shop
//! owners consume coupons and list activity against their deals; admins close
//! pending approvals and rescind coupons.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::middleware::AuthContext;
use crate::models::{
    COUPON_MASK, CloseRedemption, CreateRedemption, Redemption, RedemptionWithDeal, SubmitEvidence,
};
use crate::util::Pagination;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_redemption))
        .route("/user", get(list_my_redemptions))
        .route("/shop", get(list_shop_redemptions))
        .route("/coupon/{code}", get(get_by_coupon))
        .route("/approve/{id}", patch(approve_redemption))
        .route("/use/{code}", patch(use_redemption))
        .route("/cancel/{id}", patch(cancel_redemption))
        .route(
            "/{id}",
            get(get_redemption)
                .patch(submit_evidence)
                .delete(rescind_redemption),
        )
}

async fn create_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CreateRedemption>,
) -> Result<Json<Redemption>> {
    let mut conn = state.db.get()?;
    let redemption = queries::create_redemption_atomic(&mut conn, &body, ctx.uid())?;
    Ok(Json(redemption))
}

async fn list_my_redemptions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<RedemptionWithDeal>>> {
    let conn = state.db.get()?;
    let redemptions =
        queries::list_redemptions_for_user(&conn, ctx.uid(), page.take, page.skip)?;
    let mut out = Vec::with_capacity(redemptions.len());
    for r in redemptions {
        out.push(queries::with_deal(&conn, r)?);
    }
    Ok(Json(out))
}

/// Activity against the acting owner's shop. Coupon codes are masked: the
/// shop learns a code only when the influencer presents it in person.
async fn list_shop_redemptions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<RedemptionWithDeal>>> {
    let conn = state.db.get()?;
    let redemptions =
        queries::list_redemptions_for_shop_owner(&conn, ctx.uid(), page.take, page.skip)?;
    let mut out = Vec::with_capacity(redemptions.len());
    for r in redemptions {
        let mut with_deal = queries::with_deal(&conn, r)?;
        with_deal.redemption.coupon_code = COUPON_MASK.to_string();
        out.push(with_deal);
    }
    Ok(Json(out))
}

async fn get_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<RedemptionWithDeal>> {
    let conn = state.db.get()?;
    let redemption = queries::get_redemption(&conn, id, true)?
        .filter(|r| ctx.user.role.is_admin() || r.user_id == ctx.uid())
        .ok_or_else(|| AppError::NotFound("Redemption not found".into()))?;
    Ok(Json(queries::with_deal(&conn, redemption)?))
}

async fn get_by_coupon(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(code): Path<String>,
) -> Result<Json<RedemptionWithDeal>> {
    let conn = state.db.get()?;
    let redemption = queries::get_redemption_by_coupon(&conn, &code, true)?
        .filter(|r| ctx.user.role.is_admin() || r.user_id == ctx.uid())
        .ok_or_else(|| AppError::NotFound("Redemption not found".into()))?;
    Ok(Json(queries::with_deal(&conn, redemption)?))
}

async fn submit_evidence(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<SubmitEvidence>,
) -> Result<Json<Redemption>> {
    let mut conn = state.db.get()?;
    let redemption = queries::submit_evidence(&mut conn, id, ctx.uid(), &body)?;
    Ok(Json(redemption))
}

async fn approve_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(body): Json<CloseRedemption>,
) -> Result<Json<Redemption>> {
    ctx.require_admin()?;

    let decision = body.status;
    let mut conn = state.db.get()?;
    let redemption = queries::close_redemption(&mut conn, id, ctx.uid(), &body)?;

    // Notification delivery happens after commit and off the request path.
    if let Some(owner) = queries::get_user_by_id(&conn, &redemption.user_id)? {
        let notifier = state.notifier.clone();
        let notified = redemption.clone();
        tokio::spawn(async move {
            notifier.approval_outcome(&owner, &notified, decision).await;
        });
    }

    Ok(Json(redemption))
}

async fn use_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(code): Path<String>,
) -> Result<Json<Redemption>> {
    let mut conn = state.db.get()?;
    let redemption = queries::use_redemption(&mut conn, &code, ctx.uid())?;
    Ok(Json(redemption))
}

async fn cancel_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Redemption>> {
    let mut conn = state.db.get()?;
    let redemption = queries::cancel_redemption(&mut conn, id, ctx.uid())?;
    Ok(Json(redemption))
}

async fn rescind_redemption(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_admin()?;

    let conn = state.db.get()?;
    if !queries::rescind_redemption(&conn, id)? {
        return Err(AppError::NotFound("Redemption not found".into()));
    }
    Ok(Json(serde_json::json!({ "rescinded": true })))
}
