//! Subscription and quota administration.
//!
//! Payment processing itself lives with an external collaborator; these
//! endpoints record its outcomes: a plan granted to a shop, extra collab
//! slots, a state change, or a cancellation.

use axum::{
    Extension, Json, Router,
    extract::State,
    routing::post,
};
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::middleware::AuthContext;
use crate::models::{Shop, SubscriptionState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/provide", post(provide_subscription))
        .route("/add-collabs", post(add_collabs))
        .route("/sync-state", post(sync_state))
        .route("/cancel", post(cancel_subscription))
}

#[derive(Deserialize)]
struct ProvideSubscription {
    shop_id: i64,
    plan_id: i64,
    #[serde(default = "default_months")]
    months: u32,
}

fn default_months() -> u32 {
    1
}

/// Grant a plan to a shop, resetting its collab quota to the plan allowance.
async fn provide_subscription(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<ProvideSubscription>,
) -> Result<Json<Shop>> {
    ctx.require_admin()?;

    let conn = state.db.get()?;
    let plan = queries::get_subscription_plan(&conn, body.plan_id)?
        .ok_or_else(|| AppError::NotFound("Subscription plan not found".into()))?;
    if !plan.is_active {
        return Err(AppError::BadRequest("Subscription plan is not active".into()));
    }

    let shop = queries::apply_subscription_plan(&conn, body.shop_id, &plan, body.months)?;
    Ok(Json(shop))
}

#[derive(Deserialize)]
struct AddCollabs {
    shop_id: i64,
    collabs: i64,
}

async fn add_collabs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<AddCollabs>,
) -> Result<Json<Shop>> {
    ctx.require_admin()?;

    if body.collabs <= 0 {
        return Err(AppError::BadRequest("collabs must be positive".into()));
    }

    let conn = state.db.get()?;
    let shop = queries::add_collabs(&conn, body.shop_id, body.collabs)?;
    Ok(Json(shop))
}

#[derive(Deserialize)]
struct SyncState {
    shop_id: i64,
    state: SubscriptionState,
}

/// Record a subscription state reported by the payment collaborator.
async fn sync_state(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<SyncState>,
) -> Result<Json<serde_json::Value>> {
    ctx.require_admin()?;

    let conn = state.db.get()?;
    if !queries::set_subscription_state(&conn, body.shop_id, body.state)? {
        return Err(AppError::NotFound("Shop not found".into()));
    }
    Ok(Json(serde_json::json!({ "synced": true })))
}

#[derive(Deserialize)]
struct CancelSubscription {
    /// Admins may cancel on behalf of any shop; owners only their own.
    #[serde(default)]
    shop_id: Option<i64>,
}

async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<CancelSubscription>,
) -> Result<Json<Shop>> {
    let conn = state.db.get()?;

    let shop_id = match body.shop_id {
        Some(id) if ctx.user.role.is_admin() => id,
        _ => {
            queries::get_shop_by_owner(&conn, ctx.uid())?
                .ok_or_else(|| AppError::NotFound("Shop not found".into()))?
                .id
        }
    };

    let shop = queries::cancel_shop_subscription(&conn, shop_id)?;
    Ok(Json(shop))
}
