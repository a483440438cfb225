//! Points ledger endpoints: personal totals, transaction history, the
//! leaderboard, and admin adjustments.

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::middleware::AuthContext;
use crate::models::{LeaderboardEntry, ManualAdjustment, PointTransaction, PointTransactionType};
use crate::util::Pagination;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-points", get(my_points))
        .route("/my-transactions", get(my_transactions))
        .route("/my-monthly-points", get(my_monthly_points))
        .route("/leaderboard", get(leaderboard))
        .route("/reset-leaderboard", post(reset_leaderboard))
        .route("/adjust", post(adjust))
}

async fn my_points(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>> {
    let conn = state.db.get()?;
    let points = queries::current_month_points(&conn, ctx.uid())?;
    Ok(Json(json!({ "points": points })))
}

async fn my_transactions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<PointTransaction>>> {
    let conn = state.db.get()?;
    let transactions =
        queries::list_point_transactions(&conn, ctx.uid(), page.take, page.skip)?;
    Ok(Json(transactions))
}

#[derive(Deserialize)]
struct MonthQuery {
    month: i32,
    year: i32,
}

/// Ledger total for an explicit month, independent of any leaderboard reset.
async fn my_monthly_points(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(q): Query<MonthQuery>,
) -> Result<Json<Value>> {
    let conn = state.db.get()?;
    let points = queries::monthly_points(&conn, ctx.uid(), q.month, q.year)?;
    Ok(Json(json!({ "month": q.month, "year": q.year, "points": points })))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::leaderboard(&conn, page.take)?))
}

async fn reset_leaderboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Value>> {
    ctx.require_admin()?;

    let conn = state.db.get()?;
    let reset = queries::reset_leaderboard(&conn)?;
    tracing::info!(users_reset = reset, "leaderboard reset");
    Ok(Json(json!({ "reset": reset })))
}

async fn adjust(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<ManualAdjustment>,
) -> Result<Json<PointTransaction>> {
    ctx.require_admin()?;

    let conn = state.db.get()?;
    let tx = queries::credit_points(
        &conn,
        &body.user_id,
        PointTransactionType::ManualAdjustment,
        body.points,
        body.description.as_deref(),
        None,
    )?;
    Ok(Json(tx))
}
