//! Row-mapping helpers: a `FromRow` trait per model, shared column lists,
//! and generic `query_one` / `query_all` wrappers.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Params, Row};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    Ok(stmt.query_row(params, T::from_row).optional()?)
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, T::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Parse a TEXT column into an enum, surfacing bad stored values as
/// conversion failures instead of panicking.
fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_text_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Parse a TEXT column holding a JSON string array (evidence image paths).
fn parse_json_strings(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub const USER_COLS: &str =
    "id, name, email, role, current_month_points, created_at, updated_at";

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: parse_text(row, 3)?,
            current_month_points: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

pub const SHOP_COLS: &str = "id, name, owner_id, approved, subscription_state, \
     remaining_collabs, monthly_collabs, active_plan_id, plan_activated_at, \
     subscription_end_at, created_at, updated_at";

impl FromRow for Shop {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Shop {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_id: row.get(2)?,
            approved: row.get(3)?,
            subscription_state: parse_text_opt(row, 4)?,
            remaining_collabs: row.get(5)?,
            monthly_collabs: row.get(6)?,
            active_plan_id: row.get(7)?,
            plan_activated_at: row.get(8)?,
            subscription_end_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

pub const PLAN_COLS: &str = "id, name, amount, interval, max_collabs, is_active, created_at";

impl FromRow for SubscriptionPlan {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SubscriptionPlan {
            id: row.get(0)?,
            name: row.get(1)?,
            amount: row.get(2)?,
            interval: row.get(3)?,
            max_collabs: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

pub const DEAL_COLS: &str = "id, shop_id, title, description, max_purchase_limit, \
     max_purchase_per_user, available_until, created_at, updated_at, deleted_at";

impl FromRow for Deal {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Deal {
            id: row.get(0)?,
            shop_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            max_purchase_limit: row.get(4)?,
            max_purchase_per_user: row.get(5)?,
            available_until: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            deleted_at: row.get(9)?,
        })
    }
}

pub const REDEMPTION_COLS: &str = "id, coupon_code, deal_id, user_id, status, used, used_at, \
     social_media_link, images, additional_info, total_views, total_likes, total_comments, \
     amount_spent, admin_comment, approved, approved_at, approved_by, created_at, updated_at, \
     deleted_at";

impl FromRow for Redemption {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Redemption {
            id: row.get(0)?,
            coupon_code: row.get(1)?,
            deal_id: row.get(2)?,
            user_id: row.get(3)?,
            status: parse_text(row, 4)?,
            used: row.get(5)?,
            used_at: row.get(6)?,
            social_media_link: row.get(7)?,
            images: parse_json_strings(row, 8)?,
            additional_info: row.get(9)?,
            total_views: row.get(10)?,
            total_likes: row.get(11)?,
            total_comments: row.get(12)?,
            amount_spent: row.get(13)?,
            admin_comment: row.get(14)?,
            approved: row.get(15)?,
            approved_at: row.get(16)?,
            approved_by: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
            deleted_at: row.get(20)?,
        })
    }
}

pub const POINT_TX_COLS: &str =
    "id, user_id, type, points, description, redemption_id, month, year, created_at";

impl FromRow for PointTransaction {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PointTransaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            r#type: parse_text(row, 2)?,
            points: row.get(3)?,
            description: row.get(4)?,
            redemption_id: row.get(5)?,
            month: row.get(6)?,
            year: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for LeaderboardEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(LeaderboardEntry {
            user_id: row.get(0)?,
            name: row.get(1)?,
            points: row.get(2)?,
        })
    }
}
