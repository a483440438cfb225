pub mod from_row;
pub mod queries;
pub mod soft_delete;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::notify::Notifier;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub notifier: Notifier,
}

/// Open (or create) the database at `path` and build the connection pool.
///
/// Every pooled connection enables foreign keys and a busy timeout so that
/// concurrent IMMEDIATE transactions queue instead of failing immediately.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA journal_mode = WAL;",
        )
    });
    let pool = r2d2::Pool::new(manager)?;

    let conn = pool.get()?;
    init_schema(&conn)?;

    Ok(pool)
}

/// Create all tables and indexes if they do not exist yet.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            role TEXT NOT NULL,
            current_month_points REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER,
            deleted_cascade_depth INTEGER
        );

        CREATE TABLE IF NOT EXISTS subscription_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            interval TEXT NOT NULL,
            max_collabs INTEGER NOT NULL DEFAULT 1,
            is_active INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            deleted_at INTEGER,
            deleted_cascade_depth INTEGER
        );

        CREATE TABLE IF NOT EXISTS shops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            owner_id TEXT NOT NULL UNIQUE REFERENCES users(id),
            approved INTEGER NOT NULL DEFAULT 1,
            subscription_state TEXT,
            remaining_collabs INTEGER NOT NULL DEFAULT 0
                CHECK (remaining_collabs >= 0),
            monthly_collabs INTEGER NOT NULL DEFAULT 0,
            active_plan_id INTEGER REFERENCES subscription_plans(id),
            plan_activated_at INTEGER,
            subscription_end_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER,
            deleted_cascade_depth INTEGER
        );

        CREATE TABLE IF NOT EXISTS deals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shop_id INTEGER NOT NULL REFERENCES shops(id),
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            max_purchase_limit INTEGER NOT NULL DEFAULT 0,
            max_purchase_per_user INTEGER NOT NULL DEFAULT 0,
            available_until INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER,
            deleted_cascade_depth INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_deals_shop ON deals(shop_id);

        CREATE TABLE IF NOT EXISTS redemptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            coupon_code TEXT NOT NULL UNIQUE,
            deal_id INTEGER NOT NULL REFERENCES deals(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'pending_usage',
            used INTEGER NOT NULL DEFAULT 0,
            used_at INTEGER,
            social_media_link TEXT,
            images TEXT NOT NULL DEFAULT '[]',
            additional_info TEXT,
            total_views INTEGER,
            total_likes INTEGER,
            total_comments INTEGER,
            amount_spent REAL,
            admin_comment TEXT,
            approved INTEGER,
            approved_at INTEGER,
            approved_by TEXT REFERENCES users(id),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER,
            deleted_cascade_depth INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_redemptions_user ON redemptions(user_id);
        CREATE INDEX IF NOT EXISTS idx_redemptions_deal ON redemptions(deal_id);

        CREATE TABLE IF NOT EXISTS point_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id),
            type TEXT NOT NULL,
            points REAL NOT NULL,
            description TEXT,
            redemption_id INTEGER REFERENCES redemptions(id),
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_point_tx_bucket
            ON point_transactions(user_id, year, month);",
    )?;
    Ok(())
}
