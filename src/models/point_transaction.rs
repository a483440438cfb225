use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PointTransactionType {
    /// Flat award for a completed collab.
    CollabCompletion,
    /// 5 points per currency unit spent.
    MoneySpent,
    /// 0.5 points per view.
    Views,
    /// 1 point per like.
    Likes,
    /// Admin correction. The ledger is append-only, so corrections are new
    /// entries rather than edits.
    ManualAdjustment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: i64,
    pub user_id: String,
    pub r#type: PointTransactionType,
    /// May be fractional (views credit half points).
    pub points: f64,
    pub description: Option<String>,
    pub redemption_id: Option<i64>,
    /// Calendar bucket derived from the credit-time wall clock, 1-12.
    pub month: i32,
    pub year: i32,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ManualAdjustment {
    pub user_id: String,
    pub points: f64,
    #[serde(default)]
    pub description: Option<String>,
}
