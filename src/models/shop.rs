use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Subscription lifecycle state as reported by the payment collaborator.
/// Stored verbatim; the quota ledger only cares about plan application events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Paused,
    Trialing,
    Unpaid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub owner_id: String,
    pub approved: bool,
    pub subscription_state: Option<SubscriptionState>,
    /// Redeemable collab slots left under the active plan. Charged at
    /// redemption creation, returned on cancellation. Never negative.
    pub remaining_collabs: i64,
    /// Quota granted by the active plan; reset on each plan application.
    pub monthly_collabs: i64,
    pub active_plan_id: Option<i64>,
    pub plan_activated_at: Option<i64>,
    pub subscription_end_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateShop {
    pub name: String,
    pub owner_id: String,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}
