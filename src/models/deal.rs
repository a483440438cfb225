use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub shop_id: i64,
    pub title: String,
    pub description: String,
    /// Total redemptions allowed across all users.
    pub max_purchase_limit: i64,
    /// Redemptions allowed per user.
    pub max_purchase_per_user: i64,
    pub available_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Tombstone; a deleted deal stays fetchable for historical redemptions.
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDeal {
    pub shop_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub max_purchase_limit: i64,
    pub max_purchase_per_user: i64,
    #[serde(default)]
    pub available_until: Option<i64>,
}
