use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    /// Price in whole currency units; billing itself is external.
    pub amount: f64,
    pub interval: String,
    /// Collab quota granted per period when this plan is applied to a shop.
    pub max_collabs: i64,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionPlan {
    pub name: String,
    pub amount: f64,
    pub interval: String,
    pub max_collabs: i64,
    #[serde(default)]
    pub is_active: bool,
}
