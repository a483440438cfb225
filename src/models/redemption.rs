use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::Deal;

/// Placeholder shown to shop owners instead of the real coupon code, so a
/// shop cannot self-serve a coupon before legitimate in-person use.
pub const COUPON_MASK: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RedemptionStatus {
    PendingUsage,
    PendingApproval,
    ReSubmissionRequested,
    Approved,
    Rejected,
    Canceled,
    Used,
}

impl RedemptionStatus {
    /// Open redemptions block a user from starting another one anywhere.
    pub fn is_open(&self) -> bool {
        !matches!(self, RedemptionStatus::Canceled | RedemptionStatus::Approved)
    }

    /// Absorbing states admit no further transitions.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, RedemptionStatus::Canceled | RedemptionStatus::Approved)
    }

    /// States from which the user may submit (or re-submit) evidence.
    pub fn allows_evidence(&self) -> bool {
        matches!(
            self,
            RedemptionStatus::Used
                | RedemptionStatus::ReSubmissionRequested
                | RedemptionStatus::Rejected
        )
    }
}

/// The three decisions an approver can record on a pending redemption,
/// routed through the single close operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    ReSubmissionRequested,
}

impl ApprovalDecision {
    pub fn status(&self) -> RedemptionStatus {
        match self {
            ApprovalDecision::Approved => RedemptionStatus::Approved,
            ApprovalDecision::Rejected => RedemptionStatus::Rejected,
            ApprovalDecision::ReSubmissionRequested => RedemptionStatus::ReSubmissionRequested,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: i64,
    /// Unique external identifier, 8 uppercase hex characters. Generated at
    /// creation, never regenerated.
    pub coupon_code: String,
    pub deal_id: i64,
    pub user_id: String,
    pub status: RedemptionStatus,
    pub used: bool,
    pub used_at: Option<i64>,
    pub social_media_link: Option<String>,
    /// Stored paths of uploaded evidence images. Append-only.
    pub images: Vec<String>,
    pub additional_info: Option<String>,
    pub total_views: Option<i64>,
    pub total_likes: Option<i64>,
    pub total_comments: Option<i64>,
    pub amount_spent: Option<f64>,
    pub admin_comment: Option<String>,
    pub approved: Option<bool>,
    pub approved_at: Option<i64>,
    pub approved_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// A redemption with its deal metadata attached. The deal is fetched with an
/// explicit include-deleted lookup so historical reads survive deal removal.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionWithDeal {
    #[serde(flatten)]
    pub redemption: Redemption,
    pub deal: Option<Deal>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRedemption {
    pub deal_id: i64,
    #[serde(default)]
    pub social_media_link: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Evidence submission body. `deal_id` is accepted for wire compatibility but
/// the stored deal reference is immutable; any attempt to change it is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitEvidence {
    #[serde(default)]
    pub deal_id: Option<i64>,
    #[serde(default)]
    pub social_media_link: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub total_views: Option<i64>,
    #[serde(default)]
    pub total_likes: Option<i64>,
    #[serde(default)]
    pub total_comments: Option<i64>,
    #[serde(default)]
    pub amount_spent: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CloseRedemption {
    pub status: ApprovalDecision,
    #[serde(default)]
    pub admin_comment: Option<String>,
}
