//! Outbound approval-outcome notifications.
//!
//! Delivery is fire-and-forget over a configured webhook. Failures are logged
//! and swallowed; the approval decision is already committed by the time a
//! notification is attempted, and notification failure must never unwind it.

use std::time::Duration;

use serde_json::json;

use crate::models::{ApprovalDecision, Redemption, User};

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url,
        }
    }

    /// No-op notifier for tests and webhook-less deployments.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Tell the redemption's owner how their approval request was decided.
    pub async fn approval_outcome(
        &self,
        user: &User,
        redemption: &Redemption,
        decision: ApprovalDecision,
    ) {
        let Some(url) = &self.webhook_url else {
            tracing::info!(
                user_id = %user.id,
                redemption_id = redemption.id,
                decision = decision.as_ref(),
                "approval outcome (webhook disabled)"
            );
            return;
        };

        let payload = json!({
            "event": "redemption_decision",
            "user_id": user.id,
            "email": user.email,
            "redemption_id": redemption.id,
            "decision": decision.as_ref(),
            "admin_comment": redemption.admin_comment,
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(
                    redemption_id = redemption.id,
                    decision = decision.as_ref(),
                    "approval outcome notification delivered"
                );
            }
            Ok(resp) => {
                tracing::warn!(
                    redemption_id = redemption.id,
                    status = %resp.status(),
                    "approval outcome notification rejected by webhook"
                );
            }
            Err(e) => {
                tracing::warn!(
                    redemption_id = redemption.id,
                    error = %e,
                    "failed to deliver approval outcome notification"
                );
            }
        }
    }
}
