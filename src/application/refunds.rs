//! Bulk and single-pledge refunds.
//!
//! Each successful gateway refund is committed right away through
//! [`CampaignStore::mark_pledge_refunded`], which only flips a pledge that is
//! still unrefunded. A crash mid-batch therefore loses at most the pledge in
//! flight, and a concurrent manual refund cannot be overwritten by a stale copy
//! of the campaign.
//!
//! [`CampaignStore::mark_pledge_refunded`]: crate::domain::ports::CampaignStore::mark_pledge_refunded

use crate::application::service::CampaignService;
use crate::domain::campaign::CampaignId;
use crate::domain::money::Amount;
use crate::domain::payment::RefundReason;
use crate::domain::pledge::{Pledge, PledgeId};
use crate::domain::ports::{AuditCategory, LogDestination, PledgeUpdate};
use crate::domain::status::CampaignStatus;
use crate::domain::user::{BackerSummary, User, UserId};
use crate::error::{CampaignError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Success,
    Failed,
}

/// Outcome of one pledge within a bulk refund.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundAttemptResult {
    pub pledge: PledgeId,
    pub backer: BackerSummary,
    pub amount: Amount,
    pub status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefundAttemptResult {
    fn success(pledge: &Pledge, backer: BackerSummary, refund_id: String) -> Self {
        Self {
            pledge: pledge.id,
            backer,
            amount: pledge.amount,
            status: RefundStatus::Success,
            refund_id: Some(refund_id),
            error: None,
        }
    }

    fn failed(pledge: &Pledge, backer: BackerSummary, error: String) -> Self {
        Self {
            pledge: pledge.id,
            backer,
            amount: pledge.amount,
            status: RefundStatus::Failed,
            refund_id: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRefundReport {
    pub campaign: CampaignId,
    pub results: Vec<RefundAttemptResult>,
    pub succeeded: usize,
    pub failed: usize,
    /// Pledges left alone because they were already refunded.
    pub skipped: usize,
}

impl BulkRefundReport {
    fn new(campaign: CampaignId) -> Self {
        Self {
            campaign,
            results: Vec::new(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn push(&mut self, result: RefundAttemptResult) {
        match result.status {
            RefundStatus::Success => self.succeeded += 1,
            RefundStatus::Failed => self.failed += 1,
        }
        self.results.push(result);
    }

    pub fn summary(&self) -> String {
        format!(
            "Refunds processed. {} successful, {} failed.",
            self.succeeded, self.failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualRefundReceipt {
    pub refund_id: String,
    pub user: BackerSummary,
    pub amount: Amount,
    pub pledge_date: DateTime<Utc>,
}

impl CampaignService {
    /// Refunds every unrefunded pledge of an ended campaign that missed its goal.
    ///
    /// A gateway failure on one pledge is captured in its result and the batch
    /// carries on; pledges already refunded are skipped, so re-running the batch
    /// only retries the failures.
    pub async fn refund_campaign(&self, id: CampaignId, actor: &User) -> Result<BulkRefundReport> {
        let result = self.refund_all(id, actor).await;
        self.audited(result).await
    }

    /// Refunds one pledge regardless of campaign status.
    ///
    /// Gateway failures abort with [`CampaignError::Gateway`] and leave the
    /// pledge unrefunded so the caller can retry.
    pub async fn refund_pledge(
        &self,
        id: CampaignId,
        pledge_id: PledgeId,
        actor: &User,
        reason: &str,
    ) -> Result<ManualRefundReceipt> {
        let result = self.refund_one(id, pledge_id, actor, reason).await;
        self.audited(result).await
    }

    async fn refund_all(&self, id: CampaignId, actor: &User) -> Result<BulkRefundReport> {
        Self::require_admin(actor)?;
        let campaign = self.load(id).await?;

        if campaign.status != CampaignStatus::Ended {
            return Err(CampaignError::InvalidState(
                "Only ended campaigns can be refunded".to_string(),
            ));
        }
        if campaign.is_successful() {
            return Err(CampaignError::InvalidState(
                "Successful campaigns don't require refunds".to_string(),
            ));
        }

        let mut report = BulkRefundReport::new(id);
        let mut backers: HashMap<UserId, BackerSummary> = HashMap::new();
        for pledge in &campaign.backers {
            if pledge.refunded {
                report.skipped += 1;
                continue;
            }
            let backer = match backers.get(&pledge.user) {
                Some(summary) => summary.clone(),
                None => {
                    let summary = self.backer_summary(pledge.user).await;
                    backers.insert(pledge.user, summary.clone());
                    summary
                }
            };
            let result = self.refund_in_batch(id, pledge, backer).await;
            report.push(result);
        }

        info!(
            campaign = %id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "bulk refund finished"
        );
        Ok(report)
    }

    async fn refund_in_batch(
        &self,
        id: CampaignId,
        pledge: &Pledge,
        backer: BackerSummary,
    ) -> RefundAttemptResult {
        let who = backer
            .email
            .clone()
            .unwrap_or_else(|| backer.id.to_string());

        let outcome = match self
            .gateway
            .refund(id, pledge, RefundReason::RequestedByCustomer)
            .await
        {
            Ok(receipt) => match self
                .campaigns
                .mark_pledge_refunded(id, pledge.id, &receipt.refund_id)
                .await
            {
                Ok(PledgeUpdate::Applied(_)) => Ok(receipt.refund_id),
                Ok(PledgeUpdate::AlreadyRefunded) => {
                    warn!(
                        campaign = %id,
                        pledge = %pledge.id,
                        refund_id = %receipt.refund_id,
                        "pledge was refunded concurrently; gateway refund is a duplicate"
                    );
                    Err(format!(
                        "Pledge already refunded; duplicate gateway refund {}",
                        receipt.refund_id
                    ))
                }
                Err(e) => {
                    error!(
                        campaign = %id,
                        pledge = %pledge.id,
                        refund_id = %receipt.refund_id,
                        error = %e,
                        "gateway refund succeeded but could not be recorded"
                    );
                    Err(format!(
                        "Refund {} succeeded but was not recorded: {e}",
                        receipt.refund_id
                    ))
                }
            },
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(refund_id) => {
                self.audit(
                    &format!(
                        "Refund processed for backer {who} in campaign {id}, amount: {}",
                        pledge.amount
                    ),
                    AuditCategory::RefundEvent,
                    LogDestination::Payments,
                )
                .await;
                RefundAttemptResult::success(pledge, backer, refund_id)
            }
            Err(message) => {
                self.audit(
                    &format!(
                        "Refund failed for backer {who} in campaign {id}, amount: {}, error: {message}",
                        pledge.amount
                    ),
                    AuditCategory::RefundError,
                    LogDestination::Payments,
                )
                .await;
                RefundAttemptResult::failed(pledge, backer, message)
            }
        }
    }

    async fn refund_one(
        &self,
        id: CampaignId,
        pledge_id: PledgeId,
        actor: &User,
        reason: &str,
    ) -> Result<ManualRefundReceipt> {
        Self::require_admin(actor)?;
        let campaign = self.load(id).await?;

        let index = campaign.pledge_index(pledge_id).ok_or_else(|| {
            CampaignError::NotFound("Backer not found in this campaign".to_string())
        })?;
        let pledge = &campaign.backers[index];
        if pledge.refunded {
            return Err(CampaignError::BadRequest(
                "Pledge already refunded".to_string(),
            ));
        }

        let user = self
            .users
            .get(pledge.user)
            .await?
            .ok_or_else(|| CampaignError::NotFound("Backing user not found".to_string()))?;

        let receipt = match self
            .gateway
            .refund(id, pledge, RefundReason::from_note(reason))
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.audit(
                    &format!("Manual refund failed for backer ID {pledge_id} in campaign {id}, error: {e}"),
                    AuditCategory::ManualRefundError,
                    LogDestination::Payments,
                )
                .await;
                return Err(e.into());
            }
        };

        match self
            .campaigns
            .mark_pledge_refunded(id, pledge_id, &receipt.refund_id)
            .await
        {
            Ok(PledgeUpdate::Applied(_)) => {}
            Ok(PledgeUpdate::AlreadyRefunded) => {
                warn!(
                    campaign = %id,
                    pledge = %pledge_id,
                    refund_id = %receipt.refund_id,
                    "pledge was refunded concurrently; gateway refund is a duplicate"
                );
                self.audit(
                    &format!(
                        "Manual refund for backer ID {pledge_id} in campaign {id} raced another refund; duplicate gateway refund {}",
                        receipt.refund_id
                    ),
                    AuditCategory::ManualRefundError,
                    LogDestination::Payments,
                )
                .await;
                return Err(CampaignError::BadRequest(
                    "Pledge already refunded".to_string(),
                ));
            }
            Err(e) => {
                error!(
                    campaign = %id,
                    pledge = %pledge_id,
                    refund_id = %receipt.refund_id,
                    error = %e,
                    "gateway refund succeeded but could not be recorded"
                );
                return Err(e);
            }
        }

        self.audit(
            &format!(
                "Manual refund processed for backer {} in campaign {id}, amount: {}, reason: {reason}",
                user.email, pledge.amount
            ),
            AuditCategory::ManualRefundEvent,
            LogDestination::Payments,
        )
        .await;
        info!(campaign = %id, pledge = %pledge_id, refund_id = %receipt.refund_id, "manual refund processed");

        Ok(ManualRefundReceipt {
            refund_id: receipt.refund_id,
            user: BackerSummary::from(&user),
            amount: pledge.amount,
            pledge_date: pledge.pledge_date,
        })
    }
}
