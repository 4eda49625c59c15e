use crate::application::service::CampaignService;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::ports::{AuditCategory, LogDestination};
use crate::domain::status::LifecycleCommand;
use crate::domain::user::User;
use crate::error::{CampaignError, Result};
use chrono::Utc;
use tracing::info;

impl CampaignService {
    /// Approves a pending campaign on behalf of an admin.
    pub async fn approve_campaign(&self, id: CampaignId, actor: &User) -> Result<Campaign> {
        let result = self.transition(id, actor, LifecycleCommand::Approve, None).await;
        self.audited(result).await
    }

    /// Rejects a pending campaign. The reason is required and stored trimmed.
    pub async fn reject_campaign(&self, id: CampaignId, actor: &User, reason: &str) -> Result<Campaign> {
        let result = match reason.trim() {
            "" => Err(CampaignError::BadRequest(
                "Rejection reason is required".to_string(),
            )),
            reason => {
                self.transition(id, actor, LifecycleCommand::Reject, Some(reason))
                    .await
            }
        };
        self.audited(result).await
    }

    /// Puts an approved campaign live.
    pub async fn launch_campaign(&self, id: CampaignId, actor: &User) -> Result<Campaign> {
        let result = self.transition(id, actor, LifecycleCommand::Launch, None).await;
        self.audited(result).await
    }

    /// Closes a live campaign; ended campaigns that missed their goal can be refunded.
    pub async fn end_campaign(&self, id: CampaignId, actor: &User) -> Result<Campaign> {
        let result = self.transition(id, actor, LifecycleCommand::End, None).await;
        self.audited(result).await
    }

    pub async fn cancel_campaign(&self, id: CampaignId, actor: &User) -> Result<Campaign> {
        let result = self.transition(id, actor, LifecycleCommand::Cancel, None).await;
        self.audited(result).await
    }

    async fn transition(
        &self,
        id: CampaignId,
        actor: &User,
        command: LifecycleCommand,
        reason: Option<&str>,
    ) -> Result<Campaign> {
        Self::require_admin(actor)?;
        let mut campaign = self.load(id).await?;
        let from = campaign.status;
        campaign.status = from.transition(command)?;

        let now = Utc::now();
        match command {
            LifecycleCommand::Approve => {
                campaign.approved_by = Some(actor.id);
                campaign.approval_date = Some(now);
            }
            LifecycleCommand::Reject => {
                campaign.rejection_reason = reason.map(str::to_string);
                campaign.approved_by = Some(actor.id);
                campaign.approval_date = Some(now);
            }
            LifecycleCommand::Launch | LifecycleCommand::End | LifecycleCommand::Cancel => {}
        }
        campaign.updated_at = now;

        let saved = self.campaigns.save(campaign).await?;
        info!(campaign = %id, %from, to = %saved.status, admin = %actor.email, "campaign status changed");

        let mut message = format!(
            "Campaign {}: {id} by admin {}",
            saved.status, actor.email
        );
        if let Some(reason) = reason {
            message.push_str(&format!(", reason: {reason}"));
        }
        self.audit(&message, AuditCategory::AdminEvent, LogDestination::Admin)
            .await;

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::ports::AuditCategory;
    use crate::domain::status::CampaignStatus;
    use crate::error::CampaignError;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn test_approve_records_admin_and_audits() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Pending).await;

        let campaign = h.service.approve_campaign(id, &h.admin).await.unwrap();

        assert_eq!(campaign.status, CampaignStatus::Approved);
        assert_eq!(campaign.approved_by, Some(h.admin.id));
        assert!(campaign.approval_date.is_some());
        let entries = h.audit.entries_in(AuditCategory::AdminEvent).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.starts_with("Campaign approved:"));
    }

    #[tokio::test]
    async fn test_reject_trims_reason() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Pending).await;

        let campaign = h
            .service
            .reject_campaign(id, &h.admin, "  missing budget  ")
            .await
            .unwrap();

        assert_eq!(campaign.status, CampaignStatus::Rejected);
        assert_eq!(campaign.rejection_reason.as_deref(), Some("missing budget"));
    }

    #[tokio::test]
    async fn test_non_admin_is_unauthorized() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Pending).await;

        let err = h.service.approve_campaign(id, &h.backer).await.unwrap_err();

        assert!(matches!(err, CampaignError::Unauthorized(_)));
        assert_eq!(err.status_code(), 401);
        assert_eq!(h.audit.entries_in(AuditCategory::ApiError).await.len(), 1);
    }

    #[tokio::test]
    async fn test_launch_requires_approval() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Pending).await;

        let err = h.service.launch_campaign(id, &h.admin).await.unwrap_err();
        assert!(matches!(err, CampaignError::InvalidState(_)));

        h.service.approve_campaign(id, &h.admin).await.unwrap();
        let live = h.service.launch_campaign(id, &h.admin).await.unwrap();
        assert_eq!(live.status, CampaignStatus::Live);
        let ended = h.service.end_campaign(id, &h.admin).await.unwrap();
        assert_eq!(ended.status, CampaignStatus::Ended);
    }
}
