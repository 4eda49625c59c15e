use crate::application::gateway::GatewayAdapter;
use crate::application::record_best_effort;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::ports::{
    AuditCategory, AuditLogRef, CampaignStoreBox, LogDestination, UserDirectoryBox,
};
use crate::domain::user::{BackerSummary, User, UserId};
use crate::error::{CampaignError, Result};
use tracing::warn;

/// Entry point for every campaign operation.
///
/// Owns the storage ports, the gateway adapter and the audit sink. Each
/// request loads the campaign it needs, works on an owned copy, and commits
/// it back through the store's optimistic or per-pledge conditional writes.
pub struct CampaignService {
    pub(crate) campaigns: CampaignStoreBox,
    pub(crate) users: UserDirectoryBox,
    pub(crate) gateway: GatewayAdapter,
    pub(crate) audit: AuditLogRef,
}

impl CampaignService {
    /// Creates a new `CampaignService`.
    ///
    /// # Arguments
    ///
    /// * `campaigns` - The campaign document store.
    /// * `users` - Read access to user identities.
    /// * `gateway` - Adapter around the payment processor.
    /// * `audit` - Audit sink, shared with the gateway adapter.
    pub fn new(
        campaigns: CampaignStoreBox,
        users: UserDirectoryBox,
        gateway: GatewayAdapter,
        audit: AuditLogRef,
    ) -> Self {
        Self {
            campaigns,
            users,
            gateway,
            audit,
        }
    }

    /// Fetches a campaign by id.
    pub async fn campaign(&self, id: CampaignId) -> Result<Campaign> {
        let result = self.load(id).await;
        self.audited(result).await
    }

    pub async fn campaigns(&self) -> Result<Vec<Campaign>> {
        self.campaigns.all().await
    }

    pub async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.users.get(id).await
    }

    pub(crate) async fn load(&self, id: CampaignId) -> Result<Campaign> {
        self.campaigns
            .get(id)
            .await?
            .ok_or_else(|| CampaignError::NotFound("Campaign not found".to_string()))
    }

    pub(crate) fn require_admin(actor: &User) -> Result<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(CampaignError::Unauthorized(format!(
                "User {} is not authorized to perform this action",
                actor.email
            )))
        }
    }

    /// Best-effort identity lookup for reporting; never fails the caller.
    pub(crate) async fn backer_summary(&self, user: UserId) -> BackerSummary {
        match self.users.get(user).await {
            Ok(Some(u)) => BackerSummary::from(&u),
            Ok(None) => BackerSummary::unknown(user),
            Err(e) => {
                warn!(%user, error = %e, "user lookup failed");
                BackerSummary::unknown(user)
            }
        }
    }

    pub(crate) async fn audit(&self, message: &str, category: AuditCategory, destination: LogDestination) {
        record_best_effort(self.audit.as_ref(), message, category, destination).await;
    }

    /// Records a failed operation on the error destination before handing it back.
    pub(crate) async fn audited<T>(&self, result: Result<T>) -> Result<T> {
        let message = result.as_ref().err().map(ToString::to_string);
        if let Some(message) = message {
            self.audit(&message, AuditCategory::ApiError, LogDestination::Errors)
                .await;
        }
        result
    }
}
