use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::pledge::{Pledge, PledgeId};
use crate::domain::ports::{CampaignStore, PledgeUpdate, TransactionLookup, UserDirectory};
use crate::domain::user::{User, UserId};
use super::{next_revision, refund_pledge_in};
use crate::error::{CampaignError, GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory campaign store.
///
/// Uses `Arc<RwLock<HashMap<CampaignId, Campaign>>>`; the write lock makes the
/// version check in `save` and the conditional pledge update atomic.
#[derive(Default, Clone)]
pub struct InMemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<CampaignId, Campaign>>>,
}

impl InMemoryCampaignStore {
    /// Creates a new, empty in-memory campaign store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn save(&self, campaign: Campaign) -> Result<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let next = next_revision(campaigns.get(&campaign.id), campaign)?;
        campaigns.insert(next.id, next.clone());
        Ok(next)
    }

    async fn mark_pledge_refunded(
        &self,
        id: CampaignId,
        pledge: PledgeId,
        refund_id: &str,
    ) -> Result<PledgeUpdate> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or_else(|| CampaignError::NotFound("Campaign not found".to_string()))?;
        if refund_pledge_in(campaign, pledge, refund_id)? {
            Ok(PledgeUpdate::Applied(campaign.clone()))
        } else {
            Ok(PledgeUpdate::AlreadyRefunded)
        }
    }

    async fn all(&self) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut all: Vec<Campaign> = campaigns.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

/// A thread-safe in-memory user directory.
#[derive(Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory that already knows `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn store(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
        Ok(())
    }
}

/// Payment records keyed by pledge, consulted when a pledge lost its charge id.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRecords {
    charges: Arc<RwLock<HashMap<PledgeId, String>>>,
}

impl InMemoryPaymentRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pledge: PledgeId, charge_id: impl Into<String>) {
        self.charges.write().await.insert(pledge, charge_id.into());
    }
}

#[async_trait]
impl TransactionLookup for InMemoryPaymentRecords {
    async fn find_charge(
        &self,
        _campaign: CampaignId,
        pledge: &Pledge,
    ) -> std::result::Result<Option<String>, GatewayError> {
        let charges = self.charges.read().await;
        Ok(charges.get(&pledge.id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Balance};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn campaign() -> Campaign {
        Campaign::new(
            "Community garden",
            UserId::new(),
            Amount::new(dec!(500)).unwrap(),
            "community",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_in_memory_campaign_store() {
        let store = InMemoryCampaignStore::new();
        let c = campaign();

        let saved = store.save(c.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        let retrieved = store.get(c.id).await.unwrap().unwrap();
        assert_eq!(retrieved, saved);
        assert!(store.get(CampaignId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let store = InMemoryCampaignStore::new();
        let first = store.save(campaign()).await.unwrap();
        let id = first.id;

        let mut a = first.clone();
        a.title = "A".into();
        let mut b = first;
        b.title = "B".into();

        store.save(a).await.unwrap();
        let err = store.save(b).await.unwrap_err();
        assert!(matches!(err, CampaignError::Conflict(_)));

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "A");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_mark_pledge_refunded_is_conditional() {
        let store = InMemoryCampaignStore::new();
        let mut c = campaign();
        let pledge = Pledge::new(UserId::new(), Amount::new(dec!(40)).unwrap());
        let pledge_id = pledge.id;
        c.add_pledge(pledge);
        let saved = store.save(c).await.unwrap();

        let first = store
            .mark_pledge_refunded(saved.id, pledge_id, "re_1")
            .await
            .unwrap();
        let PledgeUpdate::Applied(updated) = first else {
            panic!("expected the first mark to apply");
        };
        assert_eq!(updated.version, saved.version + 1);
        assert_eq!(updated.amount_raised, Balance::ZERO);

        let second = store
            .mark_pledge_refunded(saved.id, pledge_id, "re_2")
            .await
            .unwrap();
        assert_eq!(second, PledgeUpdate::AlreadyRefunded);

        let missing = store
            .mark_pledge_refunded(saved.id, PledgeId::new(), "re_3")
            .await;
        assert!(matches!(missing, Err(CampaignError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_in_memory_user_directory() {
        let users = InMemoryUserDirectory::new();
        let user = User::new("Ada", "ada@example.com", crate::domain::user::Role::Backer);
        users.store(user.clone()).await.unwrap();
        assert_eq!(users.get(user.id).await.unwrap(), Some(user));
    }
}
