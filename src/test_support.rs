//! Shared fixture for the service-level unit tests.

use crate::application::gateway::{GatewayAdapter, GatewayConfig};
use crate::application::service::CampaignService;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::money::{Amount, to_minor_units};
use crate::domain::pledge::{Pledge, PledgeId};
use crate::domain::ports::CampaignStore;
use crate::domain::status::CampaignStatus;
use crate::domain::user::{Role, User, UserId};
use crate::infrastructure::audit::MemoryAuditLog;
use crate::infrastructure::in_memory::{InMemoryCampaignStore, InMemoryUserDirectory};
use crate::infrastructure::simulated::SimulatedProcessor;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub(crate) struct Harness {
    pub service: CampaignService,
    pub store: InMemoryCampaignStore,
    pub processor: SimulatedProcessor,
    pub audit: MemoryAuditLog,
    pub admin: User,
    pub backer: User,
}

impl Harness {
    pub fn new() -> Self {
        let admin = User::new("Ada Admin", "ada@example.com", Role::Admin);
        let backer = User::new("Ben Backer", "ben@example.com", Role::Backer);
        let store = InMemoryCampaignStore::new();
        let users = InMemoryUserDirectory::with_users([admin.clone(), backer.clone()]);
        let processor = SimulatedProcessor::strict();
        let audit = MemoryAuditLog::new();

        let gateway = GatewayAdapter::new(
            Box::new(processor.clone()),
            Arc::new(audit.clone()),
            GatewayConfig::default(),
        );
        let service = CampaignService::new(
            Box::new(store.clone()),
            Box::new(users),
            gateway,
            Arc::new(audit.clone()),
        );

        Self {
            service,
            store,
            processor,
            audit,
            admin,
            backer,
        }
    }

    /// Stores a campaign with a goal of 1000 in the given status.
    pub async fn seed_campaign(&self, status: CampaignStatus) -> CampaignId {
        let mut campaign = Campaign::new(
            "Open hardware synth",
            UserId::new(),
            Amount::new(dec!(1000)).unwrap(),
            "music",
            Utc::now() + Duration::days(30),
        );
        campaign.status = status;
        self.store.save(campaign).await.unwrap().id
    }

    /// Adds a pledge by the harness backer whose charge the processor knows.
    pub async fn add_pledge(&self, id: CampaignId, amount: Decimal, charge_id: &str) -> PledgeId {
        self.pledge_as(id, self.backer.id, amount, charge_id).await
    }

    /// Adds a pledge by a user the directory has never heard of.
    pub async fn add_orphan_pledge(&self, id: CampaignId, amount: Decimal, charge_id: &str) -> PledgeId {
        self.pledge_as(id, UserId::new(), amount, charge_id).await
    }

    pub async fn update(&self, id: CampaignId, change: impl FnOnce(&mut Campaign)) {
        let mut campaign = self.store.get(id).await.unwrap().unwrap();
        change(&mut campaign);
        self.store.save(campaign).await.unwrap();
    }

    async fn pledge_as(&self, id: CampaignId, user: UserId, amount: Decimal, charge_id: &str) -> PledgeId {
        let pledge = Pledge::new(user, Amount::new(amount).unwrap()).with_transaction(charge_id);
        let pledge_id = pledge.id;
        self.processor
            .register_charge(charge_id, to_minor_units(amount).unwrap())
            .await;
        self.update(id, |c| c.add_pledge(pledge)).await;
        pledge_id
    }
}
