#![allow(dead_code)]

use campaign_ledger::application::gateway::{GatewayAdapter, GatewayConfig};
use campaign_ledger::application::service::CampaignService;
use campaign_ledger::domain::campaign::{Campaign, CampaignId};
use campaign_ledger::domain::money::{Amount, Balance, to_minor_units};
use campaign_ledger::domain::pledge::{Pledge, PledgeId};
use campaign_ledger::domain::ports::CampaignStore;
use campaign_ledger::domain::status::CampaignStatus;
use campaign_ledger::domain::user::{Role, User, UserId};
use campaign_ledger::infrastructure::audit::MemoryAuditLog;
use campaign_ledger::infrastructure::in_memory::{InMemoryCampaignStore, InMemoryUserDirectory};
use campaign_ledger::infrastructure::simulated::SimulatedProcessor;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Ids used by `tests/fixtures/seed.json`.
pub mod fixture {
    pub const ADMIN: &str = "0b8e6a58-3cf1-4e35-8d7f-3f1d5c3e9a01";
    pub const BACKER: &str = "5d7e0c2a-8f3b-4c61-a2d4-7b9e1f0c3d22";
    pub const PENDING_CAMPAIGN: &str = "1f2e3d4c-5b6a-4978-8a9b-0c1d2e3f4a50";
    pub const FAILED_CAMPAIGN: &str = "9a4e2c1f-5d2b-4a8e-b7c3-1e0f6d9a8b70";
    pub const OPEN_PLEDGE: &str = "6f1c1a3e-0d1b-4b7e-9d55-2c7f6a0f6b10";
    pub const REFUNDED_PLEDGE: &str = "7a2d2b4f-1e2c-4c8f-8e66-3d8a7b1a7c21";
    pub const SEED: &str = "tests/fixtures/seed.json";
}

pub struct TestApp {
    pub service: CampaignService,
    pub store: InMemoryCampaignStore,
    pub processor: SimulatedProcessor,
    pub audit: MemoryAuditLog,
    pub admin: User,
    pub backer: User,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    pub fn with_config(config: GatewayConfig) -> Self {
        let admin = User::new("Ada Admin", "ada@example.com", Role::Admin);
        let backer = User::new("Ben Backer", "ben@example.com", Role::Backer);
        let store = InMemoryCampaignStore::new();
        let users = InMemoryUserDirectory::with_users([admin.clone(), backer.clone()]);
        let processor = SimulatedProcessor::strict();
        let audit = MemoryAuditLog::new();

        let gateway = GatewayAdapter::new(Box::new(processor.clone()), Arc::new(audit.clone()), config);
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

    pub async fn campaign(&self, status: CampaignStatus, goal: Decimal) -> CampaignId {
        let mut campaign = Campaign::new(
            "Community darkroom",
            UserId::new(),
            Amount::new(goal).unwrap(),
            "photography",
            Utc::now() + Duration::days(14),
        );
        campaign.status = status;
        self.store.save(campaign).await.unwrap().id
    }

    /// Adds a pledge by the test backer; `charge` is registered with the processor
    /// unless it is `None`.
    pub async fn pledge(&self, id: CampaignId, amount: Decimal, charge: Option<&str>) -> PledgeId {
        let mut pledge = Pledge::new(self.backer.id, Amount::new(amount).unwrap());
        if let Some(charge) = charge {
            pledge = pledge.with_transaction(charge);
            self.processor
                .register_charge(charge, to_minor_units(amount).unwrap())
                .await;
        }
        let pledge_id = pledge.id;
        self.edit(id, |c| c.add_pledge(pledge)).await;
        pledge_id
    }

    pub async fn edit(&self, id: CampaignId, change: impl FnOnce(&mut Campaign)) {
        let mut campaign = self.store.get(id).await.unwrap().unwrap();
        change(&mut campaign);
        self.store.save(campaign).await.unwrap();
    }

    pub async fn stored(&self, id: CampaignId) -> Campaign {
        self.store.get(id).await.unwrap().unwrap()
    }
}

pub fn balance(value: Decimal) -> Balance {
    Balance::new(value)
}
