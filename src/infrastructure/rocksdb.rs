use super::{next_revision, refund_pledge_in};
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::pledge::PledgeId;
use crate::domain::ports::{CampaignStore, PledgeUpdate, UserDirectory};
use crate::domain::user::{User, UserId};
use crate::error::{CampaignError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing campaign documents.
pub const CF_CAMPAIGNS: &str = "campaigns";
/// Column Family for storing user identities.
pub const CF_USERS: &str = "users";

/// A persistent store implementation using RocksDB.
///
/// Campaigns and users live in separate Column Families as JSON documents
/// keyed by their UUID bytes. RocksDB has no compare-and-swap, so every
/// read-modify-write (the version check in `save`, the conditional pledge
/// update) runs under one async write lock.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("campaigns" and "users") exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_campaigns = ColumnFamilyDescriptor::new(CF_CAMPAIGNS, Options::default());
        let cf_users = ColumnFamilyDescriptor::new(CF_USERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_campaigns, cf_users])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(&cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(&cf, key, bytes)?;
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| CampaignError::Storage(format!("{name} column family not found")))
    }
}

#[async_trait]
impl CampaignStore for RocksDBStore {
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.read(CF_CAMPAIGNS, id.0.as_bytes())
    }

    async fn save(&self, campaign: Campaign) -> Result<Campaign> {
        let _guard = self.write_lock.lock().await;
        let stored: Option<Campaign> = self.read(CF_CAMPAIGNS, campaign.id.0.as_bytes())?;
        let next = next_revision(stored.as_ref(), campaign)?;
        self.write(CF_CAMPAIGNS, next.id.0.as_bytes(), &next)?;
        Ok(next)
    }

    async fn mark_pledge_refunded(
        &self,
        id: CampaignId,
        pledge: PledgeId,
        refund_id: &str,
    ) -> Result<PledgeUpdate> {
        let _guard = self.write_lock.lock().await;
        let mut campaign: Campaign = self
            .read(CF_CAMPAIGNS, id.0.as_bytes())?
            .ok_or_else(|| CampaignError::NotFound("Campaign not found".to_string()))?;
        if !refund_pledge_in(&mut campaign, pledge, refund_id)? {
            return Ok(PledgeUpdate::AlreadyRefunded);
        }
        self.write(CF_CAMPAIGNS, id.0.as_bytes(), &campaign)?;
        Ok(PledgeUpdate::Applied(campaign))
    }

    async fn all(&self) -> Result<Vec<Campaign>> {
        let handle = self.cf(CF_CAMPAIGNS)?;

        let mut campaigns = Vec::new();
        let iter = self.db.iterator_cf(handle, rocksdb::IteratorMode::Start);

        for item in iter {
            let (_key, value) = item?;
            let campaign: Campaign = serde_json::from_slice(&value)?;
            campaigns.push(campaign);
        }
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(campaigns)
    }
}

#[async_trait]
impl UserDirectory for RocksDBStore {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        self.read(CF_USERS, id.0.as_bytes())
    }

    async fn store(&self, user: User) -> Result<()> {
        self.write(CF_USERS, user.id.0.as_bytes(), &user)
    }
}
