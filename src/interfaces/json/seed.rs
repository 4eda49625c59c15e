use crate::domain::campaign::Campaign;
use crate::domain::ports::{CampaignStore, UserDirectory};
use crate::domain::user::User;
use crate::error::Result;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Users and campaigns to load into the stores before running a command.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
}

impl SeedFile {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Writes the seed into the stores. Campaigns already stored are left
    /// untouched, so seeding a persistent database twice is harmless.
    pub async fn apply(&self, campaigns: &dyn CampaignStore, users: &dyn UserDirectory) -> Result<usize> {
        for user in &self.users {
            users.store(user.clone()).await?;
        }

        let mut inserted = 0;
        for campaign in &self.campaigns {
            if campaigns.get(campaign.id).await?.is_some() {
                debug!(campaign = %campaign.id, "already stored, skipping seed");
                continue;
            }
            let mut fresh = campaign.clone();
            fresh.version = 0;
            campaigns.save(fresh).await?;
            inserted += 1;
        }

        info!(users = self.users.len(), campaigns = inserted, "seed applied");
        Ok(inserted)
    }
}
