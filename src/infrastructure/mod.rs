//! Storage, processor and audit adapters behind the domain ports.

pub mod audit;
#[cfg(feature = "gateway-http")]
pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod simulated;

use crate::domain::campaign::Campaign;
use crate::domain::pledge::PledgeId;
use crate::error::{CampaignError, Result};

/// Checks `campaign.version` against what is stored and returns the copy to write.
pub(crate) fn next_revision(stored: Option<&Campaign>, mut campaign: Campaign) -> Result<Campaign> {
    if let Some(current) = stored
        && current.version != campaign.version
    {
        return Err(CampaignError::Conflict(format!(
            "Campaign {} was modified concurrently (expected version {}, found {})",
            campaign.id, campaign.version, current.version
        )));
    }
    campaign.version += 1;
    Ok(campaign)
}

/// Applies a conditional refund mark to a stored campaign.
pub(crate) fn refund_pledge_in(
    campaign: &mut Campaign,
    pledge: PledgeId,
    refund_id: &str,
) -> Result<bool> {
    let index = campaign.pledge_index(pledge).ok_or_else(|| {
        CampaignError::NotFound("Backer not found in this campaign".to_string())
    })?;
    if !campaign.apply_refund(index, refund_id) {
        return Ok(false);
    }
    campaign.version += 1;
    campaign.updated_at = chrono::Utc::now();
    Ok(true)
}
