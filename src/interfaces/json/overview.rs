use crate::domain::campaign::Campaign;
use crate::domain::money::Balance;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A campaign as printed by `show` and `list`, with its derived figures.
#[derive(Debug, Serialize)]
pub struct CampaignOverview<'a> {
    #[serde(flatten)]
    pub campaign: &'a Campaign,
    pub progress_percentage: Decimal,
    pub days_left: i64,
    pub net_pledged: Balance,
}

impl<'a> CampaignOverview<'a> {
    pub fn new(campaign: &'a Campaign, now: DateTime<Utc>) -> Self {
        Self {
            campaign,
            progress_percentage: campaign.progress_percentage(),
            days_left: campaign.days_left(now),
            net_pledged: campaign.net_pledged(),
        }
    }
}
