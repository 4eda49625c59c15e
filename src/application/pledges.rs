use crate::application::service::CampaignService;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::money::Amount;
use crate::domain::pledge::Pledge;
use crate::domain::status::CampaignStatus;
use crate::domain::user::User;
use crate::error::{CampaignError, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

const MAX_SAVE_ATTEMPTS: usize = 3;

impl CampaignService {
    /// Charges `backer` and records the pledge on a live campaign.
    pub async fn back_campaign(
        &self,
        id: CampaignId,
        backer: &User,
        amount: Amount,
        reward_tier: Option<usize>,
        source_token: &str,
    ) -> Result<Pledge> {
        let result = self
            .pledge(id, backer, amount, reward_tier, source_token)
            .await;
        self.audited(result).await
    }

    async fn pledge(
        &self,
        id: CampaignId,
        backer: &User,
        amount: Amount,
        reward_tier: Option<usize>,
        source_token: &str,
    ) -> Result<Pledge> {
        let campaign = self.load(id).await?;
        check_pledge(&campaign, amount, reward_tier)?;

        let metadata = BTreeMap::from([("user_id".to_string(), backer.id.to_string())]);
        let receipt = self
            .gateway
            .charge(amount, source_token, None, metadata, id)
            .await?;

        // The processor's amount is authoritative.
        let charged = Amount::new(receipt.amount)?;
        let mut pledge = Pledge::new(backer.id, charged).with_transaction(receipt.transaction_id);
        pledge.reward_tier = reward_tier;
        pledge.pledge_date = receipt.created_at;

        self.commit_pledge(campaign, &pledge).await.inspect_err(|e| {
            error!(
                campaign = %id,
                transaction_id = pledge.transaction_id.as_deref().unwrap_or_default(),
                error = %e,
                "charge succeeded but pledge was not recorded"
            );
        })?;

        info!(
            campaign = %id,
            pledge = %pledge.id,
            amount = %charged,
            fee = %receipt.fee,
            "pledge recorded"
        );
        Ok(pledge)
    }

    async fn commit_pledge(&self, mut campaign: Campaign, pledge: &Pledge) -> Result<Campaign> {
        let id = campaign.id;
        let mut attempt = 1;
        loop {
            campaign.add_pledge(pledge.clone());
            campaign.updated_at = Utc::now();
            match self.campaigns.save(campaign).await {
                Err(CampaignError::Conflict(reason)) if attempt < MAX_SAVE_ATTEMPTS => {
                    debug!(campaign = %id, attempt, %reason, "retrying pledge commit");
                    attempt += 1;
                    campaign = self.load(id).await?;
                }
                other => return other,
            }
        }
    }
}

fn check_pledge(campaign: &Campaign, amount: Amount, reward_tier: Option<usize>) -> Result<()> {
    if campaign.status != CampaignStatus::Live {
        return Err(CampaignError::InvalidState(format!(
            "Only live campaigns accept pledges, this one is {}",
            campaign.status
        )));
    }
    let Some(index) = reward_tier else {
        return Ok(());
    };
    let tier = campaign
        .reward_tiers
        .get(index)
        .ok_or_else(|| CampaignError::BadRequest(format!("Reward tier {index} does not exist")))?;
    if tier.is_sold_out() {
        return Err(CampaignError::BadRequest(format!(
            "Reward tier '{}' is sold out",
            tier.title
        )));
    }
    if amount < tier.amount {
        return Err(CampaignError::BadRequest(format!(
            "Pledge must be at least {} for reward tier '{}'",
            tier.amount, tier.title
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::campaign::RewardTier;
    use crate::domain::money::{Balance, from_minor_units};
    use crate::infrastructure::simulated::SimulatedProcessor;
    use crate::test_support::Harness;
    use rust_decimal_macros::dec;

    fn tier(amount: rust_decimal::Decimal, max: Option<u32>) -> RewardTier {
        RewardTier {
            title: "Sticker pack".into(),
            description: "Stickers".into(),
            amount: Amount::new(amount).unwrap(),
            max_backers: max,
            current_backers: 0,
        }
    }

    #[tokio::test]
    async fn test_back_live_campaign() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Live).await;
        h.update(id, |c| c.reward_tiers.push(tier(dec!(20), Some(5)))).await;

        let pledge = h
            .service
            .back_campaign(id, &h.backer, Amount::new(dec!(25)).unwrap(), Some(0), "tok_visa")
            .await
            .unwrap();

        let campaign = h.service.campaign(id).await.unwrap();
        assert_eq!(campaign.amount_raised, Balance::new(dec!(25)));
        assert_eq!(campaign.backer_count, 1);
        assert_eq!(campaign.reward_tiers[0].current_backers, 1);
        assert_eq!(campaign.backers[0].id, pledge.id);
        assert!(pledge.transaction_id.is_some());
        assert_eq!(h.processor.charges().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pledge_records_the_amount_actually_charged() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Live).await;

        let pledge = h
            .service
            .back_campaign(id, &h.backer, Amount::new(dec!(10.005)).unwrap(), None, "tok_visa")
            .await
            .unwrap();

        let charged = h.processor.charges().await[0].amount_minor;
        assert_eq!(charged, 1001);
        assert_eq!(pledge.amount.value(), from_minor_units(charged));
        let campaign = h.service.campaign(id).await.unwrap();
        assert_eq!(campaign.amount_raised, Balance::new(dec!(10.01)));
        assert_eq!(campaign.backers[0].amount.value(), dec!(10.01));
    }

    #[tokio::test]
    async fn test_pending_campaign_rejects_pledges_without_charging() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Pending).await;

        let err = h
            .service
            .back_campaign(id, &h.backer, Amount::new(dec!(25)).unwrap(), None, "tok_visa")
            .await
            .unwrap_err();

        assert!(matches!(err, CampaignError::InvalidState(_)));
        assert!(h.processor.charges().await.is_empty());
    }

    #[tokio::test]
    async fn test_tier_rules() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Live).await;
        h.update(id, |c| {
            c.reward_tiers.push(tier(dec!(50), None));
            c.reward_tiers.push(tier(dec!(5), Some(0)));
        })
        .await;
        let amount = Amount::new(dec!(10)).unwrap();

        for (index, expected) in [(0, "at least"), (1, "sold out"), (7, "does not exist")] {
            let err = h
                .service
                .back_campaign(id, &h.backer, amount, Some(index), "tok_visa")
                .await
                .unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
        }
    }

    #[tokio::test]
    async fn test_declined_card_records_nothing() {
        let h = Harness::new();
        let id = h.seed_campaign(CampaignStatus::Live).await;

        let err = h
            .service
            .back_campaign(
                id,
                &h.backer,
                Amount::new(dec!(25)).unwrap(),
                None,
                SimulatedProcessor::DECLINED_TOKEN,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CampaignError::Gateway(_)));
        assert!(h.service.campaign(id).await.unwrap().backers.is_empty());
    }
}
