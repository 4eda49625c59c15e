use super::money::{Amount, Balance};
use super::pledge::{Pledge, PledgeId};
use super::status::CampaignStatus;
use super::user::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub Uuid);

impl CampaignId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RewardTier {
    pub title: String,
    pub description: String,
    pub amount: Amount,
    #[serde(default)]
    pub max_backers: Option<u32>,
    #[serde(default)]
    pub current_backers: u32,
}

impl RewardTier {
    pub fn is_sold_out(&self) -> bool {
        self.max_backers
            .is_some_and(|max| self.current_backers >= max)
    }
}

/// Per-day rollup of campaign activity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DailyStat {
    pub date: NaiveDate,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub backers_added: u32,
    #[serde(default)]
    pub amount_raised: Balance,
}

/// The campaign document: moderation state, reward tiers and every pledge.
///
/// `amount_raised` and `backer_count` track the non-refunded pledges; they
/// move up through [`Campaign::add_pledge`] and down through
/// [`Campaign::apply_refund`]. `version` increases on every durable write and
/// is checked by the store to detect lost updates.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    pub creator: UserId,
    pub goal: Amount,
    #[serde(default)]
    pub amount_raised: Balance,
    #[serde(default)]
    pub backer_count: u32,
    pub category: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reward_tiers: Vec<RewardTier>,
    #[serde(default)]
    pub backers: Vec<Pledge>,
    #[serde(default)]
    pub daily_stats: Vec<DailyStat>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Campaign {
    pub fn new(
        title: impl Into<String>,
        creator: UserId,
        goal: Amount,
        category: impl Into<String>,
        end_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId::new(),
            title: title.into(),
            description: String::new(),
            short_description: String::new(),
            creator,
            goal,
            amount_raised: Balance::ZERO,
            backer_count: 0,
            category: category.into(),
            status: CampaignStatus::Pending,
            rejection_reason: None,
            approved_by: None,
            approval_date: None,
            reward_tiers: Vec::new(),
            backers: Vec::new(),
            daily_stats: Vec::new(),
            start_date: now,
            end_date,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// A campaign succeeded once it raised at least its goal.
    pub fn is_successful(&self) -> bool {
        self.amount_raised >= Balance::from(self.goal)
    }

    /// Share of the goal raised so far, in percent, rounded to two places.
    ///
    /// Saturates at `Decimal::MAX` when the ratio does not fit.
    pub fn progress_percentage(&self) -> Decimal {
        self.amount_raised
            .0
            .checked_div(self.goal.value())
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| {
                pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                    .normalize()
            })
            .unwrap_or(Decimal::MAX)
    }

    /// Whole days until `end_date`, rounded up and never negative.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        let remaining = (self.end_date - now).num_seconds();
        if remaining <= 0 {
            0
        } else {
            (remaining + 86_399) / 86_400
        }
    }

    /// Sum of all pledges that have not been refunded.
    pub fn net_pledged(&self) -> Balance {
        self.backers
            .iter()
            .filter(|p| !p.refunded)
            .fold(Balance::ZERO, |acc, p| acc + p.amount.into())
    }

    pub fn active_backers(&self) -> usize {
        self.backers.iter().filter(|p| !p.refunded).count()
    }

    pub fn pledge_index(&self, pledge_id: PledgeId) -> Option<usize> {
        self.backers.iter().position(|p| p.id == pledge_id)
    }

    pub fn pledge(&self, pledge_id: PledgeId) -> Option<&Pledge> {
        self.backers.iter().find(|p| p.id == pledge_id)
    }

    /// Appends a pledge and rolls it into the totals, the tier and today's stats.
    pub fn add_pledge(&mut self, pledge: Pledge) {
        let amount = Balance::from(pledge.amount);
        let day = pledge.pledge_date.date_naive();

        if let Some(tier) = pledge
            .reward_tier
            .and_then(|index| self.reward_tiers.get_mut(index))
        {
            tier.current_backers += 1;
        }

        match self.daily_stats.iter_mut().find(|s| s.date == day) {
            Some(stat) => {
                stat.backers_added += 1;
                stat.amount_raised += amount;
            }
            None => self.daily_stats.push(DailyStat {
                date: day,
                view_count: 0,
                backers_added: 1,
                amount_raised: amount,
            }),
        }

        self.amount_raised += amount;
        self.backer_count += 1;
        self.backers.push(pledge);
    }

    /// Marks the pledge at `index` refunded and takes it out of the totals
    /// and its reward tier.
    ///
    /// Returns `false` without touching anything if it was already refunded.
    pub fn apply_refund(&mut self, index: usize, refund_id: &str) -> bool {
        let Some(pledge) = self.backers.get_mut(index) else {
            return false;
        };
        if !pledge.mark_refunded(refund_id) {
            return false;
        }
        let amount = Balance::from(pledge.amount);
        if let Some(tier) = pledge
            .reward_tier
            .and_then(|tier| self.reward_tiers.get_mut(tier))
        {
            tier.current_backers = tier.current_backers.saturating_sub(1);
        }
        self.amount_raised = self.amount_raised.saturating_sub(amount);
        self.backer_count = self.backer_count.saturating_sub(1);
        true
    }
}
