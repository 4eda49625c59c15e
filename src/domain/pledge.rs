use super::money::Amount;
use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PledgeId(pub Uuid);

impl PledgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PledgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PledgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single contribution to a campaign, embedded in the campaign's backer list.
///
/// `refunded` is terminal: once set, the pledge is never refunded again.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Pledge {
    pub id: PledgeId,
    pub user: UserId,
    pub amount: Amount,
    /// Index into the owning campaign's reward tiers.
    #[serde(default)]
    pub reward_tier: Option<usize>,
    pub pledge_date: DateTime<Utc>,
    #[serde(default)]
    pub refunded: bool,
    /// Processor charge reference used to look the payment up on refund.
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub refund_id: Option<String>,
}

impl Pledge {
    pub fn new(user: UserId, amount: Amount) -> Self {
        Self {
            id: PledgeId::new(),
            user,
            amount,
            reward_tier: None,
            pledge_date: Utc::now(),
            refunded: false,
            transaction_id: None,
            refund_id: None,
        }
    }

    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_reward_tier(mut self, tier: usize) -> Self {
        self.reward_tier = Some(tier);
        self
    }

    /// Marks the pledge refunded. Returns `false` if it already was.
    pub fn mark_refunded(&mut self, refund_id: impl Into<String>) -> bool {
        if self.refunded {
            return false;
        }
        self.refunded = true;
        self.refund_id = Some(refund_id.into());
        true
    }
}
