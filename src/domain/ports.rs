use super::campaign::{Campaign, CampaignId};
use super::payment::{ChargeRequest, ProcessorCharge, ProcessorRefund, RefundReason};
use super::pledge::{Pledge, PledgeId};
use super::user::{User, UserId};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Outcome of a conditional per-pledge refund commit.
#[derive(Debug, Clone, PartialEq)]
pub enum PledgeUpdate {
    /// The pledge flipped to refunded; carries the campaign as stored afterwards.
    Applied(Campaign),
    /// The pledge was already refunded; nothing was written.
    AlreadyRefunded,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;

    /// Writes the whole document if the stored `version` still matches
    /// `campaign.version`, returning the stored copy with the bumped version.
    /// Fails with `Conflict` otherwise. Unknown campaigns are inserted.
    async fn save(&self, campaign: Campaign) -> Result<Campaign>;

    /// Atomically marks one pledge refunded, only if it is not refunded yet.
    async fn mark_pledge_refunded(
        &self,
        id: CampaignId,
        pledge: PledgeId,
        refund_id: &str,
    ) -> Result<PledgeUpdate>;

    async fn all(&self) -> Result<Vec<Campaign>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>>;
    async fn store(&self, user: User) -> Result<()>;
}

/// Raw payment processor, speaking integer minor units.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_charge(&self, request: ChargeRequest) -> std::result::Result<ProcessorCharge, GatewayError>;
    async fn create_refund(
        &self,
        charge_id: &str,
        reason: RefundReason,
    ) -> std::result::Result<ProcessorRefund, GatewayError>;
}

/// Payment records consulted when a pledge carries no charge reference.
#[async_trait]
pub trait TransactionLookup: Send + Sync {
    async fn find_charge(
        &self,
        campaign: CampaignId,
        pledge: &Pledge,
    ) -> std::result::Result<Option<String>, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditCategory {
    AdminEvent,
    PaymentEvent,
    PaymentError,
    RefundEvent,
    RefundError,
    ManualRefundEvent,
    ManualRefundError,
    ApiError,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where an audit entry is shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    Admin,
    Payments,
    Errors,
}

impl fmt::Display for LogDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogDestination::Admin => "admin",
            LogDestination::Payments => "payments",
            LogDestination::Errors => "errors",
        })
    }
}

/// Best-effort audit sink. Callers ignore failures after logging them.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(
        &self,
        message: &str,
        category: AuditCategory,
        destination: LogDestination,
    ) -> Result<()>;
}

pub type CampaignStoreBox = Box<dyn CampaignStore>;
pub type UserDirectoryBox = Box<dyn UserDirectory>;
pub type PaymentProcessorBox = Box<dyn PaymentProcessor>;
pub type TransactionLookupBox = Box<dyn TransactionLookup>;
/// The audit log is shared between the service and the gateway adapter.
pub type AuditLogRef = Arc<dyn AuditLog>;
