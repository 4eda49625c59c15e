use crate::application::record_best_effort;
use crate::domain::campaign::CampaignId;
use crate::domain::money::{Amount, from_minor_units, to_minor_units};
use crate::domain::payment::{ChargeReceipt, ChargeRequest, RefundReason, RefundReceipt};
use crate::domain::pledge::Pledge;
use crate::domain::ports::{
    AuditCategory, AuditLogRef, LogDestination, PaymentProcessorBox, TransactionLookupBox,
};
use crate::error::GatewayError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Settings injected into the [`GatewayAdapter`] at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// ISO currency code sent with every charge.
    pub currency: String,
    /// Fall back to a deterministic synthetic charge reference when a pledge
    /// has none and the payment records know nothing. Never enable in production.
    pub synthetic_references: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            synthetic_references: false,
        }
    }
}

/// Normalizes the payment processor behind decimal amounts and typed errors.
///
/// Amounts leave as integer minor units and come back as `Decimal`, using
/// [`to_minor_units`] and [`from_minor_units`] so stored pledge amounts and
/// processor amounts never drift apart.
pub struct GatewayAdapter {
    processor: PaymentProcessorBox,
    lookup: Option<TransactionLookupBox>,
    audit: AuditLogRef,
    config: GatewayConfig,
}

impl GatewayAdapter {
    pub fn new(processor: PaymentProcessorBox, audit: AuditLogRef, config: GatewayConfig) -> Self {
        Self {
            processor,
            lookup: None,
            audit,
            config,
        }
    }

    /// Adds the payment-records lookup used for pledges without a stored reference.
    pub fn with_lookup(mut self, lookup: TransactionLookupBox) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Charges `amount` against `source_token` on behalf of `campaign`.
    pub async fn charge(
        &self,
        amount: Amount,
        source_token: &str,
        description: Option<&str>,
        mut metadata: BTreeMap<String, String>,
        campaign: CampaignId,
    ) -> Result<ChargeReceipt, GatewayError> {
        metadata.insert("campaign_id".to_string(), campaign.to_string());
        let request = ChargeRequest {
            amount_minor: to_minor_units(amount.value())?,
            currency: self.config.currency.clone(),
            source: source_token.to_string(),
            description: description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Pledge for campaign {campaign}")),
            metadata,
        };

        match self.processor.create_charge(request).await {
            Ok(charge) => {
                let charged = from_minor_units(charge.amount_minor);
                if charged != amount.value() {
                    debug!(requested = %amount, %charged, "charge amount rounded to minor units");
                }
                record_best_effort(
                    self.audit.as_ref(),
                    &format!(
                        "Payment processed: {} for campaign {campaign}, amount: {charged}",
                        charge.id
                    ),
                    AuditCategory::PaymentEvent,
                    LogDestination::Payments,
                )
                .await;
                Ok(ChargeReceipt {
                    transaction_id: charge.id,
                    amount: charged,
                    fee: charge.fee_minor.map(from_minor_units).unwrap_or(Decimal::ZERO),
                    created_at: DateTime::from_timestamp(charge.created, 0).unwrap_or_else(Utc::now),
                })
            }
            Err(e) => {
                record_best_effort(
                    self.audit.as_ref(),
                    &format!("Payment failed: {e} for campaign {campaign}"),
                    AuditCategory::PaymentError,
                    LogDestination::Payments,
                )
                .await;
                Err(e)
            }
        }
    }

    /// Refunds the charge behind `pledge` in full.
    pub async fn refund(
        &self,
        campaign: CampaignId,
        pledge: &Pledge,
        reason: RefundReason,
    ) -> Result<RefundReceipt, GatewayError> {
        let outcome = self.try_refund(campaign, pledge, reason).await;
        if let Err(e) = &outcome {
            record_best_effort(
                self.audit.as_ref(),
                &format!("Refund failed: {e} for campaign {campaign}"),
                AuditCategory::RefundError,
                LogDestination::Payments,
            )
            .await;
        }
        outcome
    }

    async fn try_refund(
        &self,
        campaign: CampaignId,
        pledge: &Pledge,
        reason: RefundReason,
    ) -> Result<RefundReceipt, GatewayError> {
        let charge_id = self.resolve_reference(campaign, pledge).await?;
        let refund = self.processor.create_refund(&charge_id, reason).await?;
        let amount = from_minor_units(refund.amount_minor);

        if amount != pledge.amount.value() {
            warn!(
                pledge = %pledge.id,
                %charge_id,
                pledged = %pledge.amount,
                refunded = %amount,
                "processor refunded a different amount than pledged"
            );
        }

        record_best_effort(
            self.audit.as_ref(),
            &format!(
                "Refund processed: {} for charge {charge_id}, campaign {campaign}",
                refund.id
            ),
            AuditCategory::RefundEvent,
            LogDestination::Payments,
        )
        .await;

        Ok(RefundReceipt {
            refund_id: refund.id,
            amount,
            status: refund.status,
        })
    }

    async fn resolve_reference(
        &self,
        campaign: CampaignId,
        pledge: &Pledge,
    ) -> Result<String, GatewayError> {
        if let Some(id) = &pledge.transaction_id {
            return Ok(id.clone());
        }
        if let Some(lookup) = &self.lookup
            && let Some(id) = lookup.find_charge(campaign, pledge).await?
        {
            debug!(pledge = %pledge.id, charge_id = %id, "resolved charge from payment records");
            return Ok(id);
        }
        if self.config.synthetic_references {
            return Ok(format!("ch_synthetic_{}_{}", pledge.user, pledge.id));
        }
        Err(GatewayError::TransactionNotFound)
    }
}
