use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reason code passed to the processor with a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
            RefundReason::RequestedByCustomer => "requested_by_customer",
        }
    }

    /// Picks the reason code for an operator's free-text refund note.
    ///
    /// Notes mentioning a duplicate or fraud map to those codes; anything else
    /// is treated as a customer request.
    pub fn from_note(note: &str) -> Self {
        let note = note.to_lowercase();
        if note.contains("duplicate") {
            RefundReason::Duplicate
        } else if note.contains("fraud") {
            RefundReason::Fraudulent
        } else {
            RefundReason::RequestedByCustomer
        }
    }
}

/// A charge as sent to the processor, in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub source: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
}

/// The processor's view of a completed charge, in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorCharge {
    pub id: String,
    pub amount_minor: i64,
    pub fee_minor: Option<i64>,
    /// Unix timestamp in seconds.
    pub created: i64,
}

/// The processor's view of a refund, in minor units.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorRefund {
    pub id: String,
    pub amount_minor: i64,
    pub status: String,
}

/// Normalized outcome of a successful charge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Normalized outcome of a successful refund.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: Decimal,
    pub status: String,
}
