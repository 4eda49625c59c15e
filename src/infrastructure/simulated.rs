use crate::domain::payment::{ChargeRequest, ProcessorCharge, ProcessorRefund, RefundReason};
use crate::domain::ports::PaymentProcessor;
use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Ledger {
    charges: HashMap<String, i64>,
    refunded: HashSet<String>,
    declined: HashSet<String>,
    charge_requests: Vec<ChargeRequest>,
    refund_calls: Vec<String>,
    refund_reasons: Vec<RefundReason>,
    next_id: u64,
}

impl Ledger {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_sim_{:06}", self.next_id)
    }
}

/// In-process payment processor for development and tests.
///
/// Clones share one ledger, so a test can hand a clone to the gateway adapter
/// and keep another to inspect calls. A strict processor refuses to refund
/// charges it never saw; a lenient one refunds them for an unknown amount of 0.
#[derive(Clone, Default)]
pub struct SimulatedProcessor {
    ledger: Arc<Mutex<Ledger>>,
    strict: bool,
}

impl SimulatedProcessor {
    /// Source token that always gets declined.
    pub const DECLINED_TOKEN: &'static str = "tok_chargeDeclined";

    pub fn strict() -> Self {
        Self {
            ledger: Arc::default(),
            strict: true,
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    /// Makes a charge known to the processor, as if it had been created earlier.
    pub async fn register_charge(&self, charge_id: impl Into<String>, amount_minor: i64) {
        self.ledger
            .lock()
            .await
            .charges
            .insert(charge_id.into(), amount_minor);
    }

    /// Makes every refund of `charge_id` fail until [`allow`](Self::allow) is called.
    pub async fn decline(&self, charge_id: impl Into<String>) {
        self.ledger.lock().await.declined.insert(charge_id.into());
    }

    pub async fn allow(&self, charge_id: &str) {
        self.ledger.lock().await.declined.remove(charge_id);
    }

    pub async fn charges(&self) -> Vec<ChargeRequest> {
        self.ledger.lock().await.charge_requests.clone()
    }

    /// Charge ids passed to `create_refund`, in call order, including failures.
    pub async fn refund_calls(&self) -> Vec<String> {
        self.ledger.lock().await.refund_calls.clone()
    }

    /// Reason codes passed to `create_refund`, parallel to [`refund_calls`](Self::refund_calls).
    pub async fn refund_reasons(&self) -> Vec<RefundReason> {
        self.ledger.lock().await.refund_reasons.clone()
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedProcessor {
    async fn create_charge(&self, request: ChargeRequest) -> Result<ProcessorCharge, GatewayError> {
        let mut ledger = self.ledger.lock().await;
        ledger.charge_requests.push(request.clone());

        if request.source == Self::DECLINED_TOKEN {
            return Err(GatewayError::Declined("Your card was declined.".to_string()));
        }
        if request.amount_minor <= 0 {
            return Err(GatewayError::InvalidAmount(format!(
                "amount must be positive, got {}",
                request.amount_minor
            )));
        }

        let id = ledger.next_id("ch");
        ledger.charges.insert(id.clone(), request.amount_minor);
        // 2.9% + 30 minor units, rounded half up.
        let fee_minor = (request.amount_minor * 29 + 500) / 1000 + 30;
        Ok(ProcessorCharge {
            id,
            amount_minor: request.amount_minor,
            fee_minor: Some(fee_minor),
            created: Utc::now().timestamp(),
        })
    }

    async fn create_refund(
        &self,
        charge_id: &str,
        reason: RefundReason,
    ) -> Result<ProcessorRefund, GatewayError> {
        let mut ledger = self.ledger.lock().await;
        ledger.refund_calls.push(charge_id.to_string());
        ledger.refund_reasons.push(reason);

        if ledger.refunded.contains(charge_id) {
            return Err(GatewayError::Declined(format!(
                "Charge {charge_id} has already been refunded."
            )));
        }
        if ledger.declined.contains(charge_id) {
            return Err(GatewayError::Declined(format!(
                "Charge {charge_id} cannot be refunded."
            )));
        }
        let amount_minor = match ledger.charges.get(charge_id) {
            Some(amount) => *amount,
            None if self.strict => {
                return Err(GatewayError::Declined(format!("No such charge: '{charge_id}'")));
            }
            None => 0,
        };

        ledger.refunded.insert(charge_id.to_string());
        let id = ledger.next_id("re");
        Ok(ProcessorRefund {
            id,
            amount_minor,
            status: "succeeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(amount_minor: i64, source: &str) -> ChargeRequest {
        ChargeRequest {
            amount_minor,
            currency: "usd".into(),
            source: source.into(),
            description: "test".into(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_charge_then_refund_once() {
        let processor = SimulatedProcessor::strict();
        let charge = processor.create_charge(request(1000, "tok_visa")).await.unwrap();
        assert_eq!(charge.fee_minor, Some(59));

        let refund = processor
            .create_refund(&charge.id, RefundReason::RequestedByCustomer)
            .await
            .unwrap();
        assert_eq!(refund.amount_minor, 1000);

        let again = processor
            .create_refund(&charge.id, RefundReason::RequestedByCustomer)
            .await;
        assert!(matches!(again, Err(GatewayError::Declined(_))));
        assert_eq!(processor.refund_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_charge() {
        let strict = SimulatedProcessor::strict();
        let result = strict
            .create_refund("ch_nowhere", RefundReason::RequestedByCustomer)
            .await;
        assert!(matches!(result, Err(GatewayError::Declined(m)) if m.contains("No such charge")));

        let lenient = SimulatedProcessor::lenient();
        let refund = lenient
            .create_refund("ch_nowhere", RefundReason::RequestedByCustomer)
            .await
            .unwrap();
        assert_eq!(refund.amount_minor, 0);
    }

    #[tokio::test]
    async fn test_declined_token() {
        let processor = SimulatedProcessor::strict();
        let result = processor
            .create_charge(request(1000, SimulatedProcessor::DECLINED_TOKEN))
            .await;
        assert!(matches!(result, Err(GatewayError::Declined(_))));
    }
}
