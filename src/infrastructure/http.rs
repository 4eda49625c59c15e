use crate::domain::payment::{ChargeRequest, ProcessorCharge, ProcessorRefund, RefundReason};
use crate::domain::ports::PaymentProcessor;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct ChargeResponse {
    id: String,
    amount: i64,
    #[serde(default)]
    fee: Option<i64>,
    created: i64,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
    amount: i64,
    status: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Payment processor reached over its form-encoded REST API.
///
/// Speaks the common `/v1/charges` and `/v1/refunds` shape with bearer-token
/// authentication. Non-2xx answers become [`GatewayError::Declined`] carrying the
/// processor's message; network failures become [`GatewayError::Transport`].
#[derive(Clone)]
pub struct HttpProcessor {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProcessor {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "calling payment processor");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Transport(format!("unreadable processor response: {e}")));
    }
    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error.message,
        Err(_) => format!("processor answered HTTP {status}"),
    };
    Err(GatewayError::Declined(message))
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn create_charge(&self, request: ChargeRequest) -> Result<ProcessorCharge, GatewayError> {
        let mut params = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency),
            ("source".to_string(), request.source),
            ("description".to_string(), request.description),
        ];
        params.extend(
            request
                .metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value)),
        );

        let charge: ChargeResponse = self.post("/v1/charges", &params).await?;
        Ok(ProcessorCharge {
            id: charge.id,
            amount_minor: charge.amount,
            fee_minor: charge.fee,
            created: charge.created,
        })
    }

    async fn create_refund(
        &self,
        charge_id: &str,
        reason: RefundReason,
    ) -> Result<ProcessorRefund, GatewayError> {
        let params = [
            ("charge".to_string(), charge_id.to_string()),
            ("reason".to_string(), reason.as_str().to_string()),
        ];
        let refund: RefundResponse = self.post("/v1/refunds", &params).await?;
        Ok(ProcessorRefund {
            id: refund.id,
            amount_minor: refund.amount,
            status: refund.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_refund_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(header("authorization", "Bearer sk_test"))
            .and(body_string_contains("charge=ch_123"))
            .and(body_string_contains("reason=requested_by_customer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "re_1",
                "amount": 3000,
                "status": "succeeded"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let processor = HttpProcessor::new(server.uri(), "sk_test").unwrap();
        let refund = processor
            .create_refund("ch_123", RefundReason::RequestedByCustomer)
            .await
            .unwrap();

        assert_eq!(refund.id, "re_1");
        assert_eq!(refund.amount_minor, 3000);
    }

    #[tokio::test]
    async fn test_processor_error_becomes_declined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Charge ch_123 has already been refunded." }
            })))
            .mount(&server)
            .await;

        let processor = HttpProcessor::new(server.uri(), "sk_test").unwrap();
        let result = processor
            .create_refund("ch_123", RefundReason::RequestedByCustomer)
            .await;

        assert_eq!(
            result,
            Err(GatewayError::Declined(
                "Charge ch_123 has already been refunded.".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_charge_sends_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .and(body_string_contains("amount=1001"))
            .and(body_string_contains("metadata%5Bcampaign_id%5D=c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_9",
                "amount": 1001,
                "fee": 59,
                "created": 1_700_000_000
            })))
            .mount(&server)
            .await;

        let processor = HttpProcessor::new(server.uri(), "sk_test").unwrap();
        let charge = processor
            .create_charge(ChargeRequest {
                amount_minor: 1001,
                currency: "usd".into(),
                source: "tok_visa".into(),
                description: "Pledge".into(),
                metadata: BTreeMap::from([("campaign_id".to_string(), "c1".to_string())]),
            })
            .await
            .unwrap();

        assert_eq!(charge.id, "ch_9");
        assert_eq!(charge.fee_minor, Some(59));
    }
}
