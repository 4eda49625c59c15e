use thiserror::Error;

/// Failures reported by the payment processor or by the adapter around it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("processor declined the request: {0}")]
    Declined(String),
    #[error("no transaction found for this pledge")]
    TransactionNotFound,
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("processor unreachable: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Gateway failure: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CampaignError {
    /// HTTP status code a web front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            CampaignError::NotFound(_) => 404,
            CampaignError::BadRequest(_) | CampaignError::InvalidState(_) => 400,
            CampaignError::Unauthorized(_) => 401,
            CampaignError::Conflict(_) => 409,
            CampaignError::Gateway(_)
            | CampaignError::Storage(_)
            | CampaignError::InternalError(_) => 500,
        }
    }
}

impl From<serde_json::Error> for CampaignError {
    fn from(e: serde_json::Error) -> Self {
        CampaignError::Storage(format!("Serialization error: {e}"))
    }
}

impl From<csv::Error> for CampaignError {
    fn from(e: csv::Error) -> Self {
        CampaignError::InternalError(Box::new(e))
    }
}

impl From<std::io::Error> for CampaignError {
    fn from(e: std::io::Error) -> Self {
        CampaignError::InternalError(Box::new(e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CampaignError {
    fn from(e: rocksdb::Error) -> Self {
        CampaignError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CampaignError>;
