//! Application layer containing the campaign use cases.
//!
//! `CampaignService` is the entry point callers use. Moderation, refunds and
//! pledge intake are split across modules as separate `impl` blocks; the
//! gateway adapter sits between them and the payment processor.

pub mod gateway;
pub mod moderation;
pub mod pledges;
pub mod refunds;
pub mod service;

use crate::domain::ports::{AuditCategory, AuditLog, LogDestination};
use tracing::warn;

/// Writes an audit entry, logging instead of failing when the sink is down.
pub(crate) async fn record_best_effort(
    audit: &dyn AuditLog,
    message: &str,
    category: AuditCategory,
    destination: LogDestination,
) {
    if let Err(e) = audit.record(message, category, destination).await {
        warn!(%category, %destination, error = %e, "audit log write failed");
    }
}
