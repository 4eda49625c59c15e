//! Campaign status and its transition table.
//!
//! Moderation moves a campaign out of `Pending` into `Approved` or `Rejected`.
//! Approved campaigns are later launched, run until they end, or get
//! cancelled. `Rejected`, `Ended` and `Cancelled` are terminal.
//!
//! - Approve: Pending → Approved
//! - Reject: Pending → Rejected
//! - Launch: Approved → Live
//! - End: Live → Ended
//! - Cancel: Pending | Approved | Live → Cancelled

use crate::error::CampaignError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Live,
    Ended,
    Cancelled,
}

/// Input to the campaign state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Approve,
    Reject,
    Launch,
    End,
    Cancel,
}

impl LifecycleCommand {
    fn is_moderation(self) -> bool {
        matches!(self, LifecycleCommand::Approve | LifecycleCommand::Reject)
    }

    fn verb(self) -> &'static str {
        match self {
            LifecycleCommand::Approve => "approve",
            LifecycleCommand::Reject => "reject",
            LifecycleCommand::Launch => "launch",
            LifecycleCommand::End => "end",
            LifecycleCommand::Cancel => "cancel",
        }
    }
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Approved => "approved",
            CampaignStatus::Rejected => "rejected",
            CampaignStatus::Live => "live",
            CampaignStatus::Ended => "ended",
            CampaignStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Rejected | CampaignStatus::Ended | CampaignStatus::Cancelled
        )
    }

    /// Computes the next status for `command`, or the reason it is not allowed.
    pub fn transition(&self, command: LifecycleCommand) -> Result<CampaignStatus, CampaignError> {
        use CampaignStatus::*;
        use LifecycleCommand::*;

        match (self, command) {
            (Pending, Approve) => Ok(Approved),
            (Pending, Reject) => Ok(Rejected),
            (Approved, Launch) => Ok(Live),
            (Live, End) => Ok(Ended),
            (Pending | Approved | Live, Cancel) => Ok(Cancelled),
            (current, command) if command.is_moderation() => Err(CampaignError::InvalidState(
                format!("Campaign is already {current}"),
            )),
            (current, command) => Err(CampaignError::InvalidState(format!(
                "Cannot {} a {current} campaign",
                command.verb()
            ))),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
