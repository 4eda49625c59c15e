use crate::application::refunds::{
    BulkRefundReport, ManualRefundReceipt, RefundAttemptResult, RefundStatus,
};
use crate::domain::money::Amount;
use crate::domain::pledge::PledgeId;
use crate::domain::user::UserId;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct RefundRow<'a> {
    pledge: PledgeId,
    user: UserId,
    name: Option<&'a str>,
    email: Option<&'a str>,
    amount: Amount,
    status: RefundStatus,
    refund_id: Option<&'a str>,
    error: Option<&'a str>,
}

impl<'a> From<&'a RefundAttemptResult> for RefundRow<'a> {
    fn from(result: &'a RefundAttemptResult) -> Self {
        Self {
            pledge: result.pledge,
            user: result.backer.id,
            name: result.backer.name.as_deref(),
            email: result.backer.email.as_deref(),
            amount: result.amount,
            status: result.status,
            refund_id: result.refund_id.as_deref(),
            error: result.error.as_deref(),
        }
    }
}

/// Writes refund outcomes as CSV, one row per pledge.
///
/// Columns: `pledge,user,name,email,amount,status,refund_id,error`.
pub struct RefundReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RefundReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_report(&mut self, report: &BulkRefundReport) -> Result<()> {
        if report.results.is_empty() {
            self.write_header()?;
        }
        for result in &report.results {
            self.writer.serialize(RefundRow::from(result))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_receipt(&mut self, pledge: PledgeId, receipt: &ManualRefundReceipt) -> Result<()> {
        self.writer.serialize(RefundRow {
            pledge,
            user: receipt.user.id,
            name: receipt.user.name.as_deref(),
            email: receipt.user.email.as_deref(),
            amount: receipt.amount,
            status: RefundStatus::Success,
            refund_id: Some(&receipt.refund_id),
            error: None,
        })?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record([
            "pledge",
            "user",
            "name",
            "email",
            "amount",
            "status",
            "refund_id",
            "error",
        ])?;
        Ok(())
    }
}
