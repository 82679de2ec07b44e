use chrono::{DateTime, Utc};
use mise_core::BulkItemCandidate;
use mise_receipts::ImportReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RECEIPTS_EXTRACTED: &str = "receipts.extracted";
pub const RECEIPTS_MATCHED: &str = "receipts.matched";
pub const RECEIPTS_CONFIRMED: &str = "receipts.confirmed";
pub const RECEIPTS_IMPORTED: &str = "receipts.imported";

/// Lines read off a receipt or invoice, not yet reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptExtractedEvent {
    pub tenant_id: String,
    pub receipt_id: Uuid,
    pub lines: Vec<BulkItemCandidate>,
}

/// Proposed catalog matches, for review before import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptMatchedEvent {
    pub tenant_id: String,
    pub receipt_id: Uuid,
    pub lines: Vec<BulkItemCandidate>,
    pub matched: usize,
}

/// Reviewed lines the user accepted for import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfirmedEvent {
    pub tenant_id: String,
    pub receipt_id: Uuid,
    pub lines: Vec<BulkItemCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptImportedEvent {
    pub tenant_id: String,
    pub receipt_id: Uuid,
    pub summary: String,
    pub report: ImportReport,
    #[serde(default)]
    pub recipes_refreshed: usize,
    pub imported_at: DateTime<Utc>,
}
