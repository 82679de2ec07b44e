pub mod config;
pub mod contracts;
pub mod db;
pub mod redis_bus;

pub use config::{ServiceConfig, policy_from_lookup};
pub use contracts::{
    RECEIPTS_CONFIRMED, RECEIPTS_EXTRACTED, RECEIPTS_IMPORTED, RECEIPTS_MATCHED,
    ReceiptConfirmedEvent, ReceiptExtractedEvent, ReceiptImportedEvent, ReceiptMatchedEvent,
};
pub use db::{PgDocumentStore, connect_database, ensure_schema};
pub use redis_bus::{RedisBus, RedisCostCache};
