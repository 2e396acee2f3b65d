use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Duplicate key")]
    DuplicateKey,
    #[error("Insufficient stock for item {item_id} on {date}")]
    InsufficientStock { item_id: Uuid, date: NaiveDate },
    #[error("Insufficient wallet balance")]
    InsufficientFunds,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Ledger inconsistency: {0}")]
    Inconsistent(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
