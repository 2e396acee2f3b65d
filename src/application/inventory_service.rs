use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::{InventoryAdjustment, InventoryView};
use crate::domain::ports::InventoryLedger;

/// Thin application facade over the inventory ledger; all invariants live in
/// the ledger itself.
pub struct InventoryService<L> {
    ledger: L,
}

impl<L: InventoryLedger> InventoryService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Strict first-time registration for a (item, date); fails on a
    /// duplicate so callers can assert "this is the first stock of the day".
    pub fn register_initial_stock(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        produced: i32,
        available: i32,
    ) -> Result<InventoryView, DomainError> {
        if produced < 0 || available < 0 {
            return Err(DomainError::InvalidAmount);
        }
        self.ledger.register_initial(item_id, date, produced, available)
    }

    /// Upsert: "set today's stock to N". Overwrites, never accumulates.
    pub fn set_stock(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        quantity: i32,
    ) -> Result<InventoryView, DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidAmount);
        }
        self.ledger.upsert(item_id, date, quantity)
    }

    pub fn stock_for_date(
        &self,
        item_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<InventoryView>, DomainError> {
        self.ledger.get(item_id, date)
    }

    pub fn check_availability(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        requested_qty: i32,
    ) -> Result<bool, DomainError> {
        self.ledger.check_availability(item_id, date, requested_qty)
    }

    pub fn history(&self, item_id: Uuid) -> Result<Vec<InventoryView>, DomainError> {
        self.ledger.history(item_id)
    }

    pub fn adjust(
        &self,
        id: Uuid,
        change: InventoryAdjustment,
    ) -> Result<InventoryView, DomainError> {
        self.ledger.adjust(id, change)
    }

    pub fn remove(&self, id: Uuid) -> Result<bool, DomainError> {
        self.ledger.soft_delete(id)
    }
}
