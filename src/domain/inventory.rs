use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InventoryView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity_produced: i32,
    pub quantity_available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial manual correction of a stock record, e.g. registering spoilage or
/// topping up the available count mid-day. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct InventoryAdjustment {
    pub quantity_produced: Option<i32>,
    pub quantity_available: Option<i32>,
}

impl InventoryAdjustment {
    pub fn is_empty(&self) -> bool {
        self.quantity_produced.is_none() && self.quantity_available.is_none()
    }
}
