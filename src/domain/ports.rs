use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::catalog::ItemView;
use super::errors::DomainError;
use super::inventory::{InventoryAdjustment, InventoryView};
use super::order::{OrderDraft, OrderStatus, OrderView};
use super::subscription::{PaymentView, SubscriptionDraft, SubscriptionStatus, SubscriptionView};
use super::wallet::{TransactionView, WalletView};

/// Read-only catalog access. The core never mutates items; it only resolves
/// existence and the price to snapshot.
pub trait CatalogLookup: Send + Sync + 'static {
    fn get_item(&self, item_id: Uuid) -> Result<Option<ItemView>, DomainError>;
}

/// Per-(item, date) stock tracker. `decrement` must be atomic with its
/// availability check: two concurrent decrements may never both succeed when
/// only one fits.
pub trait InventoryLedger: Send + Sync + 'static {
    fn get(&self, item_id: Uuid, date: NaiveDate) -> Result<Option<InventoryView>, DomainError>;

    /// Destructive reset: sets both produced and available to `quantity`,
    /// creating the record when absent.
    fn upsert(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        quantity: i32,
    ) -> Result<InventoryView, DomainError>;

    /// Strict first-time registration; `DuplicateKey` when a live record
    /// already exists for (item, date).
    fn register_initial(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        produced: i32,
        available: i32,
    ) -> Result<InventoryView, DomainError>;

    /// `InsufficientStock` when available < amount. A missing record counts
    /// as unavailable, not unlimited.
    fn decrement(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        amount: i32,
    ) -> Result<InventoryView, DomainError>;

    fn check_availability(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        requested_qty: i32,
    ) -> Result<bool, DomainError>;

    /// All live records for an item, most recent date first.
    fn history(&self, item_id: Uuid) -> Result<Vec<InventoryView>, DomainError>;

    fn adjust(&self, id: Uuid, change: InventoryAdjustment)
        -> Result<InventoryView, DomainError>;

    fn soft_delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

/// Per-(user, business) prepaid balance with an append-only transaction log.
/// Credit and debit keep balance and log mutually consistent under
/// concurrency; debit is conditional on sufficiency.
pub trait WalletLedger: Send + Sync + 'static {
    fn get_or_create(&self, user_id: Uuid, business_id: Uuid) -> Result<WalletView, DomainError>;

    fn credit(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError>;

    fn debit(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError>;

    /// Transaction log, newest first.
    fn transactions(&self, wallet_id: Uuid) -> Result<Vec<TransactionView>, DomainError>;
}

/// Order persistence. `create_paid` owns the money-and-stock critical
/// section: wallet debit, inventory decrements and the header+line inserts
/// commit or roll back as one unit.
pub trait OrderStore: Send + Sync + 'static {
    fn create_paid(&self, draft: OrderDraft) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError>;
    fn for_business(
        &self,
        business_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DomainError>;
    fn for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;
}

pub trait SubscriptionStore: Send + Sync + 'static {
    fn create(&self, draft: SubscriptionDraft) -> Result<SubscriptionView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionView>, DomainError>;
    fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<SubscriptionView, DomainError>;
    fn record_payment(
        &self,
        subscription_id: Uuid,
        amount: BigDecimal,
        status: &str,
        external_reference: Option<&str>,
    ) -> Result<PaymentView, DomainError>;
    fn for_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionView>, DomainError>;
}
