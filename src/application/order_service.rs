use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderDraft, OrderLineRequest, OrderStatus, OrderView, PricedLine};
use crate::domain::ports::{CatalogLookup, InventoryLedger, OrderStore};

/// Orchestrates order placement across catalog, inventory and wallet. The
/// service validates and prices the request; the store owns the atomic
/// debit-decrement-persist section. Collaborators arrive pre-constructed.
pub struct OrderService<C, I, O> {
    catalog: C,
    inventory: I,
    orders: O,
}

impl<C, I, O> OrderService<C, I, O>
where
    C: CatalogLookup,
    I: InventoryLedger,
    O: OrderStore,
{
    pub fn new(catalog: C, inventory: I, orders: O) -> Self {
        Self {
            catalog,
            inventory,
            orders,
        }
    }

    pub fn create_order(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        pickup_slot: DateTime<Utc>,
        lines: Vec<OrderLineRequest>,
    ) -> Result<OrderView, DomainError> {
        // Generated before any row exists so the wallet ledger entry and the
        // order lines can all reference the same id.
        let order_id = Uuid::new_v4();
        let pickup_date = pickup_slot.date_naive();

        let mut total = BigDecimal::zero();
        let mut priced = Vec::with_capacity(lines.len());

        for request in &lines {
            if request.quantity <= 0 {
                return Err(DomainError::InvalidAmount);
            }
            let item = self
                .catalog
                .get_item(request.item_id)?
                .ok_or(DomainError::NotFound)?;

            // Advisory pre-check to fail fast; the decrement inside the store
            // transaction is what actually guards against overselling.
            if !self
                .inventory
                .check_availability(item.id, pickup_date, request.quantity)?
            {
                return Err(DomainError::InsufficientStock {
                    item_id: item.id,
                    date: pickup_date,
                });
            }

            total += &item.price * BigDecimal::from(request.quantity);
            priced.push(PricedLine {
                item_id: item.id,
                quantity: request.quantity,
                staff_id: request.staff_id,
                unit_price: item.price,
            });
        }

        self.orders.create_paid(OrderDraft {
            id: order_id,
            business_id,
            user_id,
            pickup_slot,
            total_amount: total,
            subscription_id: None,
            is_subscription_order: false,
            lines: priced,
        })
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        self.orders.find_by_id(id)
    }

    pub fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        self.orders.update_status(id, status)
    }

    pub fn orders_for_business(
        &self,
        business_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DomainError> {
        self.orders.for_business(business_id, status)
    }

    pub fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        self.orders.for_user(user_id)
    }
}
