use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Order lifecycle. The create path always enters at `Paid` because the
/// wallet debit happens synchronously before the header is written; `Pending`
/// exists only for externally imported orders. Transitions are not restricted
/// to an adjacency matrix: any status may follow any status via
/// `update_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    Confirmed,
    Preparing,
    Ready,
    Collected,
    Cancelled,
    Expired,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Collected => "collected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "confirmed" => Some(OrderStatus::Confirmed),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "collected" => Some(OrderStatus::Collected),
            "cancelled" => Some(OrderStatus::Cancelled),
            "expired" => Some(OrderStatus::Expired),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

/// One raw line of a place-order request, before catalog resolution.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
    pub staff_id: Option<Uuid>,
}

/// A line whose unit price has been snapshotted from the catalog.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub staff_id: Option<Uuid>,
    pub unit_price: BigDecimal,
}

/// Fully validated order ready to be persisted. The id is generated before
/// any row exists so header and lines can reference each other up front.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub pickup_slot: DateTime<Utc>,
    pub total_amount: BigDecimal,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
    pub lines: Vec<PricedLine>,
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: BigDecimal,
    pub pickup_slot: DateTime<Utc>,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}
