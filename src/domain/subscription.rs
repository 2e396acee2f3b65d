use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trialing" => Some(SubscriptionStatus::Trialing),
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "incomplete" => Some(SubscriptionStatus::Incomplete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// Plan line with its unit price frozen at subscription time. Later catalog
/// price changes never touch it.
#[derive(Debug, Clone)]
pub struct PricedPlanLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct SubscriptionDraft {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub frequency_days: String,
    pub pickup_time: NaiveTime,
    pub lines: Vec<PricedPlanLine>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionItemView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub frequency_days: String,
    pub pickup_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SubscriptionItemView>,
}

/// One recorded billing attempt. Informational log only, no balance
/// semantics.
#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
