use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogLookup, SubscriptionStore};
use crate::domain::subscription::{
    PaymentView, PricedPlanLine, SubscriptionDraft, SubscriptionLineRequest, SubscriptionStatus,
    SubscriptionView,
};

/// Fixed billing cycle; the renewal scheduler advances `current_period_end`
/// via `update_status`.
const BILLING_CYCLE_DAYS: i64 = 30;

pub struct SubscriptionService<C, S> {
    catalog: C,
    store: S,
}

impl<C, S> SubscriptionService<C, S>
where
    C: CatalogLookup,
    S: SubscriptionStore,
{
    pub fn new(catalog: C, store: S) -> Self {
        Self { catalog, store }
    }

    /// Same pre-generated-id pattern as orders: plan lines snapshot their
    /// unit price at subscribe time and the header starts out `active`.
    pub fn subscribe(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        frequency_days: String,
        pickup_time: NaiveTime,
        lines: Vec<SubscriptionLineRequest>,
    ) -> Result<SubscriptionView, DomainError> {
        let subscription_id = Uuid::new_v4();
        let period_end = Utc::now() + Duration::days(BILLING_CYCLE_DAYS);

        let mut priced = Vec::with_capacity(lines.len());
        for request in &lines {
            if request.quantity <= 0 {
                return Err(DomainError::InvalidAmount);
            }
            let item = self
                .catalog
                .get_item(request.item_id)?
                .ok_or(DomainError::NotFound)?;
            priced.push(PricedPlanLine {
                item_id: item.id,
                quantity: request.quantity,
                unit_price: item.price,
            });
        }

        self.store.create(SubscriptionDraft {
            id: subscription_id,
            user_id,
            business_id,
            status: SubscriptionStatus::Active,
            current_period_end: Some(period_end),
            frequency_days,
            pickup_time,
            lines: priced,
        })
    }

    pub fn get_subscription(&self, id: Uuid) -> Result<Option<SubscriptionView>, DomainError> {
        self.store.find_by_id(id)
    }

    pub fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<SubscriptionView, DomainError> {
        self.store.update_status(id, status, period_end)
    }

    pub fn record_payment(
        &self,
        subscription_id: Uuid,
        amount: BigDecimal,
        status: &str,
        external_reference: Option<&str>,
    ) -> Result<PaymentView, DomainError> {
        self.store
            .record_payment(subscription_id, amount, status, external_reference)
    }

    pub fn subscriptions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionView>, DomainError> {
        self.store.for_user(user_id)
    }
}
