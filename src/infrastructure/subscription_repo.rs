use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::dsl;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::SubscriptionStore;
use crate::domain::subscription::{
    PaymentView, SubscriptionDraft, SubscriptionItemView, SubscriptionStatus, SubscriptionView,
};
use crate::schema::{subscription_items, subscription_payments, subscriptions};

use super::models::{
    NewSubscriptionItemRow, NewSubscriptionPaymentRow, NewSubscriptionRow, SubscriptionItemRow,
    SubscriptionPaymentRow, SubscriptionRow,
};

type LiveSubscriptions =
    dsl::Filter<subscriptions::table, dsl::IsNull<subscriptions::deleted_at>>;

fn live() -> LiveSubscriptions {
    subscriptions::table.filter(subscriptions::deleted_at.is_null())
}

fn to_view(
    row: SubscriptionRow,
    items: Vec<SubscriptionItemRow>,
) -> Result<SubscriptionView, DomainError> {
    let status = SubscriptionStatus::parse(&row.status).ok_or_else(|| {
        DomainError::Internal(format!("Unknown subscription status '{}'", row.status))
    })?;
    Ok(SubscriptionView {
        id: row.id,
        user_id: row.user_id,
        business_id: row.business_id,
        status,
        current_period_end: row.current_period_end,
        frequency_days: row.frequency_days,
        pickup_time: row.pickup_time,
        created_at: row.created_at,
        items: items
            .into_iter()
            .map(|i| SubscriptionItemView {
                id: i.id,
                item_id: i.item_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
    })
}

fn payment_to_view(row: SubscriptionPaymentRow) -> PaymentView {
    PaymentView {
        id: row.id,
        subscription_id: row.subscription_id,
        amount: row.amount,
        status: row.status,
        external_reference: row.external_reference,
        created_at: row.created_at,
    }
}

fn load_view(conn: &mut PgConnection, id: Uuid) -> Result<Option<SubscriptionView>, DomainError> {
    let sub = live()
        .find(id)
        .select(SubscriptionRow::as_select())
        .first(conn)
        .optional()?;

    let Some(sub) = sub else {
        return Ok(None);
    };

    let items = subscription_items::table
        .filter(subscription_items::subscription_id.eq(sub.id))
        .filter(subscription_items::deleted_at.is_null())
        .select(SubscriptionItemRow::as_select())
        .load(conn)?;

    to_view(sub, items).map(Some)
}

#[derive(AsChangeset)]
#[diesel(table_name = subscriptions)]
struct StatusChangeset<'a> {
    status: &'a str,
    current_period_end: Option<DateTime<Utc>>,
}

// ── Repository ───────────────────────────────────────────────────────────────

pub struct DieselSubscriptionStore {
    pool: DbPool,
}

impl DieselSubscriptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SubscriptionStore for DieselSubscriptionStore {
    /// Header and plan lines commit as one unit, same pre-generated-id
    /// pattern as orders.
    fn create(&self, draft: SubscriptionDraft) -> Result<SubscriptionView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(subscriptions::table)
                .values(&NewSubscriptionRow {
                    id: draft.id,
                    user_id: draft.user_id,
                    business_id: draft.business_id,
                    status: draft.status.as_str().to_string(),
                    current_period_end: draft.current_period_end,
                    frequency_days: draft.frequency_days.clone(),
                    pickup_time: draft.pickup_time,
                })
                .execute(conn)?;

            let new_items: Vec<NewSubscriptionItemRow> = draft
                .lines
                .iter()
                .map(|l| NewSubscriptionItemRow {
                    id: Uuid::new_v4(),
                    subscription_id: draft.id,
                    item_id: l.item_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(subscription_items::table)
                .values(&new_items)
                .execute(conn)?;

            load_view(conn, draft.id)?.ok_or_else(|| {
                DomainError::Inconsistent(format!(
                    "subscription {} not readable after insert",
                    draft.id
                ))
            })
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_view(&mut conn, id)
    }

    fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<SubscriptionView, DomainError> {
        let mut conn = self.pool.get()?;
        let affected = diesel::update(live().find(id))
            .set(&StatusChangeset {
                status: status.as_str(),
                current_period_end: period_end,
            })
            .execute(&mut conn)?;
        if affected == 0 {
            return Err(DomainError::NotFound);
        }
        load_view(&mut conn, id)?.ok_or(DomainError::NotFound)
    }

    /// Pure append; this log records billing attempts and has no balance
    /// semantics.
    fn record_payment(
        &self,
        subscription_id: Uuid,
        amount: BigDecimal,
        status: &str,
        external_reference: Option<&str>,
    ) -> Result<PaymentView, DomainError> {
        let mut conn = self.pool.get()?;

        // Fail fast with NotFound instead of a raw foreign-key violation.
        let exists: i64 = live()
            .find(subscription_id)
            .count()
            .get_result(&mut conn)?;
        if exists == 0 {
            return Err(DomainError::NotFound);
        }

        diesel::insert_into(subscription_payments::table)
            .values(&NewSubscriptionPaymentRow {
                id: Uuid::new_v4(),
                subscription_id,
                amount,
                status: status.to_string(),
                external_reference: external_reference.map(str::to_string),
            })
            .returning(SubscriptionPaymentRow::as_returning())
            .get_result(&mut conn)
            .map(payment_to_view)
            .map_err(Into::into)
    }

    fn for_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = live()
            .filter(subscriptions::user_id.eq(user_id))
            .select(SubscriptionRow::as_select())
            .order(subscriptions::created_at.desc())
            .load(&mut conn)?;

        let items = SubscriptionItemRow::belonging_to(&rows)
            .filter(subscription_items::deleted_at.is_null())
            .select(SubscriptionItemRow::as_select())
            .load(&mut conn)?
            .grouped_by(&rows);

        rows.into_iter()
            .zip(items)
            .map(|(sub, items)| to_view(sub, items))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::{Duration, NaiveTime, Utc};
    use uuid::Uuid;

    use super::DieselSubscriptionStore;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::SubscriptionStore;
    use crate::domain::subscription::{PricedPlanLine, SubscriptionDraft, SubscriptionStatus};
    use crate::infrastructure::test_support::{reprice_item, seed_item, setup_db};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn draft(user: Uuid, business: Uuid, lines: Vec<PricedPlanLine>) -> SubscriptionDraft {
        SubscriptionDraft {
            id: Uuid::new_v4(),
            user_id: user,
            business_id: business,
            status: SubscriptionStatus::Active,
            current_period_end: Some(Utc::now() + Duration::days(30)),
            frequency_days: "MON,WED,FRI".to_string(),
            pickup_time: NaiveTime::from_hms_opt(8, 30, 0).expect("valid time"),
            lines,
        }
    }

    #[tokio::test]
    async fn create_persists_header_and_lines_together() {
        let (_container, pool) = setup_db().await;
        let store = DieselSubscriptionStore::new(pool.clone());
        let (user, business) = (Uuid::new_v4(), Uuid::new_v4());
        let bread = seed_item(&pool, business, "sourdough", "4.00");
        let milk = seed_item(&pool, business, "milk", "1.20");

        let sub = store
            .create(draft(
                user,
                business,
                vec![
                    PricedPlanLine { item_id: bread, quantity: 2, unit_price: dec("4.00") },
                    PricedPlanLine { item_id: milk, quantity: 1, unit_price: dec("1.20") },
                ],
            ))
            .expect("create failed");

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.items.len(), 2);
        assert!(sub.current_period_end.is_some());

        let fetched = store
            .find_by_id(sub.id)
            .expect("find failed")
            .expect("subscription should exist");
        assert_eq!(fetched.items.len(), 2);
    }

    #[tokio::test]
    async fn line_prices_are_snapshots_immune_to_catalog_changes() {
        let (_container, pool) = setup_db().await;
        let store = DieselSubscriptionStore::new(pool.clone());
        let (user, business) = (Uuid::new_v4(), Uuid::new_v4());
        let bread = seed_item(&pool, business, "sourdough", "4.00");

        let sub = store
            .create(draft(
                user,
                business,
                vec![PricedPlanLine { item_id: bread, quantity: 1, unit_price: dec("4.00") }],
            ))
            .expect("create failed");

        reprice_item(&pool, bread, "9.99");

        let fetched = store
            .find_by_id(sub.id)
            .expect("find failed")
            .expect("subscription should exist");
        assert_eq!(fetched.items[0].unit_price, dec("4.00"));
    }

    #[tokio::test]
    async fn update_status_sets_status_and_optionally_period_end() {
        let (_container, pool) = setup_db().await;
        let store = DieselSubscriptionStore::new(pool.clone());
        let (user, business) = (Uuid::new_v4(), Uuid::new_v4());
        let bread = seed_item(&pool, business, "sourdough", "4.00");

        let sub = store
            .create(draft(
                user,
                business,
                vec![PricedPlanLine { item_id: bread, quantity: 1, unit_price: dec("4.00") }],
            ))
            .expect("create failed");
        let original_end = sub.current_period_end;

        let paused = store
            .update_status(sub.id, SubscriptionStatus::PastDue, None)
            .expect("update failed");
        assert_eq!(paused.status, SubscriptionStatus::PastDue);
        assert_eq!(paused.current_period_end, original_end, "period end untouched");

        let new_end = Utc::now() + Duration::days(60);
        let renewed = store
            .update_status(sub.id, SubscriptionStatus::Active, Some(new_end))
            .expect("update failed");
        assert_eq!(renewed.status, SubscriptionStatus::Active);
        assert!(renewed.current_period_end.expect("set") > original_end.expect("set"));

        assert!(matches!(
            store.update_status(Uuid::new_v4(), SubscriptionStatus::Canceled, None),
            Err(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn payments_append_to_the_log() {
        let (_container, pool) = setup_db().await;
        let store = DieselSubscriptionStore::new(pool.clone());
        let (user, business) = (Uuid::new_v4(), Uuid::new_v4());
        let bread = seed_item(&pool, business, "sourdough", "4.00");

        let sub = store
            .create(draft(
                user,
                business,
                vec![PricedPlanLine { item_id: bread, quantity: 1, unit_price: dec("4.00") }],
            ))
            .expect("create failed");

        let payment = store
            .record_payment(sub.id, dec("4.00"), "succeeded", Some("inv_123"))
            .expect("record failed");
        assert_eq!(payment.subscription_id, sub.id);
        assert_eq!(payment.amount, dec("4.00"));
        assert_eq!(payment.external_reference.as_deref(), Some("inv_123"));

        assert!(matches!(
            store.record_payment(Uuid::new_v4(), dec("4.00"), "succeeded", None),
            Err(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn user_listing_returns_subscriptions_with_items() {
        let (_container, pool) = setup_db().await;
        let store = DieselSubscriptionStore::new(pool.clone());
        let (user, business) = (Uuid::new_v4(), Uuid::new_v4());
        let bread = seed_item(&pool, business, "sourdough", "4.00");

        for _ in 0..2 {
            store
                .create(draft(
                    user,
                    business,
                    vec![PricedPlanLine { item_id: bread, quantity: 1, unit_price: dec("4.00") }],
                ))
                .expect("create failed");
        }

        let subs = store.for_user(user).expect("list failed");
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.items.len() == 1));
    }
}
