use chrono::{NaiveDate, Utc};
use diesel::dsl;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::inventory::{InventoryAdjustment, InventoryView};
use crate::domain::ports::InventoryLedger;
use crate::schema::daily_inventory;

use super::models::{InventoryRow, NewInventoryRow};

type LiveInventory =
    dsl::Filter<daily_inventory::table, dsl::IsNull<daily_inventory::deleted_at>>;

fn live() -> LiveInventory {
    daily_inventory::table.filter(daily_inventory::deleted_at.is_null())
}

fn to_view(row: InventoryRow) -> InventoryView {
    InventoryView {
        id: row.id,
        item_id: row.item_id,
        date: row.date,
        quantity_produced: row.quantity_produced,
        quantity_available: row.quantity_available,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = daily_inventory)]
struct InventoryChangeset {
    quantity_produced: Option<i32>,
    quantity_available: Option<i32>,
}

// ── Connection-level primitive ───────────────────────────────────────────────

/// Conditional decrement: the availability check and the subtraction are one
/// SQL statement, so concurrent decrements against the same (item, date) row
/// serialize on the row lock and the loser re-evaluates against the committed
/// value. Zero rows affected means the stock does not cover `amount`; a
/// missing record counts as unavailable, not unlimited.
pub(crate) fn decrement_on(
    conn: &mut PgConnection,
    item_id: Uuid,
    date: NaiveDate,
    amount: i32,
) -> Result<InventoryRow, DomainError> {
    if amount <= 0 {
        return Err(DomainError::InvalidAmount);
    }
    diesel::update(
        daily_inventory::table
            .filter(daily_inventory::item_id.eq(item_id))
            .filter(daily_inventory::date.eq(date))
            .filter(daily_inventory::deleted_at.is_null())
            .filter(daily_inventory::quantity_available.ge(amount)),
    )
    .set(daily_inventory::quantity_available.eq(daily_inventory::quantity_available - amount))
    .returning(InventoryRow::as_returning())
    .get_result::<InventoryRow>(conn)
    .optional()?
    .ok_or(DomainError::InsufficientStock { item_id, date })
}

// ── Repository ───────────────────────────────────────────────────────────────

pub struct DieselInventoryLedger {
    pool: DbPool,
}

impl DieselInventoryLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InventoryLedger for DieselInventoryLedger {
    fn get(&self, item_id: Uuid, date: NaiveDate) -> Result<Option<InventoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = live()
            .filter(daily_inventory::item_id.eq(item_id))
            .filter(daily_inventory::date.eq(date))
            .select(InventoryRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(to_view))
    }

    fn upsert(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        quantity: i32,
    ) -> Result<InventoryView, DomainError> {
        let mut conn = self.pool.get()?;
        // Destructive reset: both produced and available are overwritten,
        // "set today's stock to N", not an additive top-up.
        diesel::insert_into(daily_inventory::table)
            .values(&NewInventoryRow {
                id: Uuid::new_v4(),
                item_id,
                date,
                quantity_produced: quantity,
                quantity_available: quantity,
            })
            .on_conflict((daily_inventory::item_id, daily_inventory::date))
            .filter_target(daily_inventory::deleted_at.is_null())
            .do_update()
            .set((
                daily_inventory::quantity_produced.eq(quantity),
                daily_inventory::quantity_available.eq(quantity),
            ))
            .returning(InventoryRow::as_returning())
            .get_result(&mut conn)
            .map(to_view)
            .map_err(Into::into)
    }

    fn register_initial(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        produced: i32,
        available: i32,
    ) -> Result<InventoryView, DomainError> {
        let mut conn = self.pool.get()?;
        // The partial unique index on (item_id, date) turns a second
        // registration into a unique violation, surfaced as DuplicateKey.
        diesel::insert_into(daily_inventory::table)
            .values(&NewInventoryRow {
                id: Uuid::new_v4(),
                item_id,
                date,
                quantity_produced: produced,
                quantity_available: available,
            })
            .returning(InventoryRow::as_returning())
            .get_result(&mut conn)
            .map(to_view)
            .map_err(Into::into)
    }

    fn decrement(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        amount: i32,
    ) -> Result<InventoryView, DomainError> {
        let mut conn = self.pool.get()?;
        decrement_on(&mut conn, item_id, date, amount).map(to_view)
    }

    fn check_availability(
        &self,
        item_id: Uuid,
        date: NaiveDate,
        requested_qty: i32,
    ) -> Result<bool, DomainError> {
        let record = self.get(item_id, date)?;
        Ok(record
            .map(|r| r.quantity_available >= requested_qty)
            .unwrap_or(false))
    }

    fn history(&self, item_id: Uuid) -> Result<Vec<InventoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = live()
            .filter(daily_inventory::item_id.eq(item_id))
            .order(daily_inventory::date.desc())
            .select(InventoryRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(to_view).collect())
    }

    fn adjust(
        &self,
        id: Uuid,
        change: InventoryAdjustment,
    ) -> Result<InventoryView, DomainError> {
        let mut conn = self.pool.get()?;
        if change.is_empty() {
            // Nothing to set; diesel rejects an empty changeset.
            return live()
                .find(id)
                .select(InventoryRow::as_select())
                .first(&mut conn)
                .optional()?
                .map(to_view)
                .ok_or(DomainError::NotFound);
        }
        diesel::update(live().find(id))
            .set(&InventoryChangeset {
                quantity_produced: change.quantity_produced,
                quantity_available: change.quantity_available,
            })
            .returning(InventoryRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(to_view)
            .ok_or(DomainError::NotFound)
    }

    fn soft_delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let affected = diesel::update(live().find(id))
            .set(daily_inventory::deleted_at.eq(Utc::now()))
            .execute(&mut conn)?;
        if affected == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::DieselInventoryLedger;
    use crate::db::DbPool;
    use crate::domain::errors::DomainError;
    use crate::domain::inventory::InventoryAdjustment;
    use crate::domain::ports::InventoryLedger;
    use crate::infrastructure::test_support::{seed_item, setup_db};

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn seeded_item(pool: &DbPool) -> Uuid {
        seed_item(pool, Uuid::new_v4(), "croissant", "3.50")
    }

    #[tokio::test]
    async fn register_then_get_roundtrip() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        let record = ledger
            .register_initial(item, date, 20, 20)
            .expect("register failed");
        assert_eq!(record.quantity_produced, 20);
        assert_eq!(record.quantity_available, 20);

        let fetched = ledger
            .get(item, date)
            .expect("get failed")
            .expect("record should exist");
        assert_eq!(fetched.id, record.id);
    }

    #[tokio::test]
    async fn second_registration_for_same_day_is_a_duplicate() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        ledger
            .register_initial(item, date, 20, 20)
            .expect("first registration failed");
        let err = ledger
            .register_initial(item, date, 5, 5)
            .expect_err("second registration should fail");
        assert!(matches!(err, DomainError::DuplicateKey));
    }

    #[tokio::test]
    async fn upsert_overwrites_instead_of_accumulating() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        let first = ledger.upsert(item, date, 10).expect("upsert failed");
        let second = ledger.upsert(item, date, 7).expect("upsert failed");

        assert_eq!(first.id, second.id, "upsert reuses the existing record");
        assert_eq!(second.quantity_available, 7);
        assert_eq!(second.quantity_produced, 7);
    }

    #[tokio::test]
    async fn decrement_below_available_fails_and_leaves_stock_alone() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        ledger.register_initial(item, date, 5, 5).expect("register failed");

        let err = ledger
            .decrement(item, date, 6)
            .expect_err("over-decrement should fail");
        assert!(matches!(
            err,
            DomainError::InsufficientStock { item_id, date: d } if item_id == item && d == date
        ));

        let record = ledger.get(item, date).expect("get failed").expect("exists");
        assert_eq!(record.quantity_available, 5);
    }

    #[tokio::test]
    async fn non_positive_decrement_is_rejected_and_cannot_inflate_stock() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        ledger.register_initial(item, date, 5, 5).expect("register failed");

        for amount in [0, -3] {
            let err = ledger
                .decrement(item, date, amount)
                .expect_err("non-positive decrement should fail");
            assert!(matches!(err, DomainError::InvalidAmount));
        }

        let record = ledger.get(item, date).expect("get failed").expect("exists");
        assert_eq!(record.quantity_available, 5);
    }

    #[tokio::test]
    async fn decrement_on_missing_record_is_insufficient_not_unlimited() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);

        let err = ledger
            .decrement(item, day("2024-06-01"), 1)
            .expect_err("missing record should not decrement");
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn availability_requires_an_existing_record_with_enough_stock() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        assert!(!ledger.check_availability(item, date, 1).expect("check failed"));

        ledger.register_initial(item, date, 20, 20).expect("register failed");
        assert!(ledger.check_availability(item, date, 5).expect("check failed"));
        assert!(!ledger.check_availability(item, date, 21).expect("check failed"));
    }

    #[tokio::test]
    async fn history_is_most_recent_date_first() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);

        for date in ["2024-06-01", "2024-06-03", "2024-06-02"] {
            ledger
                .register_initial(item, day(date), 10, 10)
                .expect("register failed");
        }

        let history = ledger.history(item).expect("history failed");
        let dates: Vec<_> = history.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![day("2024-06-03"), day("2024-06-02"), day("2024-06-01")]
        );
    }

    #[tokio::test]
    async fn adjust_patches_only_the_given_fields() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        let record = ledger.register_initial(item, date, 20, 20).expect("register failed");

        let adjusted = ledger
            .adjust(
                record.id,
                InventoryAdjustment {
                    quantity_available: Some(12),
                    ..Default::default()
                },
            )
            .expect("adjust failed");
        assert_eq!(adjusted.quantity_available, 12);
        assert_eq!(adjusted.quantity_produced, 20);
    }

    #[tokio::test]
    async fn adjust_unknown_id_is_not_found() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool);

        let err = ledger
            .adjust(
                Uuid::new_v4(),
                InventoryAdjustment {
                    quantity_available: Some(1),
                    ..Default::default()
                },
            )
            .expect_err("unknown id should fail");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn soft_deleted_records_disappear_from_reads_but_allow_re_registration() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        let record = ledger.register_initial(item, date, 20, 20).expect("register failed");
        assert!(ledger.soft_delete(record.id).expect("delete failed"));

        assert!(ledger.get(item, date).expect("get failed").is_none());
        assert!(ledger.history(item).expect("history failed").is_empty());
        assert!(matches!(
            ledger.soft_delete(record.id),
            Err(DomainError::NotFound)
        ));

        // The partial unique index only guards live rows.
        ledger
            .register_initial(item, date, 8, 8)
            .expect("re-registration after soft delete failed");
    }

    #[tokio::test]
    async fn concurrent_decrements_of_the_last_unit_allow_exactly_one_winner() {
        let (_container, pool) = setup_db().await;
        let ledger = DieselInventoryLedger::new(pool.clone());
        let item = seeded_item(&pool);
        let date = day("2024-06-01");

        ledger.register_initial(item, date, 1, 1).expect("register failed");

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    DieselInventoryLedger::new(pool).decrement(item, date, 1)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one decrement may win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InsufficientStock { .. }))));

        let record = ledger.get(item, date).expect("get failed").expect("exists");
        assert_eq!(record.quantity_available, 0);
    }
}
