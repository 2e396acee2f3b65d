use diesel::dsl;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderDraft, OrderLineView, OrderStatus, OrderView};
use crate::domain::ports::OrderStore;
use crate::schema::{order_items, orders};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};
use super::{inventory_repo, wallet_repo};

type LiveOrders = dsl::Filter<orders::table, dsl::IsNull<orders::deleted_at>>;

fn live() -> LiveOrders {
    orders::table.filter(orders::deleted_at.is_null())
}

fn to_view(row: OrderRow, lines: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    let status = OrderStatus::parse(&row.status)
        .ok_or_else(|| DomainError::Internal(format!("Unknown order status '{}'", row.status)))?;
    Ok(OrderView {
        id: row.id,
        business_id: row.business_id,
        user_id: row.user_id,
        status,
        total_amount: row.total_amount,
        pickup_slot: row.pickup_slot,
        subscription_id: row.subscription_id,
        is_subscription_order: row.is_subscription_order,
        created_at: row.created_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLineView {
                id: l.id,
                item_id: l.item_id,
                staff_id: l.staff_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
    })
}

fn load_view(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let order = live()
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;

    let Some(order) = order else {
        return Ok(None);
    };

    let lines = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .filter(order_items::deleted_at.is_null())
        .select(OrderItemRow::as_select())
        .load(conn)?;

    to_view(order, lines).map(Some)
}

// ── Repository ───────────────────────────────────────────────────────────────

pub struct DieselOrderStore {
    pool: DbPool,
}

impl DieselOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for DieselOrderStore {
    /// The money-and-stock critical section. Wallet debit, per-line inventory
    /// decrements and the header+line inserts run in one database
    /// transaction: a failure at any step rolls back everything before it,
    /// which is also what undoes the debit when a concurrent order exhausts
    /// the stock between our availability pre-check and the decrement.
    fn create_paid(&self, draft: OrderDraft) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        let pickup_date = draft.pickup_slot.date_naive();

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Debit the buyer's wallet for the full total. The ledger entry
            //    references the pre-generated order id before the header row
            //    exists; both commit together or not at all.
            wallet_repo::debit_on(
                conn,
                draft.user_id,
                draft.business_id,
                &draft.total_amount,
                &format!("Order {} for pickup on {}", draft.id, pickup_date),
                Some(draft.id),
            )?;

            // 2. Reserve stock line by line; each decrement is conditional.
            //    Lines are walked in item_id order so two concurrent orders
            //    over the same items take their row locks in the same
            //    sequence and cannot deadlock.
            let mut lines: Vec<_> = draft.lines.iter().collect();
            lines.sort_by_key(|l| l.item_id);
            for line in lines {
                inventory_repo::decrement_on(conn, line.item_id, pickup_date, line.quantity)?;
            }

            // 3. Persist header and lines. The debit already happened, so the
            //    order is born paid.
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: draft.id,
                    business_id: draft.business_id,
                    user_id: draft.user_id,
                    status: OrderStatus::Paid.as_str().to_string(),
                    total_amount: draft.total_amount.clone(),
                    pickup_slot: draft.pickup_slot,
                    subscription_id: draft.subscription_id,
                    is_subscription_order: draft.is_subscription_order,
                })
                .execute(conn)?;

            let new_lines: Vec<NewOrderItemRow> = draft
                .lines
                .iter()
                .map(|l| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id: draft.id,
                    item_id: l.item_id,
                    staff_id: l.staff_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_lines)
                .execute(conn)?;

            load_view(conn, draft.id)?.ok_or_else(|| {
                // Unreachable unless the store itself misbehaves; the rollback
                // returns the debited amount to the wallet.
                log::error!(
                    "order {} vanished between insert and read-back; rolling back debit of {}",
                    draft.id,
                    draft.total_amount
                );
                DomainError::Inconsistent(format!(
                    "order {} not readable after insert",
                    draft.id
                ))
            })
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_view(&mut conn, id)
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;
        // No transition matrix: any status may follow any status.
        let affected = diesel::update(live().find(id))
            .set(orders::status.eq(status.as_str()))
            .execute(&mut conn)?;
        if affected == 0 {
            return Err(DomainError::NotFound);
        }
        load_view(&mut conn, id)?.ok_or(DomainError::NotFound)
    }

    fn for_business(
        &self,
        business_id: Uuid,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let mut query = live()
            .filter(orders::business_id.eq(business_id))
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(orders::status.eq(status.as_str()));
        }
        let rows = query.load(&mut conn)?;
        attach_lines(&mut conn, rows)
    }

    fn for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = live()
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .order(orders::created_at.desc())
            .load(&mut conn)?;
        attach_lines(&mut conn, rows)
    }
}

fn attach_lines(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<OrderView>, DomainError> {
    let lines = OrderItemRow::belonging_to(&rows)
        .filter(order_items::deleted_at.is_null())
        .select(OrderItemRow::as_select())
        .load(conn)?
        .grouped_by(&rows);

    rows.into_iter()
        .zip(lines)
        .map(|(order, lines)| to_view(order, lines))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, TimeZone, Utc};
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderStore;
    use crate::db::DbPool;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderDraft, OrderStatus, PricedLine};
    use crate::domain::ports::{InventoryLedger, OrderStore, WalletLedger};
    use crate::infrastructure::inventory_repo::DieselInventoryLedger;
    use crate::infrastructure::test_support::{seed_item, setup_db};
    use crate::infrastructure::wallet_repo::DieselWalletLedger;
    use crate::schema::{order_items, orders, wallet_transactions};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn pickup_date() -> NaiveDate {
        "2024-06-01".parse().expect("valid date")
    }

    fn draft(
        business_id: Uuid,
        user_id: Uuid,
        lines: Vec<PricedLine>,
        total: &str,
    ) -> OrderDraft {
        OrderDraft {
            id: Uuid::new_v4(),
            business_id,
            user_id,
            pickup_slot: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            total_amount: dec(total),
            subscription_id: None,
            is_subscription_order: false,
            lines,
        }
    }

    fn line(item_id: Uuid, quantity: i32, unit_price: &str) -> PricedLine {
        PricedLine {
            item_id,
            quantity,
            staff_id: None,
            unit_price: dec(unit_price),
        }
    }

    fn count_orders(pool: &DbPool) -> i64 {
        let mut conn = pool.get().expect("Failed to get connection");
        orders::table.count().get_result(&mut conn).expect("count failed")
    }

    fn count_order_items(pool: &DbPool) -> i64 {
        let mut conn = pool.get().expect("Failed to get connection");
        order_items::table
            .count()
            .get_result(&mut conn)
            .expect("count failed")
    }

    fn count_withdrawals(pool: &DbPool) -> i64 {
        let mut conn = pool.get().expect("Failed to get connection");
        wallet_transactions::table
            .filter(wallet_transactions::tx_type.eq("withdrawal"))
            .count()
            .get_result(&mut conn)
            .expect("count failed")
    }

    #[tokio::test]
    async fn paid_order_debits_wallet_and_consumes_stock() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 20, 20)
            .expect("register failed");
        wallets
            .credit(user, business, dec("50.00"), "top-up", None)
            .expect("credit failed");

        let order = store
            .create_paid(draft(business, user, vec![line(item, 5, "3.50")], "17.50"))
            .expect("create failed");

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total_amount, dec("17.50"));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 5);

        let stock = inventory
            .get(item, pickup_date())
            .expect("get failed")
            .expect("exists");
        assert_eq!(stock.quantity_available, 15);

        let wallet = wallets.get_or_create(user, business).expect("fetch failed");
        assert_eq!(wallet.balance, dec("32.50"));

        // The debit entry points back at the order.
        let txs = wallets.transactions(wallet.id).expect("transactions failed");
        assert_eq!(txs[0].reference_id, Some(order.id));
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_no_trace() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 20, 20)
            .expect("register failed");
        wallets
            .credit(user, business, dec("10.00"), "top-up", None)
            .expect("credit failed");

        let err = store
            .create_paid(draft(business, user, vec![line(item, 5, "3.50")], "17.50"))
            .expect_err("underfunded order should fail");
        assert!(matches!(err, DomainError::InsufficientFunds));

        assert_eq!(count_orders(&pool), 0);
        assert_eq!(count_order_items(&pool), 0);
        assert_eq!(count_withdrawals(&pool), 0);

        let stock = inventory
            .get(item, pickup_date())
            .expect("get failed")
            .expect("exists");
        assert_eq!(stock.quantity_available, 20);

        let wallet = wallets.get_or_create(user, business).expect("fetch failed");
        assert_eq!(wallet.balance, dec("10.00"));
    }

    #[tokio::test]
    async fn stock_shortage_after_debit_rolls_the_debit_back() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 1, 1)
            .expect("register failed");
        wallets
            .credit(user, business, dec("50.00"), "top-up", None)
            .expect("credit failed");

        let err = store
            .create_paid(draft(business, user, vec![line(item, 2, "3.50")], "7.00"))
            .expect_err("short stock should fail");
        assert!(matches!(err, DomainError::InsufficientStock { .. }));

        // The debit ran before the decrement, so the rollback must return it.
        let wallet = wallets.get_or_create(user, business).expect("fetch failed");
        assert_eq!(wallet.balance, dec("50.00"));
        assert_eq!(count_withdrawals(&pool), 0);
        assert_eq!(count_orders(&pool), 0);
    }

    #[tokio::test]
    async fn multi_line_failure_releases_earlier_line_reservations() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let stocked = seed_item(&pool, business, "croissant", "3.50");
        let scarce = seed_item(&pool, business, "baguette", "2.00");

        inventory
            .register_initial(stocked, pickup_date(), 10, 10)
            .expect("register failed");
        inventory
            .register_initial(scarce, pickup_date(), 1, 1)
            .expect("register failed");
        wallets
            .credit(user, business, dec("100.00"), "top-up", None)
            .expect("credit failed");

        let err = store
            .create_paid(draft(
                business,
                user,
                vec![line(stocked, 2, "3.50"), line(scarce, 2, "2.00")],
                "11.00",
            ))
            .expect_err("second line should fail");
        assert!(matches!(err, DomainError::InsufficientStock { item_id, .. } if item_id == scarce));

        // The first line's decrement must have been undone with the rest.
        let stock = inventory
            .get(stocked, pickup_date())
            .expect("get failed")
            .expect("exists");
        assert_eq!(stock.quantity_available, 10);
    }

    #[tokio::test]
    async fn concurrent_orders_for_the_last_unit_allow_exactly_one_winner() {
        let (_container, pool) = setup_db().await;
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let business = Uuid::new_v4();
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 1, 1)
            .expect("register failed");

        // Two buyers, both funded; stock only covers one.
        let buyers: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        for buyer in &buyers {
            wallets
                .credit(*buyer, business, dec("10.00"), "top-up", None)
                .expect("credit failed");
        }

        let handles: Vec<_> = buyers
            .iter()
            .map(|buyer| {
                let pool = pool.clone();
                let buyer = *buyer;
                std::thread::spawn(move || {
                    DieselOrderStore::new(pool).create_paid(OrderDraft {
                        id: Uuid::new_v4(),
                        business_id: business,
                        user_id: buyer,
                        pickup_slot: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
                        total_amount: dec("3.50"),
                        subscription_id: None,
                        is_subscription_order: false,
                        lines: vec![PricedLine {
                            item_id: item,
                            quantity: 1,
                            staff_id: None,
                            unit_price: dec("3.50"),
                        }],
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one order may win the last unit");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InsufficientStock { .. }))));

        let stock = inventory
            .get(item, pickup_date())
            .expect("get failed")
            .expect("exists");
        assert_eq!(stock.quantity_available, 0);

        // Only the winner was charged.
        assert_eq!(count_orders(&pool), 1);
        assert_eq!(count_withdrawals(&pool), 1);
    }

    #[tokio::test]
    async fn concurrent_orders_listing_the_same_items_in_opposite_order_both_succeed() {
        let (_container, pool) = setup_db().await;
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let business = Uuid::new_v4();
        let first_item = seed_item(&pool, business, "croissant", "3.50");
        let second_item = seed_item(&pool, business, "baguette", "2.00");

        for item in [first_item, second_item] {
            inventory
                .register_initial(item, pickup_date(), 10, 10)
                .expect("register failed");
        }

        let buyers: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        for buyer in &buyers {
            wallets
                .credit(*buyer, business, dec("20.00"), "top-up", None)
                .expect("credit failed");
        }

        // One order lists (a, b), the other (b, a); the store must still take
        // the row locks in a single global order.
        let handles: Vec<_> = buyers
            .iter()
            .enumerate()
            .map(|(i, buyer)| {
                let pool = pool.clone();
                let buyer = *buyer;
                let lines = if i == 0 {
                    vec![line(first_item, 1, "3.50"), line(second_item, 1, "2.00")]
                } else {
                    vec![line(second_item, 1, "2.00"), line(first_item, 1, "3.50")]
                };
                std::thread::spawn(move || {
                    DieselOrderStore::new(pool).create_paid(draft(business, buyer, lines, "5.50"))
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .expect("thread panicked")
                .expect("both orders should commit");
        }

        for item in [first_item, second_item] {
            let stock = inventory
                .get(item, pickup_date())
                .expect("get failed")
                .expect("exists");
            assert_eq!(stock.quantity_available, 8);
        }
    }

    #[tokio::test]
    async fn update_status_moves_the_order_and_rejects_unknown_ids() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 5, 5)
            .expect("register failed");
        wallets
            .credit(user, business, dec("10.00"), "top-up", None)
            .expect("credit failed");

        let order = store
            .create_paid(draft(business, user, vec![line(item, 1, "3.50")], "3.50"))
            .expect("create failed");

        let updated = store
            .update_status(order.id, OrderStatus::Ready)
            .expect("update failed");
        assert_eq!(updated.status, OrderStatus::Ready);

        assert!(matches!(
            store.update_status(Uuid::new_v4(), OrderStatus::Ready),
            Err(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn business_listing_filters_by_status_newest_first() {
        let (_container, pool) = setup_db().await;
        let store = DieselOrderStore::new(pool.clone());
        let inventory = DieselInventoryLedger::new(pool.clone());
        let wallets = DieselWalletLedger::new(pool.clone());
        let (business, user) = (Uuid::new_v4(), Uuid::new_v4());
        let item = seed_item(&pool, business, "croissant", "3.50");

        inventory
            .register_initial(item, pickup_date(), 10, 10)
            .expect("register failed");
        wallets
            .credit(user, business, dec("50.00"), "top-up", None)
            .expect("credit failed");

        let first = store
            .create_paid(draft(business, user, vec![line(item, 1, "3.50")], "3.50"))
            .expect("create failed");
        let second = store
            .create_paid(draft(business, user, vec![line(item, 1, "3.50")], "3.50"))
            .expect("create failed");
        store
            .update_status(first.id, OrderStatus::Collected)
            .expect("update failed");

        let all = store.for_business(business, None).expect("list failed");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id, "newest first");
        assert_eq!(all[0].lines.len(), 1, "lines are attached");

        let collected = store
            .for_business(business, Some(OrderStatus::Collected))
            .expect("list failed");
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, first.id);

        let mine = store.for_user(user).expect("list failed");
        assert_eq!(mine.len(), 2);
    }
}
