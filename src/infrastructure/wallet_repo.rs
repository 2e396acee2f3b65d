use bigdecimal::{BigDecimal, Zero};
use diesel::dsl;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::WalletLedger;
use crate::domain::wallet::{TransactionType, TransactionView, WalletView};
use crate::schema::{wallet_transactions, wallets};

use super::models::{NewWalletRow, NewWalletTransactionRow, WalletRow, WalletTransactionRow};

type LiveWallets = dsl::Filter<wallets::table, dsl::IsNull<wallets::deleted_at>>;

fn live() -> LiveWallets {
    wallets::table.filter(wallets::deleted_at.is_null())
}

fn to_view(row: WalletRow) -> WalletView {
    WalletView {
        id: row.id,
        user_id: row.user_id,
        business_id: row.business_id,
        balance: row.balance,
    }
}

fn tx_to_view(row: WalletTransactionRow) -> Result<TransactionView, DomainError> {
    let tx_type = TransactionType::parse(&row.tx_type).ok_or_else(|| {
        DomainError::Internal(format!("Unknown transaction type '{}'", row.tx_type))
    })?;
    Ok(TransactionView {
        id: row.id,
        wallet_id: row.wallet_id,
        amount: row.amount,
        tx_type,
        description: row.description,
        reference_id: row.reference_id,
        external_reference: row.external_reference,
        created_at: row.created_at,
    })
}

// ── Connection-level primitives ──────────────────────────────────────────────
//
// These run against an already-open connection so the order transaction can
// compose a wallet debit with inventory decrements and order inserts in one
// atomic scope.

/// Fetch the wallet for (user, business), creating it with balance 0 on first
/// access. `ON CONFLICT DO NOTHING` plus the unique (user_id, business_id)
/// constraint makes concurrent first access converge on a single row.
pub(crate) fn get_or_create_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
) -> Result<WalletRow, DomainError> {
    diesel::insert_into(wallets::table)
        .values(&NewWalletRow {
            id: Uuid::new_v4(),
            user_id,
            business_id,
            balance: BigDecimal::zero(),
        })
        .on_conflict((wallets::user_id, wallets::business_id))
        .do_nothing()
        .execute(conn)?;

    live()
        .filter(wallets::user_id.eq(user_id))
        .filter(wallets::business_id.eq(business_id))
        .select(WalletRow::as_select())
        .first(conn)
        .map_err(Into::into)
}

/// Increase the wallet balance and append the matching ledger entry.
pub(crate) fn credit_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
    amount: &BigDecimal,
    tx_type: TransactionType,
    description: &str,
    reference_id: Option<Uuid>,
) -> Result<WalletRow, DomainError> {
    if *amount <= BigDecimal::zero() {
        return Err(DomainError::InvalidAmount);
    }
    let wallet = get_or_create_on(conn, user_id, business_id)?;

    diesel::insert_into(wallet_transactions::table)
        .values(&NewWalletTransactionRow {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            amount: amount.clone(),
            tx_type: tx_type.as_str().to_string(),
            description: description.to_string(),
            reference_id,
            external_reference: None,
        })
        .execute(conn)?;

    diesel::update(wallets::table.find(wallet.id))
        .set(wallets::balance.eq(wallets::balance + amount.clone()))
        .returning(WalletRow::as_returning())
        .get_result(conn)
        .map_err(Into::into)
}

/// Decrease the wallet balance, conditional on sufficiency. The balance check
/// and the subtraction are one SQL statement, so two concurrent debits can
/// never both pass the check against the same pre-debit value.
pub(crate) fn debit_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
    amount: &BigDecimal,
    description: &str,
    reference_id: Option<Uuid>,
) -> Result<WalletRow, DomainError> {
    if *amount <= BigDecimal::zero() {
        return Err(DomainError::InvalidAmount);
    }
    let wallet = get_or_create_on(conn, user_id, business_id)?;

    let updated = diesel::update(
        wallets::table
            .find(wallet.id)
            .filter(wallets::balance.ge(amount.clone())),
    )
    .set(wallets::balance.eq(wallets::balance - amount.clone()))
    .returning(WalletRow::as_returning())
    .get_result::<WalletRow>(conn)
    .optional()?;

    let Some(updated) = updated else {
        return Err(DomainError::InsufficientFunds);
    };

    // Amounts are stored as positive magnitudes; the type carries the sign.
    diesel::insert_into(wallet_transactions::table)
        .values(&NewWalletTransactionRow {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            amount: amount.clone(),
            tx_type: TransactionType::Withdrawal.as_str().to_string(),
            description: description.to_string(),
            reference_id,
            external_reference: None,
        })
        .execute(conn)?;

    Ok(updated)
}

// ── Repository ───────────────────────────────────────────────────────────────

pub struct DieselWalletLedger {
    pool: DbPool,
}

impl DieselWalletLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl WalletLedger for DieselWalletLedger {
    fn get_or_create(&self, user_id: Uuid, business_id: Uuid) -> Result<WalletView, DomainError> {
        let mut conn = self.pool.get()?;
        get_or_create_on(&mut conn, user_id, business_id).map(to_view)
    }

    fn credit(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            credit_on(
                conn,
                user_id,
                business_id,
                &amount,
                TransactionType::Deposit,
                description,
                reference_id,
            )
        })
        .map(to_view)
    }

    fn debit(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        amount: BigDecimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            debit_on(conn, user_id, business_id, &amount, description, reference_id)
        })
        .map(to_view)
    }

    fn transactions(&self, wallet_id: Uuid) -> Result<Vec<TransactionView>, DomainError> {
        let mut conn = self.pool.get()?;
        wallet_transactions::table
            .filter(wallet_transactions::wallet_id.eq(wallet_id))
            .order(wallet_transactions::created_at.desc())
            .select(WalletTransactionRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(tx_to_view)
            .collect()
    }
}
