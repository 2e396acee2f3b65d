use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::wallet_service::WalletService;
use crate::db::DbPool;
use crate::domain::wallet::{TransactionView, WalletView};
use crate::errors::AppError;
use crate::infrastructure::wallet_repo::DieselWalletLedger;

fn service(pool: DbPool) -> WalletService<DieselWalletLedger> {
    WalletService::new(DieselWalletLedger::new(pool))
}

fn parse_amount(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw)
        .map_err(|_| AppError::Validation(format!("Invalid decimal amount '{}'", raw)))
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct BalanceQuery {
    pub user_id: Uuid,
    pub business_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveFundsRequest {
    pub user_id: Uuid,
    pub business_id: Uuid,
    /// Decimal amount as a string, e.g. "25.50"
    pub amount: String,
    pub description: Option<String>,
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub balance: String,
}

impl From<WalletView> for WalletResponse {
    fn from(wallet: WalletView) -> Self {
        WalletResponse {
            id: wallet.id,
            user_id: wallet.user_id,
            business_id: wallet.business_id,
            balance: wallet.balance.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: String,
    pub tx_type: String,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub external_reference: Option<String>,
    pub created_at: String,
}

impl From<TransactionView> for TransactionResponse {
    fn from(tx: TransactionView) -> Self {
        TransactionResponse {
            id: tx.id,
            wallet_id: tx.wallet_id,
            amount: tx.amount.to_string(),
            tx_type: tx.tx_type.as_str().to_string(),
            description: tx.description,
            reference_id: tx.reference_id,
            external_reference: tx.external_reference,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /wallet/balance?user_id=&business_id=
///
/// Creates the wallet with a zero balance on first access.
#[utoipa::path(
    get,
    path = "/wallet/balance",
    params(
        ("user_id" = Uuid, Query, description = "User id"),
        ("business_id" = Uuid, Query, description = "Business id"),
    ),
    responses(
        (status = 200, description = "Wallet balance", body = WalletResponse),
    ),
    tag = "wallet"
)]
pub async fn wallet_balance(
    pool: web::Data<DbPool>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();

    let wallet = web::block(move || {
        service(pool.get_ref().clone())
            .balance(query.user_id, query.business_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(WalletResponse::from(wallet)))
}

/// POST /wallet/deposit
#[utoipa::path(
    post,
    path = "/wallet/deposit",
    request_body = MoveFundsRequest,
    responses(
        (status = 200, description = "Balance after the deposit", body = WalletResponse),
        (status = 400, description = "Non-positive or malformed amount"),
    ),
    tag = "wallet"
)]
pub async fn deposit(
    pool: web::Data<DbPool>,
    body: web::Json<MoveFundsRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let amount = parse_amount(&body.amount)?;

    let wallet = web::block(move || {
        let description = body.description.as_deref().unwrap_or("Deposit");
        service(pool.get_ref().clone())
            .deposit(
                body.user_id,
                body.business_id,
                amount,
                description,
                body.reference_id,
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(WalletResponse::from(wallet)))
}

/// POST /wallet/withdraw
///
/// Fails with 400 when the wallet cannot cover the amount; the balance never
/// goes negative.
#[utoipa::path(
    post,
    path = "/wallet/withdraw",
    request_body = MoveFundsRequest,
    responses(
        (status = 200, description = "Balance after the withdrawal", body = WalletResponse),
        (status = 400, description = "Insufficient balance, or non-positive or malformed amount"),
    ),
    tag = "wallet"
)]
pub async fn withdraw(
    pool: web::Data<DbPool>,
    body: web::Json<MoveFundsRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let amount = parse_amount(&body.amount)?;

    let wallet = web::block(move || {
        let description = body.description.as_deref().unwrap_or("Withdrawal");
        service(pool.get_ref().clone())
            .withdraw(
                body.user_id,
                body.business_id,
                amount,
                description,
                body.reference_id,
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(WalletResponse::from(wallet)))
}

/// GET /wallet/{wallet_id}/transactions
#[utoipa::path(
    get,
    path = "/wallet/{wallet_id}/transactions",
    params(("wallet_id" = Uuid, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = [TransactionResponse]),
    ),
    tag = "wallet"
)]
pub async fn wallet_transactions(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let wallet_id = path.into_inner();

    let txs = web::block(move || {
        service(pool.get_ref().clone())
            .transactions(wallet_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let responses: Vec<TransactionResponse> = txs.into_iter().map(TransactionResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}
