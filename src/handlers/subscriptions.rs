use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::subscription_service::SubscriptionService;
use crate::db::DbPool;
use crate::domain::subscription::{SubscriptionLineRequest, SubscriptionStatus, SubscriptionView};
use crate::errors::AppError;
use crate::infrastructure::catalog_repo::DieselCatalogLookup;
use crate::infrastructure::subscription_repo::DieselSubscriptionStore;

fn service(pool: DbPool) -> SubscriptionService<DieselCatalogLookup, DieselSubscriptionStore> {
    SubscriptionService::new(
        DieselCatalogLookup::new(pool.clone()),
        DieselSubscriptionStore::new(pool),
    )
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, AppError> {
    SubscriptionStatus::parse(s)
        .ok_or_else(|| AppError::Validation(format!("Unknown subscription status '{}'", s)))
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionLineDto {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    pub business_id: Uuid,
    /// Comma-separated weekday codes, e.g. "MON,WED,FRI"
    pub frequency_days: String,
    /// Pickup time of day, e.g. "08:30:00"
    pub pickup_time: NaiveTime,
    pub items: Vec<SubscriptionLineDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubscriptionStatusRequest {
    pub status: String,
    /// When set, also advances the current billing period end.
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Decimal amount as a string, e.g. "25.50"
    pub amount: String,
    pub status: String,
    pub external_reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionItemResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    pub current_period_end: Option<String>,
    pub frequency_days: String,
    pub pickup_time: String,
    pub created_at: String,
    pub items: Vec<SubscriptionItemResponse>,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(sub: SubscriptionView) -> Self {
        SubscriptionResponse {
            id: sub.id,
            user_id: sub.user_id,
            business_id: sub.business_id,
            status: sub.status.as_str().to_string(),
            current_period_end: sub.current_period_end.map(|t| t.to_rfc3339()),
            frequency_days: sub.frequency_days,
            pickup_time: sub.pickup_time.format("%H:%M:%S").to_string(),
            created_at: sub.created_at.to_rfc3339(),
            items: sub
                .items
                .into_iter()
                .map(|i| SubscriptionItemResponse {
                    id: i.id,
                    item_id: i.item_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: String,
    pub status: String,
    pub external_reference: Option<String>,
    pub created_at: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /subscriptions
///
/// Creates an active subscription with plan-line prices frozen at subscribe
/// time and a billing period ending 30 days out.
#[utoipa::path(
    post,
    path = "/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Unknown item"),
    ),
    tag = "subscriptions"
)]
pub async fn create_subscription(
    pool: web::Data<DbPool>,
    body: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let sub = web::block(move || {
        let lines: Vec<SubscriptionLineRequest> = body
            .items
            .iter()
            .map(|l| SubscriptionLineRequest {
                item_id: l.item_id,
                quantity: l.quantity,
            })
            .collect();
        service(pool.get_ref().clone())
            .subscribe(
                body.user_id,
                body.business_id,
                body.frequency_days,
                body.pickup_time,
                lines,
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(SubscriptionResponse::from(sub)))
}

/// GET /subscriptions/{id}
#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Subscription found", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found"),
    ),
    tag = "subscriptions"
)]
pub async fn get_subscription(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let sub = web::block(move || {
        service(pool.get_ref().clone())
            .get_subscription(id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match sub {
        Some(sub) => Ok(HttpResponse::Ok().json(SubscriptionResponse::from(sub))),
        None => Err(AppError::NotFound),
    }
}

/// PATCH /subscriptions/{id}/status
///
/// Renewal and cancellation both pass through here: the scheduler marks a
/// paid cycle `active` with a new period end, or `past_due` after a failed
/// charge.
#[utoipa::path(
    patch,
    path = "/subscriptions/{id}/status",
    params(("id" = Uuid, Path, description = "Subscription id")),
    request_body = UpdateSubscriptionStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = SubscriptionResponse),
        (status = 400, description = "Unknown status value"),
        (status = 404, description = "Subscription not found"),
    ),
    tag = "subscriptions"
)]
pub async fn update_subscription_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateSubscriptionStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let status = parse_status(&body.status)?;

    let sub = web::block(move || {
        service(pool.get_ref().clone())
            .update_status(id, status, body.current_period_end)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SubscriptionResponse::from(sub)))
}

/// POST /subscriptions/{id}/payments
///
/// Appends a billing attempt to the subscription's payment log. The log is
/// informational; it never moves wallet funds.
#[utoipa::path(
    post,
    path = "/subscriptions/{id}/payments",
    params(("id" = Uuid, Path, description = "Subscription id")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Malformed amount"),
        (status = 404, description = "Subscription not found"),
    ),
    tag = "subscriptions"
)]
pub async fn record_payment(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let subscription_id = path.into_inner();
    let body = body.into_inner();
    let amount = BigDecimal::from_str(&body.amount)
        .map_err(|_| AppError::Validation(format!("Invalid decimal amount '{}'", body.amount)))?;

    let payment = web::block(move || {
        service(pool.get_ref().clone())
            .record_payment(
                subscription_id,
                amount,
                &body.status,
                body.external_reference.as_deref(),
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PaymentResponse {
        id: payment.id,
        subscription_id: payment.subscription_id,
        amount: payment.amount.to_string(),
        status: payment.status,
        external_reference: payment.external_reference,
        created_at: payment.created_at.to_rfc3339(),
    }))
}

/// GET /subscriptions/user/{user_id}
#[utoipa::path(
    get,
    path = "/subscriptions/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Subscriptions for the user, newest first", body = [SubscriptionResponse]),
    ),
    tag = "subscriptions"
)]
pub async fn user_subscriptions(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    let subs = web::block(move || {
        service(pool.get_ref().clone())
            .subscriptions_for_user(user_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let responses: Vec<SubscriptionResponse> =
        subs.into_iter().map(SubscriptionResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}
