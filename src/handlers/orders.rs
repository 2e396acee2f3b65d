use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::db::DbPool;
use crate::domain::order::{OrderLineRequest, OrderStatus, OrderView};
use crate::errors::AppError;
use crate::infrastructure::catalog_repo::DieselCatalogLookup;
use crate::infrastructure::inventory_repo::DieselInventoryLedger;
use crate::infrastructure::order_repo::DieselOrderStore;

fn service(pool: DbPool) -> OrderService<DieselCatalogLookup, DieselInventoryLedger, DieselOrderStore> {
    OrderService::new(
        DieselCatalogLookup::new(pool.clone()),
        DieselInventoryLedger::new(pool.clone()),
        DieselOrderStore::new(pool),
    )
}

fn parse_status(s: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::parse(s)
        .ok_or_else(|| AppError::Validation(format!("Unknown order status '{}'", s)))
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    pub user_id: Uuid,
    /// RFC 3339 timestamp; the date part selects the inventory day.
    pub pickup_slot: DateTime<Utc>,
    pub items: Vec<CreateOrderLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BusinessOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_amount: String,
    pub pickup_slot: String,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
    pub created_at: String,
    pub items: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        OrderResponse {
            id: order.id,
            business_id: order.business_id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            total_amount: order.total_amount.to_string(),
            pickup_slot: order.pickup_slot.to_rfc3339(),
            subscription_id: order.subscription_id,
            is_subscription_order: order.is_subscription_order,
            created_at: order.created_at.to_rfc3339(),
            items: order
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.id,
                    item_id: l.item_id,
                    staff_id: l.staff_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order: resolves each line against the catalog, checks the day's
/// stock, debits the buyer's wallet and persists header plus lines. Wallet
/// debit, stock decrements and inserts share one database transaction, so a
/// failure at any step leaves no partial financial or stock effect.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created and paid", body = OrderResponse),
        (status = 400, description = "Insufficient stock or funds, or invalid quantity"),
        (status = 404, description = "Unknown item"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    pool: web::Data<DbPool>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let order = web::block(move || {
        let lines: Vec<OrderLineRequest> = body
            .items
            .iter()
            .map(|l| OrderLineRequest {
                item_id: l.item_id,
                quantity: l.quantity,
                staff_id: l.staff_id,
            })
            .collect();
        service(pool.get_ref().clone())
            .create_order(body.business_id, body.user_id, body.pickup_slot, lines)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || {
        service(pool.get_ref().clone())
            .get_order(order_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match order {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(AppError::NotFound),
    }
}

/// PATCH /orders/{id}/status
///
/// Moves the order to a new status. Transitions are unrestricted.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status value"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let status = parse_status(&body.status)?;

    let order = web::block(move || {
        service(pool.get_ref().clone())
            .update_status(order_id, status)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders/business/{business_id}?status=
#[utoipa::path(
    get,
    path = "/orders/business/{business_id}",
    params(
        ("business_id" = Uuid, Path, description = "Business id"),
        ("status" = Option<String>, Query, description = "Optional status filter"),
    ),
    responses(
        (status = 200, description = "Orders for the business, newest first", body = [OrderResponse]),
    ),
    tag = "orders"
)]
pub async fn business_orders(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<BusinessOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let business_id = path.into_inner();
    let status = query
        .into_inner()
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;

    let orders = web::block(move || {
        service(pool.get_ref().clone())
            .orders_for_business(business_id, status)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let responses: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// GET /orders/user/{user_id}
#[utoipa::path(
    get,
    path = "/orders/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Orders placed by the user, newest first", body = [OrderResponse]),
    ),
    tag = "orders"
)]
pub async fn user_orders(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    let orders = web::block(move || {
        service(pool.get_ref().clone())
            .orders_for_user(user_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let responses: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}
