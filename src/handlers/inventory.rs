use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::inventory_service::InventoryService;
use crate::db::DbPool;
use crate::domain::inventory::{InventoryAdjustment, InventoryView};
use crate::errors::AppError;
use crate::infrastructure::inventory_repo::DieselInventoryLedger;

fn service(pool: DbPool) -> InventoryService<DieselInventoryLedger> {
    InventoryService::new(DieselInventoryLedger::new(pool))
}

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterInventoryRequest {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity_produced: i32,
    pub quantity_available: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityQuery {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustInventoryRequest {
    pub quantity_produced: Option<i32>,
    pub quantity_available: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity_produced: i32,
    pub quantity_available: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<InventoryView> for InventoryResponse {
    fn from(view: InventoryView) -> Self {
        InventoryResponse {
            id: view.id,
            item_id: view.item_id,
            date: view.date,
            quantity_produced: view.quantity_produced,
            quantity_available: view.quantity_available,
            created_at: view.created_at.to_rfc3339(),
            updated_at: view.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity: i32,
    pub available: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /inventory
///
/// Registers the first stock record for an (item, date) pair. Conflicts with
/// an existing live record.
#[utoipa::path(
    post,
    path = "/inventory",
    request_body = RegisterInventoryRequest,
    responses(
        (status = 201, description = "Stock registered", body = InventoryResponse),
        (status = 400, description = "Negative quantity"),
        (status = 409, description = "A live record already exists for this item and date"),
    ),
    tag = "inventory"
)]
pub async fn register_inventory(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterInventoryRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let view = web::block(move || {
        service(pool.get_ref().clone())
            .register_initial_stock(
                body.item_id,
                body.date,
                body.quantity_produced,
                body.quantity_available,
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(InventoryResponse::from(view)))
}

/// PUT /inventory/set-stock
///
/// Declarative "stock for this day is N". Overwrites both produced and
/// available counts, never accumulates onto them.
#[utoipa::path(
    put,
    path = "/inventory/set-stock",
    request_body = SetStockRequest,
    responses(
        (status = 200, description = "Stock set", body = InventoryResponse),
        (status = 400, description = "Negative quantity"),
    ),
    tag = "inventory"
)]
pub async fn set_stock(
    pool: web::Data<DbPool>,
    body: web::Json<SetStockRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let view = web::block(move || {
        service(pool.get_ref().clone())
            .set_stock(body.item_id, body.date, body.quantity)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(InventoryResponse::from(view)))
}

/// GET /inventory/availability?item_id=&date=&quantity=
#[utoipa::path(
    get,
    path = "/inventory/availability",
    params(
        ("item_id" = Uuid, Query, description = "Item id"),
        ("date" = NaiveDate, Query, description = "Inventory day, YYYY-MM-DD"),
        ("quantity" = i32, Query, description = "Requested quantity"),
    ),
    responses(
        (status = 200, description = "Whether the requested quantity can be served", body = AvailabilityResponse),
    ),
    tag = "inventory"
)]
pub async fn check_availability(
    pool: web::Data<DbPool>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let (item_id, date, quantity) = (query.item_id, query.date, query.quantity);

    let available = web::block(move || {
        service(pool.get_ref().clone())
            .check_availability(item_id, date, quantity)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        item_id,
        date,
        quantity,
        available,
    }))
}

/// GET /inventory/stock/{item_id}/{date}
#[utoipa::path(
    get,
    path = "/inventory/stock/{item_id}/{date}",
    params(
        ("item_id" = Uuid, Path, description = "Item id"),
        ("date" = NaiveDate, Path, description = "Inventory day, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Stock record for the day", body = InventoryResponse),
        (status = 404, description = "No live record for this item and date"),
    ),
    tag = "inventory"
)]
pub async fn stock_for_date(
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, NaiveDate)>,
) -> Result<HttpResponse, AppError> {
    let (item_id, date) = path.into_inner();

    let view = web::block(move || {
        service(pool.get_ref().clone())
            .stock_for_date(item_id, date)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    match view {
        Some(view) => Ok(HttpResponse::Ok().json(InventoryResponse::from(view))),
        None => Err(AppError::NotFound),
    }
}

/// GET /inventory/history/{item_id}
#[utoipa::path(
    get,
    path = "/inventory/history/{item_id}",
    params(("item_id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Live stock records, most recent day first", body = [InventoryResponse]),
    ),
    tag = "inventory"
)]
pub async fn inventory_history(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();

    let views = web::block(move || {
        service(pool.get_ref().clone())
            .history(item_id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let responses: Vec<InventoryResponse> = views.into_iter().map(InventoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// PATCH /inventory/{id}
///
/// Manual correction of a single stock record; unset fields keep their value.
#[utoipa::path(
    patch,
    path = "/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Record adjusted", body = InventoryResponse),
        (status = 400, description = "Empty adjustment or negative quantity"),
        (status = 404, description = "Record not found"),
    ),
    tag = "inventory"
)]
pub async fn adjust_inventory(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<AdjustInventoryRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();

    let view = web::block(move || {
        service(pool.get_ref().clone())
            .adjust(
                id,
                InventoryAdjustment {
                    quantity_produced: body.quantity_produced,
                    quantity_available: body.quantity_available,
                },
            )
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(InventoryResponse::from(view)))
}

/// DELETE /inventory/{id}
///
/// Soft delete: the record keeps its row but leaves every live query, and its
/// (item, date) slot becomes reusable.
#[utoipa::path(
    delete,
    path = "/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    responses(
        (status = 204, description = "Record removed"),
        (status = 404, description = "Record not found"),
    ),
    tag = "inventory"
)]
pub async fn remove_inventory(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || {
        service(pool.get_ref().clone())
            .remove(id)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::NoContent().finish())
}
