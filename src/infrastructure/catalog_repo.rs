use diesel::dsl;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::ItemView;
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogLookup;
use crate::schema::items;

use super::models::ItemRow;

type LiveItems = dsl::Filter<items::table, dsl::IsNull<items::deleted_at>>;

fn live() -> LiveItems {
    items::table.filter(items::deleted_at.is_null())
}

/// Read-only view into the catalog. Item CRUD belongs to the catalog
/// subsystem; the core only ever resolves id, owner and price.
pub struct DieselCatalogLookup {
    pool: DbPool,
}

impl DieselCatalogLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogLookup for DieselCatalogLookup {
    fn get_item(&self, item_id: Uuid) -> Result<Option<ItemView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = live()
            .find(item_id)
            .select(ItemRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|r| ItemView {
            id: r.id,
            business_id: r.business_id,
            name: r.name,
            price: r.price,
        }))
    }
}
