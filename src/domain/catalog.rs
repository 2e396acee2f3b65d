use bigdecimal::BigDecimal;
use uuid::Uuid;

/// The slice of a catalog item the order path needs: existence, ownership and
/// the price that gets snapshotted into order and subscription lines.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
}
