use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{
    daily_inventory, items, order_items, orders, subscription_items, subscription_payments,
    subscriptions, wallet_transactions, wallets,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub item_type: String,
    pub is_subscription_eligible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = daily_inventory)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity_produced: i32,
    pub quantity_available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = daily_inventory)]
pub struct NewInventoryRow {
    pub id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub quantity_produced: i32,
    pub quantity_available: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub balance: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallets)]
pub struct NewWalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub balance: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = wallet_transactions)]
#[diesel(belongs_to(WalletRow, foreign_key = wallet_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletTransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: BigDecimal,
    pub tx_type: String,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct NewWalletTransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: BigDecimal,
    pub tx_type: String,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub pickup_slot: DateTime<Utc>,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub pickup_slot: DateTime<Utc>,
    pub subscription_id: Option<Uuid>,
    pub is_subscription_order: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub frequency_days: String,
    pub pickup_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub frequency_days: String,
    pub pickup_time: NaiveTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = subscription_items)]
#[diesel(belongs_to(SubscriptionRow, foreign_key = subscription_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionItemRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscription_items)]
pub struct NewSubscriptionItemRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = subscription_payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionPaymentRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscription_payments)]
pub struct NewSubscriptionPaymentRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub external_reference: Option<String>,
}
