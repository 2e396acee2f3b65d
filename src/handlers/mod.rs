pub mod inventory;
pub mod orders;
pub mod subscriptions;
pub mod wallet;
