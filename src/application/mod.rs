pub mod inventory_service;
pub mod order_service;
pub mod subscription_service;
pub mod wallet_service;
