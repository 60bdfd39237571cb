pub mod auth;
pub mod cart_service;
pub mod gateway;
pub mod inventory_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod payout_service;
pub mod profile_service;
pub mod reservation_service;
pub mod review_service;
pub mod role_service;
pub mod shipment_service;
