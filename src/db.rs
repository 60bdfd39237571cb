pub mod user_repo;
pub use user_repo::UserRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod cart_repo;
pub use cart_repo::CartRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod shipment_repo;
pub use shipment_repo::ShipmentRepository;
pub mod payout_repo;
pub use payout_repo::PayoutRepository;
pub mod review_repo;
pub use review_repo::ReviewRepository;
pub mod notification_repo;
pub use notification_repo::{AuditRepository, NotificationRepository};

pub mod stock_ledger;
pub use stock_ledger::{PgStockLedger, StockLedger};
#[cfg(test)]
pub mod memory_ledger;
#[cfg(test)]
pub mod test_support;
