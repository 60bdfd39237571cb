pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod payouts;
pub mod profile;
pub mod session;
pub mod shipments;
