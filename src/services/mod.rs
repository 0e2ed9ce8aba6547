// Shared rules
pub mod listing;
pub mod stock;
pub mod vat;

// Service factory for dependency injection
pub mod factory;

// Accounts
pub mod properties;
pub mod users;

// Parts and stock movements
pub mod deployments;
pub mod parts;
pub mod procurements;

// Bookkeeping
pub mod expenses;
pub mod sales;

// Analytics and public lookup
pub mod client_portal;
pub mod forecasting;

pub use factory::{ServiceContainer, ServiceFactory};
