pub mod common;

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
pub mod forecasts;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
