pub mod connection;
pub mod repositories;
pub mod store;

// Re-export the connection module's functions for ease of use
pub use connection::{create_pool, verify_connection};
pub use repositories::PaymentRepository;
pub use store::PaymentStore;
