pub mod pool;
pub mod queries;
pub mod queries_purchase;
pub mod queries_sales;

pub use pool::{create_lazy_pool, create_pool};
