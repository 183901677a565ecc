pub mod export;
pub mod filter;
pub mod loader;
pub mod summary;

pub use filter::{FilterOptions, FilterQuery, FilterSelection, attention_rows};
pub use loader::{DeliveryDataset, DeliveryLoader, LoadError};
pub use summary::DashboardSummary;
