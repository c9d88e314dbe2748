pub mod checker;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod tracker;
pub mod utils;

// Re-export commonly used types
pub use checker::{CheckOutcome, CheckRunner};
pub use config::{Settings, TargetSpec};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
