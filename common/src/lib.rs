pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::WorkerConfig;
pub use domain::{QueueMember, SourceType, TenantId};
pub use error::AppError;
