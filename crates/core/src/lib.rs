//! NSS Core Library
//!
//! Foundational pieces shared by every crate in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, LatestScope, PipelineConfig, StoreConfig};
pub use error::{AppError, AppResult};
