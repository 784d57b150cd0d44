pub mod config;
pub mod errors;
pub mod paths;

pub use config::{ApiKeys, AppConfig};
pub use paths::AppPaths;
