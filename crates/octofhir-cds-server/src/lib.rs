pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod services;

pub use config::{AppConfig, CdsConfig, LoggingConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{AppState, OctofhirCdsServer, ServerBuilder, build_app};
