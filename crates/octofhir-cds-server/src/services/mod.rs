//! Bundled example CDS services.

pub mod current_time;
pub mod echo;
pub mod order_suggestion;
pub mod patient_greeting;

use octofhir_cds_core::{CdsError, Service, ServiceRegistry};

use crate::config::CdsConfig;

/// Every bundled example, in discovery order.
pub fn examples() -> Vec<Service> {
    let mut services = echo::services();
    services.push(patient_greeting::service());
    services.push(order_suggestion::service());
    services.push(current_time::service());
    services
}

/// Registry for the configured CDS settings plus any `extra` services.
pub fn build_registry(
    cds: &CdsConfig,
    extra: impl IntoIterator<Item = Service>,
) -> Result<ServiceRegistry, CdsError> {
    let mut builder = ServiceRegistry::builder();
    if cds.example_services {
        builder = builder.register_all(examples())?;
    }
    Ok(builder.register_all(extra)?.build())
}
