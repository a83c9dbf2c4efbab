//! Service registry.
//!
//! Built once at startup and read-only afterwards. Services are kept in
//! registration order, which is also the discovery order.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{CdsError, Result};
use crate::hook::Hook;
use crate::prefetch::PrefetchContract;
use crate::service::{Service, ServiceDescriptor, ServiceHandler};

/// A service together with its compiled prefetch contract.
#[derive(Debug)]
pub struct RegisteredService {
    service: Service,
    prefetch: PrefetchContract,
}

impl RegisteredService {
    /// Check the descriptor and compile the prefetch contract.
    pub fn compile(service: Service) -> Result<Self> {
        let descriptor = service.descriptor();
        if descriptor.id.trim().is_empty() {
            return Err(CdsError::invalid_service(
                &descriptor.id,
                "id must not be empty",
            ));
        }
        if descriptor.id.contains('/') {
            return Err(CdsError::invalid_service(
                &descriptor.id,
                "id must be a single path segment",
            ));
        }
        if descriptor.description.trim().is_empty() {
            return Err(CdsError::invalid_service(
                &descriptor.id,
                "description must not be empty",
            ));
        }

        let prefetch = PrefetchContract::compile(&descriptor.id, descriptor.prefetch.as_ref())?;
        Ok(Self { service, prefetch })
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        self.service.descriptor()
    }

    pub fn id(&self) -> &str {
        self.service.id()
    }

    pub fn hook(&self) -> Hook {
        self.service.descriptor().hook
    }

    pub fn prefetch(&self) -> &PrefetchContract {
        &self.prefetch
    }

    pub fn handler(&self) -> &Arc<dyn ServiceHandler> {
        self.service.handler()
    }
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Arc<RegisteredService>>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RegisteredService>> {
        self.services.get(id)
    }

    /// Public descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.services
            .values()
            .map(|s| s.descriptor().clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredService>> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ServiceRegistryBuilder {
    services: IndexMap<String, Arc<RegisteredService>>,
}

impl ServiceRegistryBuilder {
    /// Add a service. Fails on a duplicate id or an invalid descriptor.
    pub fn register(mut self, service: Service) -> Result<Self> {
        if self.services.contains_key(service.id()) {
            return Err(CdsError::duplicate_service(service.id()));
        }
        let registered = RegisteredService::compile(service)?;
        debug!(
            service_id = %registered.id(),
            hook = %registered.hook(),
            prefetch_keys = ?registered.prefetch().required_keys(),
            "CDS service registered"
        );
        self.services
            .insert(registered.id().to_string(), Arc::new(registered));
        Ok(self)
    }

    /// Add several services in order.
    pub fn register_all(self, services: impl IntoIterator<Item = Service>) -> Result<Self> {
        services
            .into_iter()
            .try_fold(self, |builder, service| builder.register(service))
    }

    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}
