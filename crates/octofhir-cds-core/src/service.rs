//! CDS services: public descriptor plus handler.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hook::Hook;
use crate::model::{Decision, HookRequest};
use crate::prefetch::PrefetchTemplate;

/// The discovery entry of a service. Never carries the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub hook: Hook,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<PrefetchTemplate>,
}

impl ServiceDescriptor {
    /// New descriptor with a generated id.
    pub fn new(hook: Hook, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hook,
            title: None,
            description: description.into(),
            prefetch: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a prefetch template entry, e.g. `("patient", "Patient/{{context.patientId}}")`.
    pub fn with_prefetch(mut self, key: impl Into<String>, query: impl Into<String>) -> Self {
        self.prefetch
            .get_or_insert_with(PrefetchTemplate::new)
            .insert(key.into(), query.into());
        self
    }
}

/// A handler fault. Surfaces as a 500 without details.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Decision logic of a CDS service.
///
/// Handlers may suspend freely; the dispatcher holds no locks while they run.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn handle(&self, request: HookRequest) -> Result<Decision, ServiceError>;
}

/// Adapter returned by [`service_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ServiceHandler for FnHandler<F>
where
    F: Fn(HookRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Decision, ServiceError>> + Send + 'static,
{
    async fn handle(&self, request: HookRequest) -> Result<Decision, ServiceError> {
        (self.0)(request).await
    }
}

/// Wrap an async closure as a [`ServiceHandler`].
pub fn service_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(HookRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Decision, ServiceError>> + Send + 'static,
{
    FnHandler(f)
}

/// A descriptor paired with its handler, ready to be registered.
#[derive(Clone)]
pub struct Service {
    descriptor: ServiceDescriptor,
    handler: Arc<dyn ServiceHandler>,
}

impl Service {
    pub fn new(descriptor: ServiceDescriptor, handler: impl ServiceHandler + 'static) -> Self {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    pub fn builder(hook: Hook, description: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder {
            descriptor: ServiceDescriptor::new(hook, description),
        }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn handler(&self) -> &Arc<dyn ServiceHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

pub struct ServiceBuilder {
    descriptor: ServiceDescriptor,
}

impl ServiceBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.with_id(id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.with_title(title);
        self
    }

    pub fn prefetch(mut self, key: impl Into<String>, query: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.with_prefetch(key, query);
        self
    }

    pub fn handler(self, handler: impl ServiceHandler + 'static) -> Service {
        Service::new(self.descriptor, handler)
    }
}
