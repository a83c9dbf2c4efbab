//! CDS Hooks invocation engine.
//!
//! Services are registered once into a [`ServiceRegistry`]; the
//! [`Dispatcher`] resolves an invocation to a service, validates the request
//! against the hook's context contract and the service's prefetch contract,
//! and runs the handler.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod hook;
pub mod model;
pub mod prefetch;
pub mod registry;
pub mod service;
pub mod validation;

pub use context::{ContextSchema, ContextSchemaOptions, FieldType, schema_for, schema_for_name};
pub use dispatch::{Dispatcher, Invocation};
pub use error::{CdsError, Result};
pub use hook::{Hook, UnknownHook};
pub use model::{
    Card, Decision, DiscoveryResponse, Feedback, HookRequest, HookResponse, Indicator, Link,
    SelectionBehavior, Source, Suggestion, SystemAction,
};
pub use prefetch::{PrefetchContract, PrefetchTemplate};
pub use registry::{RegisteredService, ServiceRegistry, ServiceRegistryBuilder};
pub use service::{Service, ServiceDescriptor, ServiceError, ServiceHandler, service_fn};
pub use validation::{
    FieldError, HookValidator, ValidationError, ValidationOrigin, ValidationScope,
};
