//! Invocation dispatcher.
//!
//! Takes a service id and a raw request body through
//! resolve -> static check -> decode -> dynamic check -> execute, and returns
//! the terminal [`Invocation`] state. Nothing here is HTTP-specific beyond
//! [`Invocation::status_code`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::model::{Decision, DiscoveryResponse, Feedback, HookRequest, HookResponse};
use crate::registry::{RegisteredService, ServiceRegistry};
use crate::service::ServiceError;
use crate::validation::{HookValidator, ValidationError, ValidationOrigin};

/// Terminal state of one hook invocation.
#[derive(Debug)]
pub enum Invocation {
    /// No service with the requested id.
    NotFound,
    /// The request failed the static or the dynamic check.
    Rejected(ValidationError),
    Responded(HookResponse),
    /// The handler had nothing to say; answered with an empty card list.
    NoDecision,
    /// The handler failed or panicked.
    Fault(ServiceError),
}

impl Invocation {
    pub fn status_code(&self) -> u16 {
        match self {
            Invocation::NotFound => 404,
            Invocation::Rejected(_) => 400,
            Invocation::Responded(_) | Invocation::NoDecision => 200,
            Invocation::Fault(_) => 500,
        }
    }

    /// The `200` body, if this invocation succeeded.
    pub fn into_response(self) -> Option<HookResponse> {
        match self {
            Invocation::Responded(response) => Some(response),
            Invocation::NoDecision => Some(HookResponse::empty()),
            _ => None,
        }
    }
}

/// Routes hook invocations to registered services.
///
/// Holds only read-only state, so clones are cheap and can be shared across
/// request tasks.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    validator: Arc<HookValidator>,
}

impl Dispatcher {
    pub fn new(registry: ServiceRegistry, validator: HookValidator) -> Self {
        Self {
            registry: Arc::new(registry),
            validator: Arc::new(validator),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn validator(&self) -> &HookValidator {
        &self.validator
    }

    /// Body of the discovery endpoint.
    pub fn discover(&self) -> DiscoveryResponse {
        DiscoveryResponse {
            services: self.registry.descriptors(),
        }
    }

    /// Invoke service `id` with a raw JSON request body.
    pub async fn invoke(&self, id: &str, body: &[u8]) -> Invocation {
        let Some(service) = self.registry.get(id).cloned() else {
            debug!(service_id = %id, "CDS service not found");
            return Invocation::NotFound;
        };

        let raw: Value = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(e) => return rejected(id, ValidationError::malformed_body(&e)),
        };

        if let Err(err) = self.validator.check_request_shape(&raw) {
            return rejected(id, err);
        }

        let mut request: HookRequest = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(e) => return rejected(id, ValidationError::undecodable_body(&e)),
        };

        if request.hook != service.hook() {
            warn!(
                service_id = %id,
                service_hook = %service.hook(),
                request_hook = %request.hook,
                "Hook request does not match the service's hook"
            );
        }

        if let Err(err) = self.validator.validate_hook_request(&mut request, &service) {
            return rejected(id, err);
        }

        self.execute(&service, request).await
    }

    async fn execute(&self, service: &RegisteredService, request: HookRequest) -> Invocation {
        let hook_instance = request.hook_instance.clone();
        let outcome = AssertUnwindSafe(service.handler().handle(request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(Decision::Respond(response))) => {
                debug!(
                    service_id = %service.id(),
                    hook_instance = %hook_instance,
                    cards = response.cards.len(),
                    "CDS service responded"
                );
                Invocation::Responded(response)
            }
            Ok(Ok(Decision::NoDecision)) => {
                info!(
                    service_id = %service.id(),
                    hook_instance = %hook_instance,
                    "CDS service made no decision"
                );
                Invocation::NoDecision
            }
            Ok(Err(err)) => {
                error!(
                    service_id = %service.id(),
                    hook_instance = %hook_instance,
                    error = %err,
                    "CDS service failed"
                );
                Invocation::Fault(err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    service_id = %service.id(),
                    hook_instance = %hook_instance,
                    panic = %message,
                    "CDS service panicked"
                );
                Invocation::Fault(ServiceError::Execution(format!("handler panicked: {message}")))
            }
        }
    }

    /// Accept a feedback payload for service `id`.
    ///
    /// The payload is checked for shape only. Neither the service id nor the
    /// card uuid is correlated with earlier responses.
    pub fn feedback(&self, id: &str, body: &[u8]) -> Result<Feedback, ValidationError> {
        let raw: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::malformed_body(&e))
            .inspect_err(|err| log_rejection(id, err))?;
        self.validator
            .check_feedback_shape(&raw)
            .inspect_err(|err| log_rejection(id, err))?;
        let feedback: Feedback = serde_json::from_value(raw)
            .map_err(|e| ValidationError::undecodable_body(&e))
            .inspect_err(|err| log_rejection(id, err))?;

        info!(
            service_id = %id,
            known_service = self.registry.get(id).is_some(),
            card = %feedback.card,
            outcome = ?feedback.outcome,
            accepted_suggestions = feedback.accepted_suggestions.as_ref().map_or(0, Vec::len),
            "CDS feedback received"
        );
        Ok(feedback)
    }
}

fn rejected(id: &str, err: ValidationError) -> Invocation {
    log_rejection(id, &err);
    Invocation::Rejected(err)
}

fn log_rejection(id: &str, err: &ValidationError) {
    let kind = match err.origin {
        ValidationOrigin::Schema => "SchemaValidationError",
        ValidationOrigin::Hook => "HookRequestValidationError",
    };
    info!(
        service_id = %id,
        kind,
        validation_context = %err.scope,
        message = %err,
        "CDS request rejected"
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
