//! One example service per hook, ids `"1"` through `"8"`.

use async_trait::async_trait;
use octofhir_cds_core::{
    Card, Decision, Hook, HookRequest, Indicator, Service, ServiceDescriptor, ServiceError,
    ServiceHandler, Source,
};

pub const PATIENT_PREFETCH: &str = "Patient/{{context.patientId}}";

/// Answers every valid invocation with the same informational card.
pub struct EchoHandler;

#[async_trait]
impl ServiceHandler for EchoHandler {
    async fn handle(&self, request: HookRequest) -> Result<Decision, ServiceError> {
        tracing::debug!(
            hook = %request.hook,
            hook_instance = %request.hook_instance,
            "echo service invoked"
        );
        Ok(Decision::cards(vec![
            Card::new(
                "A summary of the findings",
                Indicator::Info,
                Source::new("CDS Services Inc"),
            )
            .with_detail("This is a card"),
        ]))
    }
}

pub fn descriptor(id: impl Into<String>, hook: Hook) -> ServiceDescriptor {
    ServiceDescriptor::new(hook, "An example")
        .with_id(id)
        .with_title(format!("{hook} Hook Service Example"))
        .with_prefetch("patient", PATIENT_PREFETCH)
}

/// Echo services in hook order.
pub fn services() -> Vec<Service> {
    Hook::ALL
        .iter()
        .enumerate()
        .map(|(i, hook)| Service::new(descriptor((i + 1).to_string(), *hook), EchoHandler))
        .collect()
}
