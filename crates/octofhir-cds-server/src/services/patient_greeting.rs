use async_trait::async_trait;
use octofhir_cds_core::{
    Card, Decision, Hook, HookRequest, Indicator, Service, ServiceError, ServiceHandler, Source,
};
use serde::Deserialize;

use super::echo::PATIENT_PREFETCH;

pub const ID: &str = "patient-greeting";

#[derive(Debug, Deserialize)]
struct GreetingPrefetch {
    patient: Patient,
}

#[derive(Debug, Default, Deserialize)]
struct Patient {
    #[serde(default)]
    name: Vec<HumanName>,
}

#[derive(Debug, Default, Deserialize)]
struct HumanName {
    text: Option<String>,
    family: Option<String>,
    #[serde(default)]
    given: Vec<String>,
}

impl HumanName {
    fn display(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(text.to_string());
        }
        let parts: Vec<&str> = self
            .given
            .iter()
            .map(String::as_str)
            .chain(self.family.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// Greets the prefetched patient by name. Stays silent when the patient has no usable name.
pub struct PatientGreeting;

#[async_trait]
impl ServiceHandler for PatientGreeting {
    async fn handle(&self, request: HookRequest) -> Result<Decision, ServiceError> {
        let request: HookRequest<GreetingPrefetch> = request
            .typed()
            .map_err(|e| ServiceError::execution(format!("unexpected prefetch: {e}")))?;

        let name = request
            .prefetch
            .as_ref()
            .and_then(|p| p.patient.name.iter().find_map(HumanName::display));

        let Some(name) = name else {
            return Ok(Decision::NoDecision);
        };

        Ok(Decision::cards(vec![
            Card::new(
                format!("Now seeing: {name}"),
                Indicator::Info,
                Source::new("OctoFHIR CDS"),
            )
            .with_detail("This is a card"),
        ]))
    }
}

pub fn service() -> Service {
    Service::builder(
        Hook::PatientView,
        "Greets the patient using the name from the prefetched Patient resource",
    )
    .id(ID)
    .title("Patient greeting")
    .prefetch("patient", PATIENT_PREFETCH)
    .handler(PatientGreeting)
}
