use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hook::Hook;

/// OAuth 2.0 bearer token the client grants the service for FHIR access.
///
/// Clients are not held to the full token shape, so every member is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FhirAuthorization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
}

/// An inbound hook invocation.
///
/// `P` is the shape of the prefetch data. The dispatcher works with the
/// untyped form; handlers can call [`HookRequest::typed`] to get their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest<P = Value> {
    pub hook: Hook,
    pub hook_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_authorization: Option<FhirAuthorization>,
    pub context: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<P>,
}

impl HookRequest<Value> {
    /// Re-read the prefetch data as `P`.
    pub fn typed<P: DeserializeOwned>(self) -> Result<HookRequest<P>, serde_json::Error> {
        let prefetch = self.prefetch.map(serde_json::from_value).transpose()?;
        Ok(HookRequest {
            hook: self.hook,
            hook_instance: self.hook_instance,
            fhir_server: self.fhir_server,
            fhir_authorization: self.fhir_authorization,
            context: self.context,
            prefetch,
        })
    }

    /// A single prefetched resource by key.
    pub fn prefetched(&self, key: &str) -> Option<&Value> {
        self.prefetch.as_ref().and_then(|p| p.get(key))
    }
}

impl<P> HookRequest<P> {
    /// Deserialize the hook context into a handler-specific shape.
    pub fn context_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.context)
    }

    /// A string field of the context, e.g. `patientId`.
    pub fn context_str(&self, field: &str) -> Option<&str> {
        self.context.get(field).and_then(Value::as_str)
    }
}
