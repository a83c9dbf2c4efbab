//! Per-service prefetch contract.
//!
//! A service that declares a prefetch template expects the client to send a
//! `prefetch` object carrying every templated key. The contract is compiled
//! once when the service is registered and reused for every invocation.

use std::fmt;

use indexmap::IndexMap;
use jsonschema::Validator;
use serde_json::{Map, Value, json};

use crate::error::{CdsError, Result};
use crate::validation::FieldError;

/// Logical name -> FHIR query template, in declaration order.
pub type PrefetchTemplate = IndexMap<String, String>;

pub enum PrefetchContract {
    /// The service declared no prefetch; any `prefetch` value (or none) is accepted.
    Unconstrained,
    /// Every key must be present in `prefetch` and hold an object.
    Required { keys: Vec<String>, validator: Validator },
}

impl PrefetchContract {
    /// Compile the contract for a service's prefetch template.
    pub fn compile(service_id: &str, template: Option<&PrefetchTemplate>) -> Result<Self> {
        let Some(template) = template else {
            return Ok(Self::Unconstrained);
        };

        let keys: Vec<String> = template.keys().cloned().collect();
        let schema = prefetch_schema(&keys);
        let validator = jsonschema::draft7::new(&schema).map_err(|e| {
            CdsError::schema_compile(format!("prefetch of service '{service_id}'"), e)
        })?;

        Ok(Self::Required { keys, validator })
    }

    /// Keys the client is required to send.
    pub fn required_keys(&self) -> &[String] {
        match self {
            Self::Unconstrained => &[],
            Self::Required { keys, .. } => keys,
        }
    }

    /// Check the request's `prefetch` member, returning the violations.
    pub fn check(&self, prefetch: Option<&Value>) -> Vec<FieldError> {
        let Self::Required { validator, .. } = self else {
            return Vec::new();
        };

        let mut document = Map::new();
        if let Some(prefetch) = prefetch {
            document.insert("prefetch".to_string(), prefetch.clone());
        }
        let document = Value::Object(document);

        validator
            .iter_errors(&document)
            .map(|err| FieldError::from_schema_error(&err))
            .collect()
    }
}

impl fmt::Debug for PrefetchContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("Unconstrained"),
            Self::Required { keys, .. } => f.debug_struct("Required").field("keys", keys).finish(),
        }
    }
}

/// Schema over the request body requiring `prefetch` with every key as an object.
fn prefetch_schema(keys: &[String]) -> Value {
    let properties: Map<String, Value> = keys
        .iter()
        .map(|key| (key.clone(), json!({ "type": "object" })))
        .collect();

    json!({
        "type": "object",
        "required": ["prefetch"],
        "properties": {
            "prefetch": {
                "type": "object",
                "required": keys,
                "properties": properties,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_template() -> PrefetchTemplate {
        let mut template = PrefetchTemplate::new();
        template.insert("patient".into(), "Patient/{{context.patientId}}".into());
        template
    }

    #[test]
    fn no_template_accepts_anything() {
        let contract = PrefetchContract::compile("1", None).unwrap();
        assert!(contract.required_keys().is_empty());
        assert!(contract.check(None).is_empty());
        assert!(contract.check(Some(&json!({"anything": 1}))).is_empty());
        assert!(contract.check(Some(&json!("not even an object"))).is_empty());
    }

    #[test]
    fn missing_prefetch_requires_the_key() {
        let contract = PrefetchContract::compile("8", Some(&patient_template())).unwrap();
        let errors = contract.check(None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "");
        assert!(errors[0].message.contains("prefetch"));
    }

    #[test]
    fn missing_declared_key_is_named() {
        let contract = PrefetchContract::compile("8", Some(&patient_template())).unwrap();
        let errors = contract.check(Some(&json!({"notPatient": "something-else"})));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, ".prefetch");
        assert!(errors[0].message.contains("patient"));
    }

    #[test]
    fn declared_keys_must_be_objects() {
        let contract = PrefetchContract::compile("8", Some(&patient_template())).unwrap();
        let errors = contract.check(Some(&json!({"patient": "Patient/123"})));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, ".prefetch.patient");
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let contract = PrefetchContract::compile("8", Some(&patient_template())).unwrap();
        let prefetch = json!({
            "patient": {"resourceType": "Patient", "id": "123"},
            "conditions": {"resourceType": "Bundle"}
        });
        assert!(contract.check(Some(&prefetch)).is_empty());
    }
}
