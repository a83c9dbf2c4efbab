//! Hook request validation.
//!
//! Two layers of checks guard every invocation:
//!
//! 1. **Static**: the outer request shape (required top-level members and the
//!    enumerated `hook` values). It does not depend on the target service.
//! 2. **Dynamic**: the `context` contract of the request's hook type and the
//!    `prefetch` contract of the target service.
//!
//! Failures are returned as [`ValidationError`] values carrying an aggregated
//! message plus the field-level errors, so the HTTP layer can build a 400
//! response without any exception-style control flow.

use std::collections::HashMap;
use std::fmt;

use jsonschema::Validator;
use serde::Serialize;
use serde_json::{Value, json};

use crate::context::{ContextSchema, ContextSchemaOptions, schema_for};
use crate::error::{CdsError, Result};
use crate::hook::Hook;
use crate::model::HookRequest;
use crate::registry::RegisteredService;

/// Part of the request body a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationScope {
    #[serde(rename = "body")]
    Body,
    #[serde(rename = "body.context")]
    BodyContext,
}

impl ValidationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationScope::Body => "body",
            ValidationScope::BodyContext => "body.context",
        }
    }
}

impl fmt::Display for ValidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layer rejected the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOrigin {
    /// Outer request/feedback shape, checked before any service logic.
    Schema,
    /// Context or prefetch contract of the matched service.
    Hook,
}

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Dotted path relative to the scope, e.g. `.prefetch.patient`. Empty for the scope root.
    pub instance_path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_schema_error(err: &jsonschema::ValidationError<'_>) -> Self {
        Self {
            instance_path: dotted_path(&err.instance_path.to_string()),
            message: err.to_string(),
        }
    }
}

/// Render a JSON pointer (`/selections/0`) as a dotted path (`.selections[0]`).
pub fn dotted_path(pointer: &str) -> String {
    let mut out = String::with_capacity(pointer.len());
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push('[');
            out.push_str(&segment);
            out.push(']');
        } else {
            out.push('.');
            out.push_str(&segment);
        }
    }
    out
}

/// A rejected hook request or feedback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub origin: ValidationOrigin,
    #[serde(rename = "validationContext")]
    pub scope: ValidationScope,
    #[serde(rename = "validation")]
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn schema(scope: ValidationScope, errors: Vec<FieldError>) -> Self {
        Self {
            origin: ValidationOrigin::Schema,
            scope,
            errors,
        }
    }

    pub fn hook(scope: ValidationScope, errors: Vec<FieldError>) -> Self {
        Self {
            origin: ValidationOrigin::Hook,
            scope,
            errors,
        }
    }

    /// The body could not be decoded as JSON at all.
    pub fn malformed_body(err: &serde_json::Error) -> Self {
        Self::schema(
            ValidationScope::Body,
            vec![FieldError::new("", format!("is not valid JSON: {err}"))],
        )
    }

    /// The body matched the schema but could not be decoded into the typed request.
    pub fn undecodable_body(err: &serde_json::Error) -> Self {
        Self::schema(
            ValidationScope::Body,
            vec![FieldError::new("", format!("could not be decoded: {err}"))],
        )
    }

    /// Aggregated `"<scope><path> <message>, ..."` text.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}{} {}", self.scope, e.instance_path, e.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}

/// JSON Schema for the outer `POST /cds-services/{id}` body.
pub fn request_schema() -> Value {
    let hooks: Vec<&str> = Hook::ALL.iter().map(Hook::as_str).collect();
    json!({
        "type": "object",
        "required": ["hook", "hookInstance", "context"],
        "properties": {
            "hook": { "type": "string", "enum": hooks },
            "hookInstance": { "type": "string" },
            "fhirServer": { "type": "string" },
            "fhirAuthorization": { "type": "object" },
            "context": { "type": "object" },
            "prefetch": { "type": "object" }
        },
        "dependencies": {
            "fhirAuthorization": ["fhirServer"]
        }
    })
}

/// JSON Schema for the `POST /cds-services/{id}/feedback` body.
pub fn feedback_schema() -> Value {
    json!({
        "type": "object",
        "required": ["card", "outcome"],
        "properties": {
            "card": { "type": "string" },
            "outcome": { "type": "string", "enum": ["accepted", "overridden"] },
            "acceptedSuggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id"],
                    "properties": { "id": { "type": "string" } }
                }
            },
            "overrideReason": {
                "type": "object",
                "properties": {
                    "reason": { "type": "object" },
                    "userComment": { "type": "string" }
                }
            },
            "outcomeTimestamp": { "type": "string" }
        }
    })
}

struct CompiledContext {
    schema: ContextSchema,
    validator: Validator,
}

/// Compiled validators for every request shape the engine accepts.
///
/// Built once at startup and shared read-only across requests.
pub struct HookValidator {
    options: ContextSchemaOptions,
    request_shape: Validator,
    feedback_shape: Validator,
    contexts: HashMap<Hook, CompiledContext>,
}

impl HookValidator {
    pub fn new(options: ContextSchemaOptions) -> Result<Self> {
        let request_shape = jsonschema::draft7::new(&request_schema())
            .map_err(|e| CdsError::schema_compile("hook request", e))?;
        let feedback_shape = jsonschema::draft7::new(&feedback_schema())
            .map_err(|e| CdsError::schema_compile("feedback", e))?;

        let mut contexts = HashMap::with_capacity(Hook::ALL.len());
        for hook in Hook::ALL {
            let schema = schema_for(hook, options);
            let validator = jsonschema::draft7::new(&schema.to_json_schema())
                .map_err(|e| CdsError::schema_compile(format!("{hook} context"), e))?;
            contexts.insert(hook, CompiledContext { schema, validator });
        }

        Ok(Self {
            options,
            request_shape,
            feedback_shape,
            contexts,
        })
    }

    pub fn options(&self) -> ContextSchemaOptions {
        self.options
    }

    /// Static check of the outer hook request shape.
    pub fn check_request_shape(&self, body: &Value) -> std::result::Result<(), ValidationError> {
        check_shape(&self.request_shape, body)
    }

    /// Static check of a feedback payload.
    pub fn check_feedback_shape(&self, body: &Value) -> std::result::Result<(), ValidationError> {
        check_shape(&self.feedback_shape, body)
    }

    /// Dynamic check of a decoded request against the matched service.
    ///
    /// The context is normalized in place before it is checked. Context
    /// violations are reported before (and instead of) prefetch violations.
    pub fn validate_hook_request(
        &self,
        request: &mut HookRequest,
        service: &RegisteredService,
    ) -> std::result::Result<(), ValidationError> {
        let Some(compiled) = self.contexts.get(&request.hook) else {
            return Err(ValidationError::schema(
                ValidationScope::Body,
                vec![FieldError::new(".hook", "is not a supported hook")],
            ));
        };

        if let Some(context) = request.context.as_object_mut() {
            compiled.schema.normalize(context);
        }

        let context_errors: Vec<FieldError> = compiled
            .validator
            .iter_errors(&request.context)
            .map(|err| FieldError::from_schema_error(&err))
            .collect();
        if !context_errors.is_empty() {
            return Err(ValidationError::hook(
                ValidationScope::BodyContext,
                context_errors,
            ));
        }

        let prefetch_errors = service.prefetch().check(request.prefetch.as_ref());
        if !prefetch_errors.is_empty() {
            return Err(ValidationError::hook(ValidationScope::Body, prefetch_errors));
        }

        Ok(())
    }
}

fn check_shape(validator: &Validator, body: &Value) -> std::result::Result<(), ValidationError> {
    let errors: Vec<FieldError> = validator
        .iter_errors(body)
        .map(|err| FieldError::from_schema_error(&err))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::schema(ValidationScope::Body, errors))
    }
}
