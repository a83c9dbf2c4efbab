//! Context schema table.
//!
//! Maps each [`Hook`] to the declarative contract its `context` object must
//! satisfy. The table is pure data: [`ContextSchema::to_json_schema`] renders
//! it as a JSON Schema document for the validator, and
//! [`ContextSchema::normalize`] applies the forgiving pre-processing (strip
//! unknown properties, coerce scalar types) before validation runs.

use serde_json::{Map, Number, Value, json};

use crate::hook::Hook;

/// JSON type a context field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Object,
    Array,
    Number,
    Boolean,
}

impl FieldType {
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }

    /// Coerce a scalar value toward this type in place.
    ///
    /// Values that cannot be coerced are left untouched so the schema check
    /// reports them.
    pub fn coerce(&self, value: &mut Value) {
        let coerced = match (self, &*value) {
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (FieldType::Number, Value::String(s)) => parse_number(s),
            (FieldType::Number, Value::Bool(b)) => Some(Value::from(u8::from(*b))),
            (FieldType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (FieldType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        };
        if let Some(coerced) = coerced {
            *value = coerced;
        }
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::from(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Options that select between variants of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSchemaOptions {
    /// Accept a singular `selection` string in place of the `selections`
    /// array for `order-select`. Some sandbox EHRs send the singular form.
    pub tolerate_singular_selection: bool,
}

impl Default for ContextSchemaOptions {
    fn default() -> Self {
        Self {
            tolerate_singular_selection: true,
        }
    }
}

/// Declarative contract for the `context` of one hook type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSchema {
    pub hook: Hook,
    /// Fields that must always be present.
    pub required: Vec<&'static str>,
    /// Every declared field with its type. Anything else is stripped.
    pub fields: Vec<(&'static str, FieldType)>,
    /// Alternative extra requirements; at least one set must be satisfied.
    pub alternatives: Vec<Vec<&'static str>>,
    /// `(singular, plural)` pairs: a singular string is rewritten as a
    /// one-element plural array when the plural form is absent.
    pub folds: Vec<(&'static str, &'static str)>,
}

const USER_ID: (&str, FieldType) = ("userId", FieldType::String);
const PATIENT_ID: (&str, FieldType) = ("patientId", FieldType::String);
const ENCOUNTER_ID: (&str, FieldType) = ("encounterId", FieldType::String);
const DRAFT_ORDERS: (&str, FieldType) = ("draftOrders", FieldType::Object);

impl ContextSchema {
    fn new(hook: Hook, required: &[&'static str], fields: &[(&'static str, FieldType)]) -> Self {
        Self {
            hook,
            required: required.to_vec(),
            fields: fields.to_vec(),
            alternatives: Vec::new(),
            folds: Vec::new(),
        }
    }

    fn any_of(mut self, alternatives: &[&[&'static str]]) -> Self {
        self.alternatives = alternatives.iter().map(|alt| alt.to_vec()).collect();
        self
    }

    fn fold(mut self, singular: &'static str, plural: &'static str) -> Self {
        self.folds.push((singular, plural));
        self
    }

    /// Declared type of a field, if the field is part of the contract.
    pub fn field(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, ty)| *ty)
    }

    /// Strip undeclared properties, coerce declared ones toward their type,
    /// then fold singular forms into their plural arrays.
    pub fn normalize(&self, context: &mut Map<String, Value>) {
        context.retain(|key, _| self.field(key).is_some());
        for (name, ty) in &self.fields {
            if let Some(value) = context.get_mut(*name) {
                ty.coerce(value);
            }
        }
        for (singular, plural) in &self.folds {
            if context.contains_key(*plural)
                || !context.get(*singular).is_some_and(Value::is_string)
            {
                continue;
            }
            if let Some(value) = context.remove(*singular) {
                context.insert(plural.to_string(), Value::Array(vec![value]));
            }
        }
    }

    /// Render the contract as a draft-07 JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, ty)| (name.to_string(), json!({ "type": ty.json_type() })))
            .collect();

        let mut schema = json!({
            "type": "object",
            "required": self.required,
            "properties": properties,
        });

        if !self.alternatives.is_empty()
            && let Value::Object(ref mut map) = schema
        {
            let any_of: Vec<Value> = self
                .alternatives
                .iter()
                .map(|alt| json!({ "required": alt }))
                .collect();
            map.insert("anyOf".to_string(), Value::Array(any_of));
        }

        schema
    }
}

/// Look up the context contract for a hook.
pub fn schema_for(hook: Hook, options: ContextSchemaOptions) -> ContextSchema {
    match hook {
        Hook::AppointmentBook => ContextSchema::new(
            hook,
            &["userId", "patientId", "appointments"],
            &[
                USER_ID,
                PATIENT_ID,
                ("appointments", FieldType::Object),
                ENCOUNTER_ID,
            ],
        ),
        Hook::EncounterDischarge | Hook::EncounterStart => ContextSchema::new(
            hook,
            &["userId", "patientId", "encounterId"],
            &[USER_ID, PATIENT_ID, ENCOUNTER_ID],
        ),
        Hook::MedicationPrescribe => ContextSchema::new(
            hook,
            &["userId", "patientId"],
            &[
                USER_ID,
                PATIENT_ID,
                ENCOUNTER_ID,
                ("medications", FieldType::Object),
            ],
        ),
        Hook::OrderReview => ContextSchema::new(
            hook,
            &["userId", "patientId", "orders"],
            &[
                USER_ID,
                PATIENT_ID,
                ENCOUNTER_ID,
                ("orders", FieldType::Object),
            ],
        ),
        Hook::OrderSelect if options.tolerate_singular_selection => ContextSchema::new(
            hook,
            &["userId", "patientId", "draftOrders"],
            &[
                USER_ID,
                PATIENT_ID,
                ENCOUNTER_ID,
                ("selections", FieldType::Array),
                ("selection", FieldType::String),
                DRAFT_ORDERS,
            ],
        )
        .any_of(&[&["selections"], &["selection"]])
        .fold("selection", "selections"),
        Hook::OrderSelect => ContextSchema::new(
            hook,
            &["userId", "patientId", "draftOrders", "selections"],
            &[
                USER_ID,
                PATIENT_ID,
                ENCOUNTER_ID,
                ("selections", FieldType::Array),
                DRAFT_ORDERS,
            ],
        ),
        Hook::OrderSign => ContextSchema::new(
            hook,
            &["userId", "patientId", "draftOrders"],
            &[USER_ID, PATIENT_ID, ENCOUNTER_ID, DRAFT_ORDERS],
        ),
        Hook::PatientView => ContextSchema::new(
            hook,
            &["userId", "patientId"],
            &[USER_ID, PATIENT_ID, ENCOUNTER_ID],
        ),
    }
}

/// Look up the context contract by hook name; `None` for unrecognized hooks.
pub fn schema_for_name(hook: &str, options: ContextSchemaOptions) -> Option<ContextSchema> {
    hook.parse::<Hook>()
        .ok()
        .map(|hook| schema_for(hook, options))
}
