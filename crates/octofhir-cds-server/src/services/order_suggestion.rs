use octofhir_cds_core::{
    Card, Decision, Hook, HookRequest, Indicator, Link, SelectionBehavior, Service,
    ServiceError, Source, Suggestion, SystemAction, service_fn,
};
use serde_json::{Value, json};

pub const ID: &str = "order-select-suggestion";

/// Selected order ids. A singular `selection` has already been folded into
/// `selections` by context normalization.
fn selected_orders(context: &Value) -> Vec<String> {
    context
        .get("selections")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn suggest(request: HookRequest) -> Result<Decision, ServiceError> {
    let selections = selected_orders(&request.context);
    if selections.is_empty() {
        return Ok(Decision::NoDecision);
    }
    let patient_id = request
        .context_str("patientId")
        .ok_or_else(|| ServiceError::execution("context.patientId missing after validation"))?;
    let subject = if patient_id.starts_with("Patient/") {
        patient_id.to_string()
    } else {
        format!("Patient/{patient_id}")
    };

    let follow_up = json!({
        "resourceType": "ServiceRequest",
        "status": "draft",
        "intent": "proposal",
        "subject": {"reference": subject},
        "code": {"text": "Renal function panel"},
        "basedOn": selections
            .iter()
            .map(|s| json!({"reference": s}))
            .collect::<Vec<_>>(),
    });

    let card = Card::new(
        format!("Consider a follow-up lab for {} selected order(s)", selections.len()),
        Indicator::Warning,
        Source::new("OctoFHIR CDS"),
    )
    .with_detail("The selected orders are commonly monitored with a **renal function panel**.")
    .with_suggestions(
        SelectionBehavior::AtMostOne,
        vec![
            Suggestion::new("Order renal function panel")
                .recommended()
                .with_action(SystemAction::create("Create a draft lab order", follow_up)),
        ],
    )
    .with_link(Link::absolute(
        "Monitoring guidance",
        "https://cds-hooks.org/hooks/order-select/",
    ));

    Ok(Decision::cards(vec![card]))
}

pub fn service() -> Service {
    Service::builder(
        Hook::OrderSelect,
        "Suggests a follow-up lab order for newly selected orders",
    )
    .id(ID)
    .title("Order follow-up suggestion")
    .handler(service_fn(suggest))
}
