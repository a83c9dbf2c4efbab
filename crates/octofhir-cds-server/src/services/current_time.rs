use octofhir_cds_core::{
    Card, Decision, Hook, HookRequest, Indicator, Service, ServiceError, Source, service_fn,
};
use time::OffsetDateTime;
use time::macros::format_description;

pub const ID: &str = "current-time";

async fn current_time(_request: HookRequest) -> Result<Decision, ServiceError> {
    let now = OffsetDateTime::now_utc()
        .format(format_description!("[hour]:[minute]:[second]"))
        .map_err(|e| ServiceError::Other(e.into()))?;

    Ok(Decision::cards(vec![
        Card::new(
            "What time is it?",
            Indicator::Info,
            Source::new("OctoFHIR CDS").with_url("https://github.com/octofhir/server-rs"),
        )
        .with_detail(format!("The current time is {now} UTC")),
    ]))
}

pub fn service() -> Service {
    Service::builder(
        Hook::PatientView,
        "Responds with the current time after being invoked by the patient-view hook",
    )
    .id(ID)
    .title("A CDS service that responds with the current time")
    .handler(service_fn(current_time))
}
