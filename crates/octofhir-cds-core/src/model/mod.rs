//! CDS Hooks wire types.

pub mod card;
pub mod feedback;
pub mod request;
pub mod response;
pub mod suggestion;

pub use card::{
    Card, Coding, Indicator, Link, LinkType, OverrideReason, SelectionBehavior, Source,
    SuggestionSet,
};
pub use feedback::{AcceptedSuggestion, Feedback, Outcome};
pub use request::{FhirAuthorization, HookRequest};
pub use response::{Decision, DiscoveryResponse, HookResponse};
pub use suggestion::{ActionType, Suggestion, SystemAction};

pub(crate) fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
