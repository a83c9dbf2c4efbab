use serde::{Deserialize, Serialize};

use super::card::Card;
use super::suggestion::SystemAction;
use crate::service::ServiceDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_actions: Option<Vec<SystemAction>>,
}

impl HookResponse {
    /// `{"cards": []}`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            system_actions: None,
        }
    }

    pub fn with_system_action(mut self, action: SystemAction) -> Self {
        self.system_actions.get_or_insert_with(Vec::new).push(action);
        self
    }
}

/// What a handler decided for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Respond(HookResponse),
    /// Nothing to say for this request. Answered with an empty card list.
    NoDecision,
}

impl Decision {
    pub fn cards(cards: Vec<Card>) -> Self {
        Self::Respond(HookResponse::with_cards(cards))
    }

    /// The response body the client receives.
    pub fn into_response(self) -> HookResponse {
        match self {
            Decision::Respond(response) => response,
            Decision::NoDecision => HookResponse::empty(),
        }
    }
}

impl From<HookResponse> for Decision {
    fn from(response: HookResponse) -> Self {
        Decision::Respond(response)
    }
}

/// Body of `GET /cds-services`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResponse {
    pub services: Vec<ServiceDescriptor>,
}
