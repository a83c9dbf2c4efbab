use serde::{Deserialize, Serialize};

use super::card::OverrideReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accepted,
    Overridden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedSuggestion {
    pub id: String,
}

/// What the clinician did with a previously returned card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// `uuid` of the card. Not checked against previously issued cards.
    pub card: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_suggestions: Option<Vec<AcceptedSuggestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<OverrideReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_timestamp: Option<String>,
}
