use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

/// A change the CDS service proposes to the client's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl SystemAction {
    /// Propose creating `resource`.
    pub fn create(description: impl Into<String>, resource: Value) -> Self {
        Self {
            action_type: ActionType::Create,
            description: description.into(),
            resource: Some(resource),
            resource_id: None,
        }
    }

    /// Propose replacing a resource with `resource` in its entirety.
    pub fn update(description: impl Into<String>, resource: Value) -> Self {
        Self {
            action_type: ActionType::Update,
            description: description.into(),
            resource: Some(resource),
            resource_id: None,
        }
    }

    /// Propose deleting the resource at the relative reference `resource_id`.
    pub fn delete(description: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Delete,
            description: description.into(),
            resource: None,
            resource_id: Some(resource_id.into()),
        }
    }
}

/// A user-selectable group of actions. All actions apply together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default = "super::generate_uuid")]
    pub uuid: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<SystemAction>>,
}

impl Suggestion {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            uuid: super::generate_uuid(),
            label: label.into(),
            is_recommended: None,
            actions: None,
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn recommended(mut self) -> Self {
        self.is_recommended = Some(true);
        self
    }

    pub fn with_action(mut self, action: SystemAction) -> Self {
        self.actions.get_or_insert_with(Vec::new).push(action);
        self
    }
}
