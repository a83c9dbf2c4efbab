use serde::{Deserialize, Serialize};

use super::suggestion::Suggestion;

/// Urgency of a card, ordered by increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_selected: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// Why a clinician dismissed a card; offered on cards and echoed in feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideReason {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_comment: Option<String>,
}

impl OverrideReason {
    pub fn coded(reason: Coding) -> Self {
        Self {
            reason: Some(reason),
            user_comment: None,
        }
    }
}

/// Provenance of the guidance on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Coding>,
}

impl Source {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: None,
            icon: None,
            topic: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_topic(mut self, topic: Coding) -> Self {
        self.topic = Some(topic);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Absolute,
    Smart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub label: String,
    pub url: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Only meaningful for SMART links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_context: Option<String>,
}

impl Link {
    pub fn absolute(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            link_type: LinkType::Absolute,
            app_context: None,
        }
    }

    pub fn smart(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            link_type: LinkType::Smart,
            app_context: None,
        }
    }

    pub fn with_app_context(mut self, app_context: impl Into<String>) -> Self {
        self.app_context = Some(app_context.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionBehavior {
    AtMostOne,
    Any,
}

/// Suggestions always travel with their selection behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,
    pub selection_behavior: SelectionBehavior,
}

/// A unit of advisory content returned to the CDS client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default = "super::generate_uuid")]
    pub uuid: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub indicator: Indicator,
    pub source: Source,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reasons: Option<Vec<OverrideReason>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
}

impl Card {
    pub fn new(summary: impl Into<String>, indicator: Indicator, source: Source) -> Self {
        Self {
            uuid: super::generate_uuid(),
            summary: summary.into(),
            detail: None,
            indicator,
            source,
            suggestions: None,
            override_reasons: None,
            links: None,
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Markdown detail shown below the summary.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        selection_behavior: SelectionBehavior,
        suggestions: Vec<Suggestion>,
    ) -> Self {
        self.suggestions = Some(SuggestionSet {
            suggestions,
            selection_behavior,
        });
        self
    }

    pub fn with_override_reasons(mut self, reasons: Vec<OverrideReason>) -> Self {
        self.override_reasons = Some(reasons);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.get_or_insert_with(Vec::new).push(link);
        self
    }
}
