//! Task specification payload carried by every claimed task.

use serde::{Deserialize, Serialize};

/// The only specification format this worker executes.
pub const SUPPORTED_API_VERSION: &str = "scaffolder.backstage.io/v1beta3";

/// Reference back to the template a task was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub entity_ref: String,
}

/// What a task asks the runner to do.
///
/// `parameters` and `steps` stay as JSON: their shape belongs to the runner,
/// the worker only looks at `api_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub api_version: String,

    #[serde(default)]
    pub parameters: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_info: Option<TemplateInfo>,

    #[serde(default)]
    pub steps: serde_json::Value,
}

impl TaskSpec {
    /// Spec for the supported format with the given parameters.
    pub fn new(parameters: serde_json::Value) -> Self {
        Self::with_api_version(SUPPORTED_API_VERSION, parameters)
    }

    pub fn with_api_version(api_version: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            api_version: api_version.into(),
            parameters,
            template_info: None,
            steps: serde_json::Value::Array(Vec::new()),
        }
    }

    pub fn with_template_ref(mut self, entity_ref: impl Into<String>) -> Self {
        self.template_info = Some(TemplateInfo {
            entity_ref: entity_ref.into(),
        });
        self
    }

    pub fn template_ref(&self) -> Option<&str> {
        self.template_info.as_ref().map(|t| t.entity_ref.as_str())
    }

    pub fn is_supported(&self) -> bool {
        self.api_version == SUPPORTED_API_VERSION
    }
}
