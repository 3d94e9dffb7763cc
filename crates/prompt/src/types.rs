//! Prompt types for Explainer.

use serde::{Deserialize, Serialize};

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag.answer
title: Grounded answer
apiVersion: "1.0"
createdBy: test
behavior:
  tone: technical
  style: concise
template: "{{context}} {{query}}"
output:
  format: markdown
"#;

        // Keys the renderer does not use are accepted and ignored
        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag.answer");
        assert_eq!(def.created_by, "test");
        assert_eq!(def.template, "{{context}} {{query}}");
        assert!(def.system.is_none());
    }

    #[test]
    fn test_optional_sections_default() {
        let yaml = r#"
id: minimal
title: Minimal
apiVersion: "1.0"
template: "{{query}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.created_by.is_empty());
        assert!(def.system.is_none());
    }
}
