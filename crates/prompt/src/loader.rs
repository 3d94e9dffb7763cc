//! Prompt loader: built-in definitions and YAML overrides.

use crate::types::PromptDefinition;
use explainer_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// ID of the grounding prompt used for answer synthesis.
pub const RAG_ANSWER_PROMPT_ID: &str = "rag.answer";

const RAG_ANSWER_TEMPLATE: &str = "You are a helpful AI assistant answering questions based on research papers and articles.

Here are the most relevant excerpts from the documents:

{{context}}

Based on these excerpts, please answer the following question. Be specific and cite which sources support your answer.

Question: {{query}}

Answer:";

/// Return a built-in prompt definition by ID.
pub fn builtin_prompt(prompt_id: &str) -> Option<PromptDefinition> {
    match prompt_id {
        RAG_ANSWER_PROMPT_ID => Some(PromptDefinition {
            id: RAG_ANSWER_PROMPT_ID.to_string(),
            title: "Grounded answer with citations".to_string(),
            api_version: "1.0".to_string(),
            created_by: "explainer".to_string(),
            system: None,
            template: RAG_ANSWER_TEMPLATE.to_string(),
        }),
        _ => None,
    }
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".explainer/prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.explainer/prompts/` directory.
///
/// # Example
/// ```no_run
/// use explainer_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Resolve a prompt: the workspace override when present, else the built-in.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if override_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    builtin_prompt(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
