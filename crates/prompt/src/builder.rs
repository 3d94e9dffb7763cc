//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use explainer_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Build a prompt from a definition and a serializable context.
///
/// The context must serialize to a JSON object; its top-level keys are the
/// template variables. Rendering is strict: a variable the template names but
/// the context lacks is an error.
///
/// # Example
/// ```no_run
/// use explainer_prompt::{build_prompt, builtin_prompt, RAG_ANSWER_PROMPT_ID};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(RAG_ANSWER_PROMPT_ID).unwrap();
/// let vars = serde_json::json!({"context": "[Source 1: a.pdf, similarity=0.900]\n...", "query": "What is attention?"});
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt<T: Serialize>(definition: &PromptDefinition, context: &T) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let value = serde_json::to_value(context)?;
    if !value.is_object() {
        return Err(AppError::Prompt(
            "Prompt context must be an object".to_string(),
        ));
    }

    let user = render_template(&definition.template, &value)?;

    let system = match &definition.system {
        Some(system) => Some(render_template(system, &value)?),
        None => None,
    };

    Ok(BuiltPrompt { system, user })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
