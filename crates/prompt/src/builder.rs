//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use nss_core::{AppError, AppResult};
use std::collections::HashMap;

/// Render a prompt definition's system and user templates.
///
/// Rendering is strict: a template that references a variable missing from
/// `variables` fails instead of rendering an empty string.
///
/// # Example
/// ```no_run
/// use nss_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt("nss.interpret")?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is the latest US NSS about?".to_string());
/// vars.insert("countries".to_string(), "United States, Japan".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("user", &definition.template)
        .map_err(|e| {
            AppError::Prompt(format!(
                "Failed to register template for {}: {}",
                definition.id, e
            ))
        })?;
    if let Some(ref system) = definition.system {
        handlebars
            .register_template_string("system", system)
            .map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to register system template for {}: {}",
                    definition.id, e
                ))
            })?;
    }

    let render = |name: &str| {
        handlebars.render(name, variables).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to render {} template for {}: {}",
                name, definition.id, e
            ))
        })
    };

    let user = render("user")?;
    let system = match definition.system {
        Some(_) => Some(render("system")?),
        None => None,
    };

    let mut resolved_variables: Vec<String> = variables.keys().cloned().collect();
    resolved_variables.sort();

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            parameters: definition.parameters.clone(),
            resolved_variables,
        },
    })
}
