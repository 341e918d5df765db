//! Prompt loader.
//!
//! Built-in prompts ship inside the binary. A file `<prompts_dir>/<id>.yml`
//! replaces the built-in definition with the same id.

use crate::types::{PromptDefinition, PromptSource};
use nss_core::{AppError, AppResult};
use std::path::Path;

/// Query interpretation prompt id.
pub const INTERPRET_PROMPT_ID: &str = "nss.interpret";

/// Answer synthesis prompt id.
pub const SYNTHESIZE_PROMPT_ID: &str = "nss.synthesize";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        INTERPRET_PROMPT_ID,
        include_str!("../prompts/nss.interpret.yml"),
    ),
    (
        SYNTHESIZE_PROMPT_ID,
        include_str!("../prompts/nss.synthesize.yml"),
    ),
];

/// Load a prompt definition, preferring a workspace override.
///
/// # Arguments
/// * `prompts_dir` - Directory searched for `<id>.yml` overrides
/// * `prompt_id` - Prompt identifier (e.g., "nss.interpret")
///
/// # Example
/// ```no_run
/// use nss_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (prompt, source) = load_prompt(Path::new(".nss/prompts"), "nss.interpret")?;
/// println!("Loaded prompt: {} from {:?}", prompt.title, source);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(
    prompts_dir: &Path,
    prompt_id: &str,
) -> AppResult<(PromptDefinition, PromptSource)> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file, definition.id, prompt_id
            )));
        }

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok((definition, PromptSource::File(prompt_file)));
    }

    builtin_prompt(prompt_id).map(|definition| (definition, PromptSource::Builtin))
}

/// Parse one of the prompts compiled into the binary.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

    parse_prompt(contents, "<builtin>")
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: '{}'. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if let Some(temperature) = def.parameters.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Prompt(format!(
                "Prompt temperature {} is outside 0.0-2.0",
                temperature
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(format!("{}.yml", id)), body).unwrap();
    }

    #[test]
    fn test_builtin_prompts_are_valid() {
        for (id, _) in BUILTIN_PROMPTS {
            let def = builtin_prompt(id).unwrap();
            assert_eq!(def.id, *id);
            assert!(def.system.is_some(), "{} should carry a system prompt", id);
        }
    }

    #[test]
    fn test_missing_override_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let (def, source) = load_prompt(temp_dir.path(), INTERPRET_PROMPT_ID).unwrap();
        assert_eq!(def.id, INTERPRET_PROMPT_ID);
        assert_eq!(source, PromptSource::Builtin);
    }

    #[test]
    fn test_override_replaces_builtin() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            SYNTHESIZE_PROMPT_ID,
            r#"
id: nss.synthesize
title: "Terse answers"
apiVersion: "1.1"
template: "Q: {{query}}\n{{context}}"
output:
  format: text
"#,
        );

        let (def, source) = load_prompt(temp_dir.path(), SYNTHESIZE_PROMPT_ID).unwrap();
        assert_eq!(def.title, "Terse answers");
        assert!(def.system.is_none());
        assert!(matches!(source, PromptSource::File(_)));
    }

    #[test]
    fn test_override_with_mismatched_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            INTERPRET_PROMPT_ID,
            r#"
id: something.else
title: "Wrong"
apiVersion: "1.0"
template: "{{query}}"
output:
  format: json
"#,
        );

        assert!(load_prompt(temp_dir.path(), INTERPRET_PROMPT_ID).is_err());
    }

    #[test]
    fn test_invalid_yaml_override() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), INTERPRET_PROMPT_ID, "invalid: yaml: content:");

        let err = load_prompt(temp_dir.path(), INTERPRET_PROMPT_ID).unwrap_err();
        assert!(matches!(err, AppError::Prompt(_)));
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nss.nope").is_err());
    }
}
