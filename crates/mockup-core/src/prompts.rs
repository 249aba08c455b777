//! Prompt templates sent to the image service.

use minijinja::{Environment, UndefinedBehavior, context};

/// Prompt template for the first generation from a reference logo (`MiniJinja`).
pub const MOCKUP_PROMPT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/mockup_prompt.md"
));

/// Prompt template for follow-up edits (`MiniJinja`).
pub const EDIT_PROMPT_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/edit_prompt.md"
));

/// Renders the generation prompt for a product description.
///
/// # Errors
/// Returns an error string if the template fails to render.
pub fn render_mockup_prompt(description: &str) -> Result<String, String> {
    render(
        "mockup_prompt",
        MOCKUP_PROMPT_TEMPLATE,
        context! { description => description.trim() },
    )
}

/// Renders the edit prompt for an instruction.
///
/// # Errors
/// Returns an error string if the template fails to render.
pub fn render_edit_prompt(instruction: &str) -> Result<String, String> {
    render(
        "edit_prompt",
        EDIT_PROMPT_TEMPLATE,
        context! { instruction => instruction.trim().trim_end_matches('.') },
    )
}

fn render(name: &str, template: &str, vars: minijinja::Value) -> Result<String, String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template(name, template)
        .map_err(|error| error.to_string())?;

    let output = env
        .get_template(name)
        .map_err(|error| error.to_string())?
        .render(vars)
        .map_err(|error| error.to_string())?;

    Ok(output.replace("\r\n", "\n").trim().to_string())
}
