use anyhow::{Context as _, Result};
use rust_embed::RustEmbed;
use tera::{Context, Tera};

use crate::types::{Endpoint, ScriptFragment};

#[derive(RustEmbed)]
#[folder = "src/assets/sql/"]
struct Templates;

pub fn render_template(template_name: &str, context: &Context) -> Result<String> {
    let file = Templates::get(template_name)
        .ok_or_else(|| anyhow::anyhow!("Failed to find script template: {}", template_name))?;

    let template_str =
        std::str::from_utf8(file.data.as_ref()).context("Failed to parse template as UTF-8")?;

    Tera::default()
        .render_str(template_str, context)
        .with_context(|| format!("Failed to render template {}", template_name))
}

/// Disclaimer block placed above every generated script.
pub fn render_header(source: &Endpoint, target: &Endpoint, note: Option<&str>) -> Result<String> {
    let mut context = Context::new();
    context.insert("source", &source.to_string());
    context.insert("target", &target.to_string());
    context.insert("note", &note.map(str::trim).filter(|n| !n.is_empty()));

    let header = render_template("script_header.sql.jinja", &context)?;
    Ok(header.trim_end().to_string())
}

/// Wraps the fragments, in the given order, into a single transaction.
pub fn render_script(header: &str, fragments: &[ScriptFragment]) -> Result<String> {
    let mut context = Context::new();
    context.insert("header", header);
    context.insert("fragments", fragments);

    render_template("script.sql.jinja", &context)
}
