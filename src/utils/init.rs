use anyhow::{Context as _, Result};
use rust_embed::RustEmbed;
use tera::{Context, Tera};

#[derive(RustEmbed)]
#[folder = "src/assets/env/"]
struct EnvFiles;

#[derive(RustEmbed)]
#[folder = "src/assets/catalog/"]
struct CatalogFiles;

/// Renders the `.env` template with every setting at its default.
pub fn get_env_file_with_defaults(template_name: &str, catalog_path: &str) -> Result<String> {
    let file = EnvFiles::get(template_name)
        .ok_or_else(|| anyhow::anyhow!("Failed to find env file template: {}", template_name))?;

    let template_str =
        std::str::from_utf8(file.data.as_ref()).context("Failed to parse template as UTF-8")?;

    let mut context = Context::new();
    context.insert("catalog_path", catalog_path);

    Tera::default()
        .render_str(template_str, &context)
        .context("Failed to render env file")
}

pub fn get_sample_catalog() -> Result<String> {
    let file = CatalogFiles::get("catalog.sample.json")
        .ok_or_else(|| anyhow::anyhow!("Failed to find sample catalog"))?;

    std::str::from_utf8(file.data.as_ref())
        .map(str::to_string)
        .context("Failed to parse sample catalog as UTF-8")
}
