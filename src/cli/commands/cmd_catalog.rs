use clap::Args;
use colored::Colorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::{
    cli::{Context, commands::ExitOnErr},
    engine::Catalog,
};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog file to list instead of the configured one
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Endpoint")]
    endpoint: String,

    #[tabled(rename = "Server")]
    server: String,

    #[tabled(rename = "Database")]
    database: String,

    #[tabled(rename = "Schema")]
    schema: String,

    #[tabled(rename = "Objects")]
    objects: usize,

    #[tabled(rename = "Protected")]
    protected: String,
}

fn schema_rows(catalog: &Catalog) -> Vec<SchemaRow> {
    let mut rows = Vec::new();
    for server in &catalog.servers {
        let protected = if server.password.is_some() {
            "yes".yellow().to_string()
        } else {
            "no".bright_black().to_string()
        };

        for database in &server.databases {
            for schema in &database.schemas {
                rows.push(SchemaRow {
                    endpoint: format!("{}/{}/{}", server.id, database.id, schema.id)
                        .cyan()
                        .to_string(),
                    server: server.name.clone(),
                    database: database.name.clone(),
                    schema: schema.name.clone(),
                    objects: schema.objects.len(),
                    protected: protected.clone(),
                });
            }
        }
    }
    rows
}

pub async fn execute(args: &CatalogArgs, ctx: &Context<'_>) {
    let path = args
        .path
        .as_deref()
        .unwrap_or(&ctx.settings.engine.catalog_path);
    let catalog = Catalog::load(path).exit_on_err("Failed to load catalog");

    let rows = schema_rows(&catalog);
    if rows.is_empty() {
        println!("No schemas found in {}", path);
        return;
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()))
        .to_string();
    println!("{}", table);
}
