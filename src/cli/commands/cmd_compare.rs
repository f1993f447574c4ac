use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use itertools::Itertools;
use strum::IntoEnumIterator;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::{
    cli::{
        Context, PromptCredentials,
        commands::{ExitOnErr, new_spinner},
    },
    engine::CatalogEngine,
    errors::CompareError,
    services::{AppServices, CompareSummary, CredentialProvider, NoCredentials},
    types::{
        DiffStatus, EndpointSpec, ObjectType, ResultRow, RowId, ScriptDraft,
        SessionToken, TypeGroup,
    },
    utils::{ScriptWriter, ScriptWriterOptions, format_duration, validate_output_dir},
};

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Source endpoint as SERVER/DATABASE/SCHEMA ids, e.g. 1/5/10
    #[arg(long, required = true)]
    pub source: EndpointSpec,

    /// Target endpoint as SERVER/DATABASE/SCHEMA ids, e.g. 2/6/11
    #[arg(long, required = true)]
    pub target: EndpointSpec,

    /// Statuses to show, comma separated (defaults to the configured filter)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<DiffStatus>,

    /// Rows to put in the script: `all`, `TYPE:LABEL` or `LABEL`. Repeatable.
    #[arg(long = "select", short = 's')]
    pub select: Vec<String>,

    /// Show the DDL delta of one row: `TYPE:LABEL` or `LABEL`
    #[arg(long, short = 'i')]
    pub inspect: Option<String>,

    /// Write the script to a timestamped file in DIR instead of printing it
    #[arg(long, value_name = "DIR", value_parser = validate_output_dir)]
    pub output_path: Option<PathBuf>,

    /// Fail on credential challenges instead of prompting for a password
    #[arg(long, default_value_t = false)]
    pub no_prompt: bool,
}

#[derive(Tabled)]
struct TypeGroupRow {
    #[tabled(rename = "Type")]
    object_type: String,

    #[tabled(rename = "Identical")]
    identical: String,

    #[tabled(rename = "Different")]
    different: String,

    #[tabled(rename = "Source Only")]
    source_only: String,

    #[tabled(rename = "Target Only")]
    target_only: String,

    #[tabled(rename = "Shown")]
    visible: String,
}

impl From<&TypeGroup> for TypeGroupRow {
    fn from(group: &TypeGroup) -> Self {
        Self {
            object_type: group.object_type.plural_label().to_string(),
            identical: group.counts.identical.to_string().bright_black().to_string(),
            different: group.counts.different.to_string().yellow().to_string(),
            source_only: group.counts.source_only.to_string().green().to_string(),
            target_only: group.counts.target_only.to_string().red().to_string(),
            visible: group.visible_rows.len().to_string().cyan().to_string(),
        }
    }
}

#[derive(Tabled)]
struct DiffRowView {
    #[tabled(rename = "#")]
    id: String,

    #[tabled(rename = "Type")]
    object_type: String,

    #[tabled(rename = "Name")]
    label: String,

    #[tabled(rename = "Source OID")]
    source_oid: String,

    #[tabled(rename = "Target OID")]
    target_oid: String,

    #[tabled(rename = "Status")]
    status: String,
}

impl From<&ResultRow> for DiffRowView {
    fn from(row: &ResultRow) -> Self {
        let oid = |id: Option<i64>| id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        Self {
            id: row.id.to_string().bright_black().to_string(),
            object_type: row.row.object_type.to_string(),
            label: row.row.label.clone(),
            source_oid: oid(row.row.source_object_id),
            target_oid: oid(row.row.target_object_id),
            status: row.row.status.to_colored_string(),
        }
    }
}

/// How a `--select` / `--inspect` argument picks rows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowSelector {
    AllVisible,
    Typed(ObjectType, String),
    Label(String),
}

impl FromStr for RowSelector {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("all") {
            return Ok(Self::AllVisible);
        }

        if let Some((kind, label)) = input.split_once(':') {
            if let Ok(object_type) = ObjectType::from_str(kind.trim()) {
                return Ok(Self::Typed(object_type, label.trim().to_string()));
            }
        }

        if input.is_empty() {
            Err("empty row selector".to_string())
        } else {
            Ok(Self::Label(input.to_string()))
        }
    }
}

impl RowSelector {
    fn matches(&self, row: &ResultRow) -> bool {
        match self {
            Self::AllVisible => true,
            Self::Typed(object_type, label) => {
                row.row.object_type == *object_type && row.row.label == *label
            }
            Self::Label(label) => row.row.label == *label,
        }
    }

    /// Ids picked by this selector. `AllVisible` only looks at `visible`.
    fn resolve(&self, rows: &[ResultRow], visible: &[ResultRow]) -> Vec<RowId> {
        let pool = if *self == Self::AllVisible { visible } else { rows };
        pool.iter().filter(|r| self.matches(r)).map(|r| r.id).collect()
    }
}

pub async fn execute(args: &CompareArgs, ctx: &Context<'_>) {
    let engine = CatalogEngine::from_config(&ctx.settings.engine)
        .exit_on_err("Failed to load catalog");

    let spinner = new_spinner("Opening session...");
    let credentials: Arc<dyn CredentialProvider> = if args.no_prompt {
        Arc::new(NoCredentials)
    } else {
        Arc::new(PromptCredentials::new(engine.catalog()).with_spinner(spinner.clone()))
    };

    let services = AppServices::new(ctx.settings, Arc::new(engine), credentials);

    let token = services
        .session_service
        .open(&args.source, &args.target)
        .await
        .exit_on_err("Failed to open session");

    let summary = run_compare(&services, token, ctx, &spinner).await;
    spinner.finish_and_clear();

    let summary = summary.exit_on_err("Comparison failed");
    print_summary(&services, &summary).await;

    if !args.status.is_empty() {
        services
            .session_service
            .apply_filter(token, args.status.iter().copied())
            .await
            .exit_on_err("Failed to apply status filter");
    }
    print_rows(&services, token).await;

    let rows = services
        .session_service
        .rows(token)
        .await
        .exit_on_err("Failed to read rows");
    let visible = services
        .session_service
        .visible_rows(token)
        .await
        .exit_on_err("Failed to read rows");

    if let Some(selector) = &args.inspect {
        inspect_row(&services, token, selector, &rows).await;
    }

    let draft = if !args.select.is_empty() {
        select_rows(&services, token, &args.select, &rows, &visible).await;
        Some(
            services
                .script_service
                .generate_for_selection(token)
                .await
                .exit_on_err("Failed to generate script"),
        )
    } else if args.inspect.is_some() {
        Some(
            services
                .script_service
                .generate_for_inspection(token)
                .await
                .exit_on_err("Failed to generate script"),
        )
    } else {
        None
    };

    if let Some(draft) = draft {
        emit_script(&draft, args, ctx);
    }

    services
        .session_service
        .close(token)
        .await
        .exit_on_err("Failed to close session");
}

async fn run_compare(
    services: &AppServices,
    token: SessionToken,
    ctx: &Context<'_>,
    spinner: &indicatif::ProgressBar,
) -> Result<CompareSummary, CompareError> {
    spinner.set_message("Comparing schemas...");

    let compare = services.compare_service.compare(token);
    tokio::pin!(compare);

    let mut ticker = tokio::time::interval(ctx.settings.compare.poll_interval());
    loop {
        tokio::select! {
            result = &mut compare => return result,
            _ = ticker.tick() => {
                if let Ok(progress) = services.compare_service.poll_progress(token).await {
                    // The final answer arrives through `compare`
                    if !progress.state.is_terminal() {
                        spinner.set_message(format!(
                            "{} {:>3}% {}",
                            progress.state.to_colored_string(),
                            progress.progress.percent,
                            progress.progress.phase
                        ));
                    }
                }
            }
        }
    }
}

async fn print_summary(services: &AppServices, summary: &CompareSummary) {
    let groups = services
        .session_service
        .group_by_type(summary.token)
        .await
        .exit_on_err("Failed to group rows");
    let (source, target) = services
        .session_service
        .endpoints(summary.token)
        .await
        .exit_on_err("Failed to read endpoints");

    println!(
        "{} {} {} {} ({} objects in {})",
        "Compared".blue(),
        source.to_string().cyan(),
        "with".blue(),
        target.to_string().cyan(),
        summary.total,
        format_duration(summary.started_at, summary.ended_at)
    );

    if groups.is_empty() {
        println!("✅ Both schemas are empty");
        return;
    }

    let table = Table::new(groups.iter().map(TypeGroupRow::from))
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()))
        .to_string();
    println!("{}", table);
}

/// One line naming the statuses shown and, when any are, the ones hidden.
fn filter_line(shown: &[DiffStatus]) -> String {
    let hidden = DiffStatus::iter().filter(|s| !shown.contains(s)).join(", ");
    let shown = shown.iter().join(", ");
    if hidden.is_empty() {
        format!("Showing: {}", shown)
    } else {
        format!("Showing: {} (hidden: {})", shown, hidden)
    }
}

async fn print_rows(services: &AppServices, token: SessionToken) {
    let shown = services
        .session_service
        .filter(token)
        .await
        .exit_on_err("Failed to read status filter");
    let visible = services
        .session_service
        .visible_rows(token)
        .await
        .exit_on_err("Failed to read rows");

    println!("{}", filter_line(&shown).bright_black());

    if visible.is_empty() {
        println!("✅ No differences to show");
        return;
    }

    let table = Table::new(visible.iter().map(DiffRowView::from))
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()))
        .to_string();
    println!("{}", table);
}

async fn inspect_row(services: &AppServices, token: SessionToken, selector: &str, rows: &[ResultRow]) {
    let selector = RowSelector::from_str(selector).exit_on_err("Invalid --inspect value");
    let Some(row) = rows.iter().find(|r| selector.matches(r)) else {
        eprintln!("❌ No row matches '{}'", selector_label(&selector));
        std::process::exit(1);
    };

    let delta = services
        .script_service
        .inspect(token, row.id)
        .await
        .exit_on_err("Failed to fetch DDL delta");

    println!(
        "\n{} {} {}",
        "===".blue(),
        format!("{} {}", row.row.object_type, row.row.label).bold(),
        row.row.status.to_colored_string()
    );
    for (title, ddl) in [
        ("Source DDL", &delta.source_ddl),
        ("Target DDL", &delta.target_ddl),
        ("Diff DDL", &delta.diff_ddl),
    ] {
        println!("{}", format!("-- {}", title).bright_black());
        if ddl.trim().is_empty() {
            println!("{}", "(none)".bright_black());
        } else {
            println!("{}", ddl.trim_end());
        }
    }
    println!();
}

async fn select_rows(
    services: &AppServices,
    token: SessionToken,
    selectors: &[String],
    rows: &[ResultRow],
    visible: &[ResultRow],
) {
    for raw in selectors {
        let selector = RowSelector::from_str(raw).exit_on_err("Invalid --select value");
        let ids = selector.resolve(rows, visible);
        if ids.is_empty() {
            eprintln!("⚠️ No row matches '{}'", raw);
            continue;
        }
        services
            .session_service
            .select(token, &ids)
            .await
            .exit_on_err("Failed to select rows");
    }
}

fn selector_label(selector: &RowSelector) -> String {
    match selector {
        RowSelector::AllVisible => "all".to_string(),
        RowSelector::Typed(object_type, label) => format!("{}:{}", object_type, label),
        RowSelector::Label(label) => label.clone(),
    }
}

fn emit_script(draft: &ScriptDraft, args: &CompareArgs, ctx: &Context<'_>) {
    let dir = args
        .output_path
        .clone()
        .or_else(|| ctx.settings.script.output_dir.as_ref().map(PathBuf::from));

    match dir {
        Some(dir) => {
            let mut writer = ScriptWriter::new(ScriptWriterOptions {
                dir: Some(dir),
                file_prefix: None,
            })
            .exit_on_err("Failed to create script file");
            writer
                .write_draft(draft)
                .exit_on_err("Failed to write script");
            if let Some(path) = writer.file_path() {
                println!(
                    "✅ Script with {} statement block(s) written to {}",
                    draft.fragments.len(),
                    path.display()
                );
            }
        }
        None => println!("{}", draft.text.trim_end()),
    }
}
