use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    engine::catalog::CatalogObject,
    types::{DdlDelta, DiffStatus, ObjectType},
};

/// How DDL text is canonicalized before two objects are compared.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizeOptions {
    pub ignore_whitespace: bool,
    pub ignore_owner: bool,
}

const SCHEMA_PLACEHOLDER: &str = "{schema}";

/// Canonical form of `ddl` used for equality checks. Schema qualifiers are
/// neutralized so the same object in differently named schemas compares equal.
pub fn normalize_ddl(ddl: &str, schema: &str, options: NormalizeOptions) -> String {
    let mut text = rewrite_schema(ddl, schema, SCHEMA_PLACEHOLDER);

    if options.ignore_owner {
        text = text
            .lines()
            .filter(|line| !is_owner_statement(line))
            .join("\n");
    }

    if options.ignore_whitespace {
        text.split_whitespace().join(" ")
    } else {
        text.trim_end().to_string()
    }
}

fn is_owner_statement(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    upper.starts_with("ALTER ") && upper.contains(" OWNER TO ")
}

/// Replaces `from.` qualifiers (bare or double quoted) with `to.`.
/// A match must not be preceded by an identifier character.
pub fn rewrite_schema(ddl: &str, from: &str, to: &str) -> String {
    if from.is_empty() || from == to {
        return ddl.to_string();
    }

    let patterns = [format!("\"{}\".", from), format!("{}.", from)];
    let mut out = String::with_capacity(ddl.len());
    let mut rest = ddl;

    'outer: while !rest.is_empty() {
        for pattern in &patterns {
            if rest.starts_with(pattern.as_str()) {
                let boundary = out
                    .chars()
                    .last()
                    .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '"'));
                if boundary {
                    out.push_str(to);
                    out.push('.');
                    rest = &rest[pattern.len()..];
                    continue 'outer;
                }
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// One side of an object pair, with the name of the schema it lives in.
#[derive(Clone, Copy, Debug)]
pub struct ObjectRef<'a> {
    pub schema: &'a str,
    pub object: &'a CatalogObject,
}

/// Renders the source and target DDL plus the statements that turn the
/// target object into the source object.
pub fn render_delta(
    object_type: ObjectType,
    status: DiffStatus,
    target_schema: &str,
    source: Option<ObjectRef<'_>>,
    target: Option<ObjectRef<'_>>,
) -> Result<DdlDelta, String> {
    let source_ddl = source.map(|s| s.object.ddl.clone()).unwrap_or_default();
    let target_ddl = target.map(|t| t.object.ddl.clone()).unwrap_or_default();

    let diff_ddl = match (status, source, target) {
        (DiffStatus::Identical, Some(_), Some(_)) => String::new(),
        (DiffStatus::SourceOnly, Some(s), None) => {
            terminate(&rewrite_schema(&s.object.ddl, s.schema, target_schema))
        }
        (DiffStatus::TargetOnly, None, Some(t)) => drop_statement(object_type, t),
        (DiffStatus::Different, Some(s), Some(t)) => render_update(object_type, s, t),
        (status, source, target) => {
            return Err(format!(
                "{} delta with status {} does not match the objects found (source: {}, target: {})",
                object_type,
                status,
                if source.is_some() { "present" } else { "absent" },
                if target.is_some() { "present" } else { "absent" },
            ));
        }
    };

    Ok(DdlDelta {
        source_ddl,
        target_ddl,
        diff_ddl,
    })
}

fn drop_statement(object_type: ObjectType, target: ObjectRef<'_>) -> String {
    format!(
        "DROP {} {}.{};",
        object_type.sql_keyword(),
        target.schema,
        target.object.name
    )
}

fn render_update(object_type: ObjectType, source: ObjectRef<'_>, target: ObjectRef<'_>) -> String {
    let rewritten = rewrite_schema(&source.object.ddl, source.schema, target.schema);

    match object_type {
        ObjectType::Table => match alter_table_statements(source, target) {
            Some(statements) if !statements.is_empty() => statements.join("\n"),
            // Storage options, LIKE clauses or unnamed constraints: rebuild the table
            _ => format!("{}\n{}", drop_statement(object_type, target), terminate(&rewritten)),
        },
        ObjectType::Function
        | ObjectType::Procedure
        | ObjectType::TriggerFunction
        | ObjectType::View => terminate(&ensure_or_replace(&rewritten)),
        _ => format!("{}\n{}", drop_statement(object_type, target), terminate(&rewritten)),
    }
}

fn terminate(statement: &str) -> String {
    let trimmed = statement.trim_end();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

fn ensure_or_replace(ddl: &str) -> String {
    let trimmed = ddl.trim_start();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("CREATE ") && !upper.starts_with("CREATE OR REPLACE ") {
        format!("CREATE OR REPLACE {}", &trimmed["CREATE ".len()..])
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ColumnDef {
    name: String,
    data_type: String,
    not_null: bool,
    default: Option<String>,
}

/// Table-level constraint, with whitespace collapsed and the schema already
/// rewritten to the target's.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TableConstraint {
    name: Option<String>,
    definition: String,
}

fn table_constraints(ddl: &str, from_schema: &str, to_schema: &str) -> Vec<TableConstraint> {
    table_elements(ddl)
        .into_iter()
        .filter(|e| is_table_constraint(e))
        .map(|e| {
            let definition = rewrite_schema(&e, from_schema, to_schema)
                .split_whitespace()
                .join(" ");
            let mut tokens = definition.split_whitespace();
            let name = match tokens.next() {
                Some(first) if first.eq_ignore_ascii_case("CONSTRAINT") => {
                    tokens.next().map(str::to_string)
                }
                _ => None,
            };
            TableConstraint { name, definition }
        })
        .collect()
}

/// Column and constraint changes turning `target` into `source`, or `None`
/// when a removed constraint has no name to drop it by.
fn alter_table_statements(source: ObjectRef<'_>, target: ObjectRef<'_>) -> Option<Vec<String>> {
    let table = format!("{}.{}", target.schema, target.object.name);

    let source_constraints = table_constraints(&source.object.ddl, source.schema, target.schema);
    let target_constraints = table_constraints(&target.object.ddl, target.schema, target.schema);

    let mut statements = Vec::new();

    for constraint in &target_constraints {
        if !source_constraints.contains(constraint) {
            let name = constraint.name.as_ref()?;
            statements.push(format!("ALTER TABLE {} DROP CONSTRAINT {};", table, name));
        }
    }

    statements.extend(alter_column_statements(&table, source, target));

    for constraint in &source_constraints {
        if !target_constraints.contains(constraint) {
            statements.push(format!("ALTER TABLE {} ADD {};", table, constraint.definition));
        }
    }

    Some(statements)
}

fn alter_column_statements(table: &str, source: ObjectRef<'_>, target: ObjectRef<'_>) -> Vec<String> {
    let source_cols: Vec<ColumnDef> = extract_columns(&source.object.ddl)
        .iter()
        .filter_map(|c| parse_column(c))
        .collect();
    let target_cols: Vec<ColumnDef> = extract_columns(&target.object.ddl)
        .iter()
        .filter_map(|c| parse_column(c))
        .collect();

    let target_map: HashMap<&str, &ColumnDef> =
        target_cols.iter().map(|c| (column_key(&c.name), c)).collect();
    let source_map: HashMap<&str, &ColumnDef> =
        source_cols.iter().map(|c| (column_key(&c.name), c)).collect();

    let mut statements = Vec::new();

    for col in &source_cols {
        match target_map.get(column_key(&col.name)) {
            None => {
                let mut def = format!("{} {}", col.name, col.data_type);
                if let Some(default) = &col.default {
                    def.push_str(&format!(" DEFAULT {}", default));
                }
                if col.not_null {
                    def.push_str(" NOT NULL");
                }
                statements.push(format!("ALTER TABLE {} ADD COLUMN {};", table, def));
            }
            Some(existing) => {
                if !existing.data_type.eq_ignore_ascii_case(&col.data_type) {
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
                        table, col.name, col.data_type
                    ));
                }
                if existing.not_null != col.not_null {
                    let action = if col.not_null { "SET" } else { "DROP" };
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL;",
                        table, col.name, action
                    ));
                }
                if existing.default != col.default {
                    let stmt = match &col.default {
                        Some(default) => format!(
                            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                            table, col.name, default
                        ),
                        None => format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                            table, col.name
                        ),
                    };
                    statements.push(stmt);
                }
            }
        }
    }

    for col in &target_cols {
        if !source_map.contains_key(column_key(&col.name)) {
            statements.push(format!("ALTER TABLE {} DROP COLUMN {};", table, col.name));
        }
    }

    statements
}

fn column_key(name: &str) -> &str {
    name.trim_matches('"')
}

/// Column definitions between the outermost parentheses of a CREATE TABLE.
fn extract_columns(ddl: &str) -> Vec<String> {
    table_elements(ddl)
        .into_iter()
        .filter(|e| !is_constraint_line(e))
        .collect()
}

/// Comma separated entries between the outermost parentheses of a CREATE TABLE.
fn table_elements(ddl: &str) -> Vec<String> {
    let mut columns = Vec::new();

    let (Some(start), Some(end)) = (ddl.find('('), ddl.rfind(')')) else {
        return columns;
    };
    if end <= start {
        return columns;
    }

    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for ch in ddl[start + 1..end].chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 && !in_quote => {
                push_column(&mut columns, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_column(&mut columns, &current);

    columns
}

fn push_column(columns: &mut Vec<String>, raw: &str) {
    let col = raw.trim();
    if !col.is_empty() {
        columns.push(col.to_string());
    }
}

fn is_table_constraint(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    is_constraint_line(line) && !upper.starts_with("LIKE") && !upper.starts_with("--")
}

fn is_constraint_line(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    upper.starts_with("CONSTRAINT")
        || upper.starts_with("PRIMARY KEY")
        || upper.starts_with("FOREIGN KEY")
        || upper.starts_with("UNIQUE")
        || upper.starts_with("CHECK")
        || upper.starts_with("EXCLUDE")
        || upper.starts_with("LIKE")
        || line.trim().starts_with("--")
}

const CLAUSE_KEYWORDS: [&str; 10] = [
    "NOT",
    "NULL",
    "DEFAULT",
    "CONSTRAINT",
    "PRIMARY",
    "REFERENCES",
    "CHECK",
    "UNIQUE",
    "COLLATE",
    "GENERATED",
];

fn is_clause_keyword(token: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|k| token.eq_ignore_ascii_case(k))
}

/// Splits `name type [DEFAULT expr] [NOT NULL] ...` into its parts.
fn parse_column(col_def: &str) -> Option<ColumnDef> {
    let tokens: Vec<&str> = col_def.split_whitespace().collect();
    let (name, rest) = tokens.split_first()?;

    let type_len = rest.iter().take_while(|t| !is_clause_keyword(t)).count();
    if type_len == 0 {
        return None;
    }
    let data_type = rest[..type_len].join(" ");

    let mut not_null = false;
    let mut default = None;
    let mut i = type_len;

    while i < rest.len() {
        let token = rest[i].to_uppercase();
        match token.as_str() {
            "NOT" if rest.get(i + 1).is_some_and(|t| t.eq_ignore_ascii_case("NULL")) => {
                not_null = true;
                i += 2;
            }
            "DEFAULT" => {
                let len = rest[i + 1..]
                    .iter()
                    .take_while(|t| !is_clause_keyword(t))
                    .count();
                default = Some(rest[i + 1..i + 1 + len].join(" "));
                i += 1 + len;
            }
            "PRIMARY" => {
                // PRIMARY KEY implies NOT NULL
                not_null = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    Some(ColumnDef {
        name: name.to_string(),
        data_type,
        not_null,
        default: default.filter(|d| !d.is_empty()),
    })
}
