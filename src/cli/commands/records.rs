//! Generic record commands: query, insert, update, delete.

use super::{fields_arg, open_database, print_json, table_arg};
use crate::cli::QueryArgs;
use crate::error::{Error, Result};
use crate::query::{parse_field_value, Direction, Predicate, Query};
use crate::scope::ID_FIELD;
use crate::storage::Row;
use crate::validate::find_similar_ids;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Serialize)]
struct QueryOutput {
    table: &'static str,
    rows: Vec<Row>,
    count: usize,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    table: &'a str,
    deleted: usize,
}

/// Execute `af query`.
pub fn execute_query(args: &QueryArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let table = table_arg(&args.table)?;
    let db = open_database(db_path)?;
    let session = db.session()?;

    let mut builder = Query::select(table);
    for expr in &args.filters {
        builder = builder.filter(Predicate::parse(expr)?);
    }
    if let Some(field) = &args.order {
        let direction = if args.desc {
            Direction::Descending
        } else {
            Direction::Ascending
        };
        builder = builder.order(field.as_str(), direction);
    }
    let query = builder.build();

    if args.single {
        let row = db.single(&session, &query)?;
        return print_row(&row, json);
    }

    let mut rows = db.execute(&session, &query)?;
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if json {
        let count = rows.len();
        return print_json(&QueryOutput { table, rows, count });
    }

    if rows.is_empty() {
        println!("No records in {table}.");
        return Ok(());
    }
    for row in &rows {
        print_row(row, false)?;
    }
    println!("{}", format!("{} record(s)", rows.len()).dimmed());
    Ok(())
}

/// Execute `af insert`.
pub fn execute_insert(
    table: &str,
    data: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let table = table_arg(table)?;
    let fields = fields_arg(data)?;
    let mut db = open_database(db_path)?;
    let session = db.session()?;

    let row = db.insert(&session, table, fields)?;
    if json {
        return print_row(&row, true);
    }
    println!("Created {} in {}", row_id(&row).cyan(), table);
    Ok(())
}

/// Execute `af update`.
pub fn execute_update(
    table: &str,
    field: &str,
    value: &str,
    data: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let table = table_arg(table)?;
    let patch = fields_arg(data)?;
    let mut db = open_database(db_path)?;
    let session = db.session()?;

    let target = parse_field_value(field, value);
    let row = match db.update_where(&session, table, field, target, patch) {
        Ok(row) => row,
        Err(Error::NotFound { table: t, detail }) if field == ID_FIELD => {
            // Suggest close ids from the caller's own records.
            let visible = db.execute(&session, &Query::select(table).build())?;
            let ids: Vec<String> = visible.iter().map(|r| row_id(r).to_string()).collect();
            let similar = find_similar_ids(value, &ids, 3);
            if similar.is_empty() {
                return Err(Error::NotFound { table: t, detail });
            }
            return Err(Error::NotFound {
                table: t,
                detail: format!("{detail} (similar: {})", similar.join(", ")),
            });
        }
        Err(e) => return Err(e),
    };

    if json {
        return print_row(&row, true);
    }
    println!("Updated {} in {}", row_id(&row).cyan(), table);
    Ok(())
}

/// Execute `af delete`.
pub fn execute_delete(
    table: &str,
    field: &str,
    value: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let table = table_arg(table)?;
    let mut db = open_database(db_path)?;
    let session = db.session()?;

    let deleted = db.delete_where(&session, table, field, parse_field_value(field, value))?;
    if json {
        return print_json(&DeleteOutput { table, deleted });
    }
    println!("Deleted {deleted} record(s) from {table}");
    Ok(())
}

fn row_id(row: &Row) -> &str {
    row.get(ID_FIELD).and_then(Value::as_str).unwrap_or("?")
}

fn print_row(row: &Row, json: bool) -> Result<()> {
    if json {
        return print_json(row);
    }
    let rest: Row = row
        .iter()
        .filter(|(k, _)| k.as_str() != ID_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    println!("{}  {}", row_id(row).cyan(), serde_json::to_string(&rest)?);
    Ok(())
}
