//! Load sink: materializes Parquet artifacts as tables in a local DuckDB
//! store, all under the reserved `raw` schema. One table per artifact, named
//! by the file stem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use duckdb::{params, Connection};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Store operation failed: {0}")]
    Store(#[from] duckdb::Error),

    #[error("Failed to scan artifact directory: {0}")]
    Io(#[from] std::io::Error),
}

/// How the destination tables are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Replace each destination table with the artifact's current contents.
    /// Re-running on unchanged input is idempotent.
    FullRefresh,
    /// Append to existing tables (create them if absent). Re-running on
    /// unchanged input duplicates rows — append semantics, not a merge.
    Incremental,
}

#[derive(Debug)]
pub struct LoadedTable {
    pub name: String,
    /// Row count of the destination table after loading.
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub tables: Vec<LoadedTable>,
}

/// Load every `*.parquet` file in `parquet_dir` into the store at `db_path`.
///
/// The `raw` schema is created even when the directory holds no artifacts.
/// The connection is opened once per invocation and is the only writer.
pub fn load_dir(
    parquet_dir: &Path,
    db_path: &Path,
    mode: LoadMode,
) -> Result<LoadSummary, LoadError> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("CREATE SCHEMA IF NOT EXISTS raw;")?;

    // A directory that was never created is the same as one with no
    // artifacts: warn and leave the store with just the schema.
    let mut files: Vec<PathBuf> = match fs::read_dir(parquet_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "parquet"))
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    files.sort();

    if files.is_empty() {
        warn!(dir = %parquet_dir.display(), "no parquet artifacts found");
    }

    let mut summary = LoadSummary::default();
    for file in &files {
        let Some(table) = file.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        load_file(&conn, table, file, mode)?;
        let rows = table_rows(&conn, table)?;
        info!(table = %format!("raw.{table}"), rows, ?mode, "loaded table");
        summary.tables.push(LoadedTable {
            name: table.to_string(),
            rows,
        });
    }

    info!(tables = summary.tables.len(), db = %db_path.display(), "load complete");
    Ok(summary)
}

fn load_file(
    conn: &Connection,
    table: &str,
    file: &Path,
    mode: LoadMode,
) -> Result<(), LoadError> {
    let source = format!("read_parquet('{}')", sql_string(&file.to_string_lossy()));
    let target = format!("raw.{}", quote_ident(table));

    match mode {
        LoadMode::FullRefresh => {
            conn.execute_batch(&format!(
                "CREATE OR REPLACE TABLE {target} AS SELECT * FROM {source};"
            ))?;
        }
        LoadMode::Incremental => {
            if table_exists(conn, table)? {
                conn.execute_batch(&format!("INSERT INTO {target} SELECT * FROM {source};"))?;
            } else {
                conn.execute_batch(&format!(
                    "CREATE TABLE {target} AS SELECT * FROM {source};"
                ))?;
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, LoadError> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM information_schema.tables
         WHERE table_schema = 'raw' AND table_name = ?",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn table_rows(conn: &Connection, table: &str) -> Result<usize, LoadError> {
    let count: i64 = conn.query_row(
        &format!("SELECT count(*) FROM raw.{}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
