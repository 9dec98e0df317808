use serde::Serialize;
use sqldump_csv::router::{first_chunk_exists, list_chunks, list_schema_tables, schema_file_name};
use sqldump_csv::schema::read_schema_file;
use std::path::PathBuf;

#[derive(Serialize)]
struct TableStatus {
    table: String,
    columns: usize,
    chunks: usize,
    fresh: bool,
}

pub fn run(dir: PathBuf, json: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("output directory does not exist: {}", dir.display());
    }

    let mut tables = Vec::new();
    for table in list_schema_tables(&dir)? {
        let fields = read_schema_file(&dir.join(schema_file_name(&table)))?;
        tables.push(TableStatus {
            columns: fields.len(),
            chunks: list_chunks(&dir, &table)?.len(),
            fresh: first_chunk_exists(&dir, &table)?,
            table,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    if tables.is_empty() {
        println!("No tables in {}", dir.display());
        return Ok(());
    }

    let width = tables.iter().map(|t| t.table.len()).max().unwrap_or(5).max(5);
    println!("{:<width$}  {:>7}  {:>6}  FRESH", "TABLE", "COLUMNS", "CHUNKS");
    for t in &tables {
        println!(
            "{:<width$}  {:>7}  {:>6}  {}",
            t.table,
            t.columns,
            t.chunks,
            if t.fresh { "yes" } else { "no" }
        );
    }
    Ok(())
}
