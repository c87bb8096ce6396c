use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use buffer::BufferPool;
use catalog::Catalog;
use clap::{Parser, ValueEnum};
use common::{
    Config, DEFAULT_PAGE_SIZE, TableId, TransactionId, Tuple, TupleDesc,
    pretty::{self, TableStyleKind},
};
use executor::{ExecutionContext, Executor, SeqScanExec};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;
use types::Field;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::builder()
        .data_dir(
            args.schema
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        )
        .page_size(args.page_size)
        .buffer_pool_pages(args.buffer_pages)
        .build();

    let mut catalog = Catalog::new();
    catalog
        .load_schema(&args.schema, &config)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let table = catalog
        .table_id(&args.table)
        .with_context(|| format!("no table named '{}'", args.table))?;
    let catalog = Arc::new(catalog);

    if args.pages {
        return print_page_report(&catalog, table, &args);
    }

    let pool = Arc::new(BufferPool::from_config(catalog.clone(), &config));
    let ctx = ExecutionContext::new(catalog, pool.clone());
    let tid = TransactionId::next();
    let alias = args.alias.as_deref().unwrap_or(&args.table);
    let mut scan = SeqScanExec::new(&ctx, tid, table, Some(alias))?;

    let tuples = collect_window(&mut scan, args.offset, args.limit)?;
    pool.transaction_complete(tid)?;
    if let Some(stats) = scan.stats() {
        info!(
            "scanned {} pages, {} rows in {}",
            stats.pages_scanned,
            stats.rows_produced,
            common::ExecutionStats::format_duration(stats.total_time())
        );
    }

    if tuples.is_empty() {
        println!("No tuples found.");
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => {
            let style: TableStyleKind = args.style.into();
            println!("{}", render_scan(scan.schema(), &tuples, args.rids, style));
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = tuples
                .iter()
                .map(|tuple| tuple_to_json(scan.schema(), tuple, args.rids))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

/// Pull tuples `offset..offset + limit` from an unopened scan.
fn collect_window(
    scan: &mut dyn Executor,
    offset: usize,
    limit: Option<usize>,
) -> Result<Vec<Tuple>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut tuples = Vec::new();
    let mut skipped = 0;

    scan.open()?;
    while tuples.len() < limit && scan.has_next()? {
        let tuple = scan.next()?;
        if skipped < offset {
            skipped += 1;
            continue;
        }
        tuples.push(tuple);
    }
    scan.close()?;
    Ok(tuples)
}

#[derive(Parser, Debug)]
#[command(name = "heap-viewer")]
#[command(about = "Inspect and pretty-print heap file tables", long_about = None)]
struct Args {
    /// Path to the JSON schema describing the tables
    schema: PathBuf,
    /// Table to inspect
    table: String,
    /// Alias used to qualify column names (defaults to the table name)
    #[arg(short, long)]
    alias: Option<String>,
    /// Output format (table or json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Style used for table rendering
    #[arg(long, value_enum, default_value_t = CliTableStyle::Modern)]
    style: CliTableStyle,
    /// Maximum number of tuples to display
    #[arg(long)]
    limit: Option<usize>,
    /// Number of tuples to skip before printing
    #[arg(long, default_value_t = 0)]
    offset: usize,
    /// Include each tuple's (page, slot) location
    #[arg(long)]
    rids: bool,
    /// Print per-page slot occupancy instead of tuples
    #[arg(long)]
    pages: bool,
    /// Page size the heap files were written with
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Number of pages the buffer pool keeps resident
    #[arg(
        long,
        default_value_t = 64,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    buffer_pages: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliTableStyle {
    Modern,
    Ascii,
    Plain,
}

impl From<CliTableStyle> for TableStyleKind {
    fn from(value: CliTableStyle) -> Self {
        match value {
            CliTableStyle::Modern => TableStyleKind::Modern,
            CliTableStyle::Ascii => TableStyleKind::Ascii,
            CliTableStyle::Plain => TableStyleKind::Plain,
        }
    }
}

fn render_scan(
    desc: &TupleDesc,
    tuples: &[Tuple],
    rids: bool,
    style: TableStyleKind,
) -> String {
    if !rids {
        return pretty::render_tuples(desc, tuples, style);
    }

    let names: Vec<String> = desc
        .items()
        .map(|item| item.name.clone().unwrap_or_else(|| "null".into()))
        .collect();
    let mut headers = vec!["RID"];
    headers.extend(names.iter().map(String::as_str));

    let rows = tuples
        .iter()
        .map(|tuple| {
            let rid = tuple
                .record_id()
                .map(|rid| pretty::format_record_id(&rid))
                .unwrap_or_else(|| "-".into());
            std::iter::once(rid)
                .chain(tuple.fields().iter().map(pretty::format_field))
                .collect()
        })
        .collect();
    pretty::render_string_table(&headers, rows, style)
}

fn field_to_json(field: &Field) -> Value {
    match field {
        Field::Int(v) => Value::from(*v),
        Field::String(s) => Value::from(s.as_str()),
    }
}

fn tuple_to_json(desc: &TupleDesc, tuple: &Tuple, rids: bool) -> Value {
    let mut object = Map::new();
    if rids && let Some(rid) = tuple.record_id() {
        object.insert(
            "rid".into(),
            serde_json::json!({ "page": rid.page_id.page_no, "slot": rid.slot }),
        );
    }
    for (index, (item, field)) in desc.items().zip(tuple.fields()).enumerate() {
        let mut name = item.name.clone().unwrap_or_else(|| "null".into());
        if object.contains_key(&name) {
            name = format!("{name}#{index}");
        }
        object.insert(name, field_to_json(field));
    }
    Value::Object(object)
}

#[derive(Clone, Debug, Serialize, Tabled)]
struct PageReport {
    #[tabled(rename = "Page")]
    page: u64,
    #[tabled(rename = "Used")]
    used: usize,
    #[tabled(rename = "Free")]
    free: usize,
    #[tabled(rename = "Occupancy")]
    occupancy: String,
}

fn page_report(catalog: &Catalog, table: TableId) -> Result<Vec<PageReport>> {
    let file = catalog.file(table)?;
    let mut reports = Vec::new();
    for page_no in 0..file.num_pages()? {
        let page = file
            .read_page(page_no)
            .with_context(|| format!("failed to decode page {page_no}"))?;
        let occupancy = (0..page.num_slots())
            .map(|slot| match page.is_slot_used(slot) {
                Ok(true) => '#',
                _ => '.',
            })
            .collect();
        reports.push(PageReport {
            page: page_no,
            used: page.num_used_slots(),
            free: page.num_empty_slots(),
            occupancy,
        });
    }
    Ok(reports)
}

fn print_page_report(catalog: &Catalog, table: TableId, args: &Args) -> Result<()> {
    let layout = catalog.file(table)?.layout();
    let reports = page_report(catalog, table)?;
    match args.format {
        OutputFormat::Table => {
            println!(
                "{}: {} pages, {} slots/page, {} header bytes, {} bytes/tuple",
                args.table,
                reports.len(),
                layout.num_slots(),
                layout.header_len(),
                layout.record_len()
            );
            println!(
                "{}",
                pretty::render_structured_rows(&reports, args.style.into())
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}
