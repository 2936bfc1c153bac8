use std::path::PathBuf;
use std::process;

use clap::Parser;

use heapdb::error::Result;
use heapdb::schema::TupleDesc;
use heapdb::storage::heap_file::HeapFile;
use heapdb::storage::page::{HeapPageId, DEFAULT_PAGE_SIZE};
use heapdb::types::DataType;

const EXIT_OK: i32 = 0;
const EXIT_FATAL_ERROR: i32 = 20;

#[derive(Parser)]
#[command(name = "heapdb-inspect", about = "Inspect pages and tuples of a heap file")]
struct Cli {
    /// Path to the heap file
    file: PathBuf,

    /// Comma-separated column types, e.g. "bigint,varchar"
    #[arg(long, value_name = "TYPES")]
    schema: String,

    /// Page size the file was written with
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Also print the decoded tuples
    #[arg(long)]
    tuples: bool,
}

fn parse_schema(input: &str) -> std::result::Result<TupleDesc, String> {
    let mut types = Vec::new();
    for part in input.split(',') {
        match part.trim().to_ascii_lowercase().as_str() {
            "bigint" | "int" => types.push(DataType::BigInt),
            "varchar" | "string" => types.push(DataType::Varchar),
            other => return Err(format!("unknown column type '{}'", other)),
        }
    }
    if types.is_empty() {
        return Err("schema has no columns".to_string());
    }
    Ok(TupleDesc::unnamed(&types))
}

fn inspect(cli: &Cli, schema: TupleDesc) -> Result<()> {
    let file = HeapFile::open(&cli.file, schema, cli.page_size)?;
    let num_pages = file.num_pages()?;

    println!("file:      {}", file.path().display());
    println!("table id:  {}", file.id());
    println!("page size: {}", file.page_size());
    println!("pages:     {}", num_pages);

    let mut total_tuples = 0usize;
    for page_no in 0..num_pages {
        let page = file.read_page(HeapPageId::new(file.id(), page_no))?;
        let tuples = page.tuples(file.schema())?;
        println!(
            "page {:>4}: {:>5} tuples, {:>5} bytes free",
            page_no,
            tuples.len(),
            page.free_space()
        );
        if cli.tuples {
            for tuple in &tuples {
                let rendered: Vec<String> =
                    tuple.values().iter().map(|v| v.to_string()).collect();
                let rid = tuple.rid().expect("stored tuple carries a record id");
                println!("  [{}] ({})", rid.slot, rendered.join(", "));
            }
        }
        total_tuples += tuples.len();
    }
    println!("total:     {} tuples", total_tuples);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let schema = match parse_schema(&cli.schema) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(EXIT_FATAL_ERROR);
        }
    };

    match inspect(&cli, schema) {
        Ok(()) => process::exit(EXIT_OK),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(EXIT_FATAL_ERROR);
        }
    }
}
