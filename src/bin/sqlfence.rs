//! # sqlfence CLI Entry Point
//!
//! Binary entry point for the sqlfence command-line interface.
//!
//! ## Usage
//!
//! ```bash
//! # Open the REPL against a schema file (or $SQLFENCE_SCHEMA, or the
//! # bundled trips schema)
//! sqlfence schemas/trips.json
//!
//! # Print the grammar in Lark syntax, or as JSON
//! sqlfence --grammar schemas/trips.json
//! sqlfence --json schemas/trips.json
//!
//! # Verify one query; exit status 2 on rejection
//! sqlfence --verify "SELECT count() FROM trips" schemas/trips.json
//! ```

use eyre::{bail, Result, WrapErr};
use sqlfence::cli::Repl;
use sqlfence::config::{LimitPolicy, Settings, VerifierConfigBuilder};
use sqlfence::schema::{SchemaRegistry, TableSchema};
use sqlfence::verify::Verifier;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const REJECTED_EXIT_CODE: i32 = 2;

enum Mode {
    Repl,
    Grammar,
    Json,
    Verify(String),
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let settings = Settings::from_env()?;
    init_tracing(&settings.log_filter);

    let args: Vec<String> = env::args().collect();
    let mut mode = Mode::Repl;
    let mut policy = settings.limit_policy;
    let mut schema_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(0);
            }
            "--version" | "-v" => {
                println!("sqlfence {}", env!("CARGO_PKG_VERSION"));
                return Ok(0);
            }
            "--grammar" | "-g" => mode = Mode::Grammar,
            "--json" | "-j" => mode = Mode::Json,
            "--clamp" => policy = LimitPolicy::Clamp,
            "--verify" => {
                i += 1;
                match args.get(i) {
                    Some(sql) => mode = Mode::Verify(sql.clone()),
                    None => bail!("--verify requires a SQL argument"),
                }
            }
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            path => {
                if schema_path.is_some() {
                    bail!("Multiple schema paths specified");
                }
                schema_path = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    let registry = load_registry(schema_path.or(settings.schema_path), settings.schema_dir)?;
    let entry = registry.resolve(None)?;
    let config = VerifierConfigBuilder::from_schema(entry.schema())
        .limit_policy(policy)
        .build();

    match mode {
        Mode::Grammar => {
            let grammar = entry.grammar()?;
            print!("{}", grammar.to_lark());
        }
        Mode::Json => {
            let grammar = entry.grammar()?;
            println!("{}", grammar.to_json().wrap_err("failed to serialize grammar")?);
        }
        Mode::Verify(sql) => {
            let result = Verifier::new(entry.schema(), config).verify(&sql);
            println!(
                "{}",
                serde_json::to_string_pretty(&result).wrap_err("failed to serialize result")?
            );
            if !result.accepted {
                return Ok(REJECTED_EXIT_CODE);
            }
        }
        Mode::Repl => {
            let mut repl = Repl::new(entry, config)?;
            repl.run()?;
        }
    }

    Ok(0)
}

fn load_registry(schema_path: Option<PathBuf>, schema_dir: Option<PathBuf>) -> Result<SchemaRegistry> {
    let mut registry = match schema_path {
        Some(path) => SchemaRegistry::from_path(&path)
            .wrap_err_with(|| format!("failed to load schema from {:?}", path))?,
        None => SchemaRegistry::new(TableSchema::trips()?),
    };
    if let Some(dir) = schema_dir {
        registry
            .load_dir(&dir)
            .wrap_err_with(|| format!("failed to load schemas from {:?}", dir))?;
    }
    registry
        .compile_all()
        .wrap_err("failed to compile query grammar")?;
    Ok(registry)
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!("sqlfence - Schema-derived query grammar and SQL verifier");
    println!();
    println!("USAGE:");
    println!("    sqlfence [OPTIONS] [SCHEMA_JSON]");
    println!();
    println!("ARGS:");
    println!("    <SCHEMA_JSON>      Schema definition (default: $SQLFENCE_SCHEMA, else bundled trips)");
    println!();
    println!("OPTIONS:");
    println!("    -g, --grammar      Print the compiled grammar in Lark syntax");
    println!("    -j, --json         Print the compiled grammar artifact as JSON");
    println!("        --verify SQL   Verify one query, print the result as JSON");
    println!("        --clamp        Clamp LIMIT to the ceiling instead of rejecting");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version information");
    println!();
    println!("EXAMPLES:");
    println!("    sqlfence schemas/trips.json");
    println!("    sqlfence --verify \"SELECT count() FROM trips\"");
}
