//! vssdump - forensic dumper for Visual SourceSafe databases.
//!
//! This is the command-line entry point: it opens a database, builds the
//! project tree and dumps records, revisions or the reconstructed history.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use sourcesafe::db::{Database, DatabaseConfig};
use sourcesafe::dump::{dump_database, dump_history, VerboseFlags};
use sourcesafe::encoding::Encoding;
use sourcesafe::record::PhysicalName;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Parse simple command line args.
    let mut database: Option<String> = None;
    let mut log: Option<String> = None;
    let mut encoding = String::from("mbcs");
    let mut root_project_file: Option<String> = None;
    let mut verbose: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-L" | "--log" => {
                i += 1;
                if i < args.len() {
                    log = Some(args[i].clone());
                }
            }
            "-E" | "--encoding" => {
                i += 1;
                if i < args.len() {
                    encoding = args[i].clone();
                }
            }
            "-P" | "--root-project-file" => {
                i += 1;
                if i < args.len() {
                    root_project_file = Some(args[i].clone());
                }
            }
            "-V" | "--verbose" => {
                i += 1;
                if i < args.len() {
                    verbose.extend(args[i].split(',').map(str::to_string));
                }
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--version" => {
                println!("vssdump v{}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            arg => {
                if let Some(value) = arg.strip_prefix("--encoding=") {
                    encoding = value.to_string();
                } else if !arg.starts_with('-') && database.is_none() {
                    database = Some(arg.to_string());
                } else {
                    eprintln!("Unknown option: {}", arg);
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    let Some(database) = database else {
        eprintln!("Missing database path");
        print_help();
        return ExitCode::FAILURE;
    };

    let encoding = match Encoding::resolve(&encoding) {
        Ok(encoding) => encoding,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut config = DatabaseConfig::new(&database).encoding(encoding);
    if let Some(physical) = root_project_file {
        config = config.root_project_file(PhysicalName::new(physical.to_uppercase()));
    }

    let mut sink: Box<dyn Write> = match log {
        Some(path) => match File::create(&path) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(e) => {
                eprintln!("Error opening log file {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(std::io::stdout()),
    };

    eprintln!("Loading database {}", database);
    match run(config, &mut sink, &verbose) {
        Ok(()) => {
            eprintln!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(
    config: DatabaseConfig,
    sink: &mut Box<dyn Write>,
    verbose: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open_with_config(config)?;
    let root = db.open_root_project(true)?;

    let records = verbose.iter().any(|v| v == "records");
    let projects = verbose.iter().any(|v| v == "projects");
    let revisions = verbose.iter().any(|v| v == "revisions") || verbose.is_empty();

    let mut flags = VerboseFlags::default();
    if projects {
        flags = flags.with(VerboseFlags::PROJECT_TREE);
    }
    if records {
        flags = flags.with(VerboseFlags::RECORDS | VerboseFlags::FILE_HEADERS);
    }
    if flags.0 != 0 {
        dump_database(&db, &root, sink, flags)?;
    }
    if revisions {
        dump_history(&db, &root, sink)?;
    }
    sink.flush()?;
    Ok(())
}

fn print_help() {
    println!("vssdump - dump a Visual SourceSafe database");
    println!();
    println!("Usage: vssdump [OPTIONS] DATABASE");
    println!();
    println!("Options:");
    println!("  -L, --log FILE               Write output to FILE (default: stdout)");
    println!("  -E, --encoding NAME          Database encoding (default: mbcs)");
    println!("  -P, --root-project-file NAME Dump from this project file, recursively");
    println!("  -V, --verbose WHAT           Comma-separated: projects, records, revisions");
    println!("  -h, --help                   Show this help message");
    println!("      --version                Show version");
    println!();
    println!("Examples:");
    println!("  vssdump ./vss_db                        Dump the reconstructed history");
    println!("  vssdump -V records,projects ./vss_db    Dump raw records and the tree");
}
