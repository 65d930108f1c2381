use std::path::Path;
use std::time::Instant;
use std::{env, process};

use toad_base::{formats, utils, Group, GroupIdentifier, PersistentStore, StoreParams};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // Parse arguments.
    let config = Config::new()?;

    // Build the groups.
    let mut groups: Vec<Group> = Vec::new();
    let mut sequence_files: Vec<&String> = Vec::new();
    for filename in config.input_files.iter() {
        if !utils::file_exists(filename) {
            return Err(format!("Input file {} does not exist", filename));
        }
        if is_snapshot(filename) {
            let group = Group::load_from(filename).map_err(|x| format!("{}: {}", filename, x))?;
            log::info!("Loaded group {} with {} runs from {}", group.identifier(), group.len(), filename);
            groups.push(group);
        } else {
            sequence_files.push(filename);
        }
    }
    if !sequence_files.is_empty() {
        let id = config.group.as_ref().ok_or(
            "Group name must be provided with --group for FASTA/FASTQ input".to_string()
        )?;
        let mut group = Group::new(id.clone());
        for filename in sequence_files {
            let records = formats::read_records(filename, id).map_err(|x| format!("{}: {}", filename, x))?;
            group.insert(records, true).map_err(|x| format!("{}: {}", filename, x))?;
        }
        groups.push(group);
    }

    // Store the groups.
    let mut store = PersistentStore::open(&config.db_file, config.params.clone()).map_err(|x| x.to_string())?;
    for group in groups.iter() {
        store.keep(group).map_err(|x| x.to_string())?;
    }
    store.commit().map_err(|x| x.to_string())?;

    // Statistics.
    let groups = store.group_count().map_err(|x| x.to_string())?;
    let sequences = store.sequence_count().map_err(|x| x.to_string())?;
    let size = store.file_size().unwrap_or(String::from("unknown size"));
    eprintln!("The database contains {} groups and {} distinct sequences ({})", groups, sequences, size);
    store.close().map_err(|x| x.to_string())?;

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

fn is_snapshot(filename: &str) -> bool {
    Path::new(filename).extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

//-----------------------------------------------------------------------------

struct Config {
    pub input_files: Vec<String>,
    pub db_file: String,
    pub group: Option<GroupIdentifier>,
    pub params: StoreParams,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();
        let header = format!("Usage: {} [options] -o toad.db input1 [input2 ...]", program);

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "database file name (required)", "FILE");
        opts.optopt("g", "group", "group name for FASTA/FASTQ input", "STR");
        let page_size_desc = format!("page size for duplicate scans (default {})", StoreParams::PAGE_SIZE);
        opts.optopt("", "page-size", &page_size_desc, "INT");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            eprintln!();
            eprintln!("Files ending with .json are group snapshots; other files are read as FASTA/FASTQ.");
            process::exit(0);
        }

        let mut params = StoreParams::default();
        if let Some(s) = matches.opt_str("page-size") {
            params.page_size = s.parse::<usize>().map_err(|x| format!("--page-size: {}", x))?;
            params.validate().map_err(|x| format!("--page-size: {}", x))?;
        }
        let group = matches.opt_str("g").map(|s| GroupIdentifier::new(&s));

        if matches.free.is_empty() {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        Ok(Config {
            input_files: matches.free.clone(),
            db_file: matches.opt_str("o").ok_or("Database file must be provided with --output".to_string())?,
            group,
            params,
        })
    }
}

//-----------------------------------------------------------------------------
