use std::io::{self, Write};
use std::{env, process};

use toad_base::{DocumentSections, Fingerprint, GroupIdentifier, PersistentStore, Record, RunCollection, RunIdentifier, StoreKey, StoreParams, StoredObject};
use toad_base::db::{self, DatabaseFileType};
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // Parse arguments.
    let config = Config::new()?;

    // Open the database.
    match db::identify_database(&config.filename) {
        DatabaseFileType::Version(_) => {},
        DatabaseFileType::Missing => return Err(format!("Database {} does not exist", config.filename)),
        _ => return Err(format!("File {} is not a TOAD-base database", config.filename)),
    }
    let store = PersistentStore::open(&config.filename, StoreParams::default()).map_err(|x| x.to_string())?;

    let mut output = io::stdout().lock();
    match &config.query {
        QueryType::Carriers(fingerprint) => {
            let carriers = store.carriers(fingerprint).map_err(|x| x.to_string())?;
            for group in carriers.iter() {
                let signature_group = store.signature_group(fingerprint, group).map_err(|x| x.to_string())?;
                writeln!(output, "{}\t{}", group, signature_group.member_names().join(",")).map_err(|x| x.to_string())?;
            }
        },
        QueryType::Group(id, sections) => {
            let group = store.group(id).map_err(|x| x.to_string())?;
            let json = group.to_json_with(*sections).map_err(|x| x.to_string())?;
            writeln!(output, "{}", json).map_err(|x| x.to_string())?;
        },
        QueryType::Key(key) => {
            let object = store.lookup_by_kind(key).map_err(|x| x.to_string())?;
            write_object(&object, &mut output)?;
        },
        QueryType::Groups => {
            for id in store.group_identifiers().map_err(|x| x.to_string())? {
                let group = store.group(&id).map_err(|x| x.to_string())?;
                writeln!(output, "{}\t{}\t{}", id, group.len(), group.fingerprints().len()).map_err(|x| x.to_string())?;
            }
        },
        QueryType::Statistics => {
            let groups = store.group_count().map_err(|x| x.to_string())?;
            let sequences = store.sequence_count().map_err(|x| x.to_string())?;
            writeln!(output, "Version: {}", store.version()).map_err(|x| x.to_string())?;
            writeln!(output, "Groups: {}", groups).map_err(|x| x.to_string())?;
            writeln!(output, "Distinct sequences: {}", sequences).map_err(|x| x.to_string())?;
            if let Some(size) = store.file_size() {
                writeln!(output, "File size: {}", size).map_err(|x| x.to_string())?;
            }
        },
    }

    store.close().map_err(|x| x.to_string())?;
    Ok(())
}

//-----------------------------------------------------------------------------

fn write_record<W: Write>(record: &Record, output: &mut W) -> Result<(), String> {
    let run = record.id().map(|id| id.to_string()).unwrap_or_default();
    writeln!(
        output, "{}\t{}\t{}\t{}",
        run, record.group(), record.fingerprint(), record.sequence().unwrap_or("*")
    ).map_err(|x| x.to_string())
}

fn write_object<W: Write>(object: &StoredObject, output: &mut W) -> Result<(), String> {
    match object {
        StoredObject::Record(record) => write_record(record, output),
        StoredObject::Group(group) => {
            let json = group.to_json_with(DocumentSections::ALL).map_err(|x| x.to_string())?;
            writeln!(output, "{}", json).map_err(|x| x.to_string())
        },
        StoredObject::Sequence(value) => {
            let sequence = value.sequence().map_err(|x| x.to_string())?;
            writeln!(output, "{}\t{}", value.fingerprint(), sequence).map_err(|x| x.to_string())
        },
    }
}

//-----------------------------------------------------------------------------

enum QueryType {
    // Groups containing the fingerprint, with the runs in each group.
    Carriers(Fingerprint),
    // Group export as JSON.
    Group(GroupIdentifier, DocumentSections),
    // Any object by key.
    Key(StoreKey),
    // All groups with run and sequence counts.
    Groups,
    Statistics,
}

struct Config {
    pub filename: String,
    pub query: QueryType,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();
        let header = format!("Usage: {} [options] toad.db", program);

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("s", "sequence", "find the groups carrying this sequence", "STR");
        opts.optopt("f", "fingerprint", "find the groups carrying a sequence with this fingerprint", "STR");
        opts.optopt("g", "group", "export the group as JSON", "STR");
        opts.optflag("", "metadata", "omit sequences and signature groups from group export");
        opts.optopt("r", "run", "print the record for the run", "STR");
        opts.optopt("k", "key", "print the object with this key (e.g. [TOAD.SqRL:r1])", "STR");
        opts.optflag("l", "list", "list all groups");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let mut queries: Vec<QueryType> = Vec::new();
        if let Some(s) = matches.opt_str("s") {
            queries.push(QueryType::Carriers(Fingerprint::derive(&s)));
        }
        if let Some(s) = matches.opt_str("f") {
            queries.push(QueryType::Carriers(Fingerprint::from_literal(s)));
        }
        if let Some(s) = matches.opt_str("g") {
            let sections = if matches.opt_present("metadata") { DocumentSections::METADATA } else { DocumentSections::ALL };
            queries.push(QueryType::Group(GroupIdentifier::new(&s), sections));
        }
        if let Some(s) = matches.opt_str("r") {
            queries.push(QueryType::Key(StoreKey::Run(RunIdentifier::new(s))));
        }
        if let Some(s) = matches.opt_str("k") {
            queries.push(QueryType::Key(StoreKey::from_curie(&s).map_err(|x| x.to_string())?));
        }
        if matches.opt_present("l") {
            queries.push(QueryType::Groups);
        }
        if queries.len() > 1 {
            return Err("Only one query can be given at a time".to_string());
        }
        let query = queries.pop().unwrap_or(QueryType::Statistics);

        let filename = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        Ok(Config {
            filename,
            query,
        })
    }
}

//-----------------------------------------------------------------------------
