//! TOAD-base: a SQLite database storing deduplicated sequences and the groups that contain them.

use crate::collection::SignatureGroup;
use crate::document::Scribe;
use crate::group::DocumentSections;
use crate::{utils, Fingerprint, Group, GroupIdentifier, Record, Result, RunIdentifier, SequenceValue, StoreError, StoreKey};

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};


//-----------------------------------------------------------------------------

/// Parameters for a [`PersistentStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreParams {
    /// Number of fingerprints per page when scanning the sequence table for duplicates.
    pub page_size: usize,
}

impl StoreParams {
    /// Default page size for duplicate scans.
    pub const PAGE_SIZE: usize = 1_000_000;

    /// Largest page size SQLite can bind as a `LIMIT`.
    pub const MAX_PAGE_SIZE: usize = i64::MAX as usize;

    /// Checks that the parameters are usable.
    ///
    /// Returns [`StoreError::InvalidParameter`] if the page size is 0 or larger than [`Self::MAX_PAGE_SIZE`].
    pub fn validate(&self) -> Result<()> {
        check_page_size(self.page_size)
    }
}

fn check_page_size(page_size: usize) -> Result<()> {
    if page_size == 0 || page_size > StoreParams::MAX_PAGE_SIZE {
        return Err(StoreError::InvalidParameter(
            format!("Page size must be between 1 and {}, got {}", StoreParams::MAX_PAGE_SIZE, page_size)
        ));
    }
    Ok(())
}

impl Default for StoreParams {
    fn default() -> Self {
        StoreParams {
            page_size: Self::PAGE_SIZE,
        }
    }
}

/// An object returned by [`PersistentStore::lookup_by_kind`].
#[derive(Clone, Debug)]
pub enum StoredObject {
    /// A run and its group.
    Record(Record),
    /// A group.
    Group(Group),
    /// A sequence.
    Sequence(SequenceValue),
}

//-----------------------------------------------------------------------------

/// A connection to a TOAD-base database.
///
/// The database contains the following tables:
///
/// * `Tags`: key-value pairs, including the database version.
/// * `sequences`: compressed payload for each distinct sequence, keyed by fingerprint.
/// * `groups`: the document of each group without the sequence and signature group sections.
/// * `group_index`: one row per (fingerprint, group) pair with the signature group document.
/// * `runs`: one row per (run, group) pair with the fingerprint of the run.
///
/// Opening the store creates any missing tables.
/// Writes are not committed automatically: the first write opens a transaction, which stays open until [`PersistentStore::commit`] or [`PersistentStore::rollback`].
/// Dropping or closing the store rolls back uncommitted writes.
/// Concurrent writers must be serialized by the caller.
///
/// # Examples
///
/// ```
/// use toad_base::{Fingerprint, Group, GroupIdentifier, PersistentStore, Record, StoreParams};
///
/// let lab = GroupIdentifier::new("Lab-A");
/// let group = Group::with_records(lab.clone(), vec![
///     Record::from_text("r1", "ATGC", lab.clone()),
///     Record::from_text("r2", "ATGC", lab.clone()),
///     Record::from_text("r3", "GGTT", lab.clone()),
/// ], true).unwrap();
///
/// let mut store = PersistentStore::open_in_memory(StoreParams::default()).unwrap();
/// store.keep(&group).unwrap();
/// store.commit().unwrap();
///
/// assert_eq!(store.sequence_count().unwrap(), 2);
/// assert_eq!(store.carriers(&Fingerprint::derive("ATGC")).unwrap(), vec![lab.clone()]);
/// let restored = store.group(&lab).unwrap();
/// assert_eq!(restored.roster(), group.roster());
///
/// store.close().unwrap();
/// ```
#[derive(Debug)]
pub struct PersistentStore {
    connection: Connection,
    params: StoreParams,
    version: String,
}

/// Opening and closing the database.
impl PersistentStore {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "TOAD-base v0.1.0";

    /// Opens or creates the database in the given file.
    ///
    /// Creates any missing tables.
    /// Returns an error if the parameters are invalid or the database was created by another version.
    /// Passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P, params: StoreParams) -> Result<Self> {
        params.validate()?;
        log::info!("Opening database {}", filename.as_ref().display());
        let connection = Connection::open(filename)?;
        Self::with_connection(connection, params)
    }

    /// Creates a temporary database in memory.
    pub fn open_in_memory(params: StoreParams) -> Result<Self> {
        params.validate()?;
        let connection = Connection::open_in_memory()?;
        Self::with_connection(connection, params)
    }

    fn with_connection(connection: Connection, params: StoreParams) -> Result<Self> {
        Self::provision(&connection)?;
        let version: String = connection.query_row(
            "SELECT value FROM Tags WHERE key = ?1",
            (Self::KEY_VERSION,),
            |row| row.get(0)
        )?;
        if version != Self::VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: version,
                expected: Self::VERSION.to_string(),
            });
        }
        Ok(PersistentStore { connection, params, version })
    }

    // Creates the tables and indexes if they do not exist.
    fn provision(connection: &Connection) -> rusqlite::Result<()> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT;
            CREATE TABLE IF NOT EXISTS sequences (
                fingerprint TEXT PRIMARY KEY,
                payload BLOB NOT NULL
            ) STRICT;
            CREATE TABLE IF NOT EXISTS groups (
                group_id TEXT PRIMARY KEY,
                document BLOB NOT NULL
            ) STRICT;
            CREATE TABLE IF NOT EXISTS group_index (
                fingerprint TEXT NOT NULL,
                group_id TEXT NOT NULL,
                members BLOB NOT NULL
            ) STRICT;
            CREATE INDEX IF NOT EXISTS group_index_fingerprints ON group_index(fingerprint);
            CREATE INDEX IF NOT EXISTS group_index_groups ON group_index(group_id);
            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                fingerprint TEXT NOT NULL
            ) STRICT;
            CREATE INDEX IF NOT EXISTS runs_runs ON runs(run_id);
            CREATE INDEX IF NOT EXISTS runs_groups ON runs(group_id);"
        )?;
        connection.execute(
            "INSERT OR IGNORE INTO Tags(key, value) VALUES (?1, ?2)",
            (Self::KEY_VERSION, Self::VERSION),
        )?;
        Ok(())
    }

    /// Closes the connection.
    ///
    /// Uncommitted writes are rolled back.
    pub fn close(self) -> Result<()> {
        if self.has_pending_writes() {
            log::info!("Closing database with uncommitted writes");
        }
        self.connection.close().map_err(|(_, err)| StoreError::from(err))
    }

    /// Returns the filename of the database, or [`None`] for an in-memory database.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path().filter(|path| !path.is_empty())
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the parameters.
    pub fn params(&self) -> &StoreParams {
        &self.params
    }
}

//-----------------------------------------------------------------------------

/// Transactions.
impl PersistentStore {
    /// Returns `true` if there are uncommitted writes.
    pub fn has_pending_writes(&self) -> bool {
        !self.connection.is_autocommit()
    }

    /// Commits all writes since the last commit.
    pub fn commit(&mut self) -> Result<()> {
        if self.has_pending_writes() {
            self.connection.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Discards all writes since the last commit.
    pub fn rollback(&mut self) -> Result<()> {
        if self.has_pending_writes() {
            self.connection.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // Starts a transaction unless one is already open.
    fn begin(&mut self) -> Result<()> {
        if !self.has_pending_writes() {
            self.connection.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Writing sequences and groups.
impl PersistentStore {
    /// Returns a page of fingerprints from the sequence table, ordered by fingerprint.
    ///
    /// Page numbers start from 0.
    /// A page beyond the end of the table is empty.
    /// Returns [`StoreError::InvalidParameter`] if the page size is 0 or larger than [`StoreParams::MAX_PAGE_SIZE`].
    pub fn page_fingerprints(&self, page: usize, page_size: usize) -> Result<Vec<Fingerprint>> {
        check_page_size(page_size)?;
        let mut statement = self.connection.prepare_cached(
            "SELECT fingerprint FROM sequences ORDER BY fingerprint LIMIT ?1 OFFSET ?2"
        )?;
        let offset = page.saturating_mul(page_size).min(StoreParams::MAX_PAGE_SIZE);
        let mut result = Vec::new();
        let mut rows = statement.query((page_size, offset))?;
        while let Some(row) = rows.next()? {
            let fingerprint: String = row.get(0)?;
            result.push(Fingerprint::from_literal(fingerprint));
        }
        Ok(result)
    }

    /// Adds the sequences that are not already in the sequence table.
    ///
    /// The existing table is scanned one page at a time (see [`StoreParams::page_size`]), removing already stored sequences from the candidates after each page.
    /// Memory usage is bounded by the page size instead of the table size.
    /// The remaining candidates are then inserted, ignoring any duplicates.
    ///
    /// Returns the number of inserted sequences.
    /// Passes through any database errors.
    pub fn extend(&mut self, values: &[SequenceValue]) -> Result<usize> {
        let mut candidates: Vec<&SequenceValue> = values.iter().collect();
        let mut page_number = 0;
        while !candidates.is_empty() {
            let page: HashSet<Fingerprint> = self.page_fingerprints(page_number, self.params.page_size)?.into_iter().collect();
            if page.is_empty() {
                break;
            }
            candidates.retain(|value| !page.contains(value.fingerprint()));
            log::debug!("Page {}: {} candidate sequences remaining", page_number, candidates.len());
            page_number += 1;
        }

        self.begin()?;
        let mut inserted = 0;
        {
            let mut insert = self.connection.prepare_cached(
                "INSERT OR IGNORE INTO sequences(fingerprint, payload) VALUES (?1, ?2)"
            )?;
            for value in candidates {
                inserted += insert.execute((value.fingerprint().as_str(), value.payload()?))?;
            }
        }

        log::debug!("Inserted {} of {} sequences", inserted, values.len());
        Ok(inserted)
    }

    /// Stores the group.
    ///
    /// Adds the distinct sequences of the group using [`PersistentStore::extend`], replaces the group document, and rebuilds the index rows for the group.
    /// Nothing is committed.
    /// Passes through any database errors.
    pub fn keep(&mut self, group: &Group) -> Result<()> {
        let inserted = self.extend(group.distinct_sequences())?;

        let group_id = group.identifier().as_str();
        let document = group.to_json_with(DocumentSections::METADATA)?;
        self.connection.execute(
            "INSERT OR REPLACE INTO groups(group_id, document) VALUES (?1, ?2)",
            (group_id, document.as_bytes()),
        )?;

        self.connection.execute("DELETE FROM group_index WHERE group_id = ?1", (group_id,))?;
        let signature_groups = group.signature_groups();
        {
            let mut insert = self.connection.prepare_cached(
                "INSERT INTO group_index(fingerprint, group_id, members) VALUES (?1, ?2, ?3)"
            )?;
            for signature_group in signature_groups.iter() {
                let members = signature_group.to_json()?;
                insert.execute((signature_group.fingerprint().as_str(), group_id, members.as_bytes()))?;
            }
        }

        self.connection.execute("DELETE FROM runs WHERE group_id = ?1", (group_id,))?;
        {
            let mut insert = self.connection.prepare_cached(
                "INSERT INTO runs(run_id, group_id, fingerprint) VALUES (?1, ?2, ?3)"
            )?;
            for record in group.iter() {
                let run_id = record.id().ok_or(StoreError::AnonymousRecord)?;
                insert.execute((run_id.as_str(), group_id, record.fingerprint().as_str()))?;
            }
        }

        log::info!(
            "Stored group {}: {} runs, {} new sequences, {} signature groups",
            group_id, group.len(), inserted, signature_groups.len()
        );
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Queries.
impl PersistentStore {
    /// Returns the number of distinct sequences.
    pub fn sequence_count(&self) -> Result<usize> {
        let count = self.connection.query_row("SELECT COUNT(*) FROM sequences", (), |row| row.get(0))?;
        Ok(count)
    }

    /// Returns the number of groups.
    pub fn group_count(&self) -> Result<usize> {
        let count = self.connection.query_row("SELECT COUNT(*) FROM groups", (), |row| row.get(0))?;
        Ok(count)
    }

    /// Returns the identifiers of all groups in sorted order.
    pub fn group_identifiers(&self) -> Result<Vec<GroupIdentifier>> {
        let mut statement = self.connection.prepare_cached("SELECT group_id FROM groups ORDER BY group_id")?;
        let mut result = Vec::new();
        let mut rows = statement.query(())?;
        while let Some(row) = rows.next()? {
            let group_id: String = row.get(0)?;
            result.push(GroupIdentifier::from(group_id));
        }
        Ok(result)
    }

    /// Returns the groups that contain a sequence with the fingerprint, in sorted order.
    pub fn carriers(&self, fingerprint: &Fingerprint) -> Result<Vec<GroupIdentifier>> {
        let mut statement = self.connection.prepare_cached(
            "SELECT DISTINCT group_id FROM group_index WHERE fingerprint = ?1 ORDER BY group_id"
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query((fingerprint.as_str(),))?;
        while let Some(row) = rows.next()? {
            let group_id: String = row.get(0)?;
            result.push(GroupIdentifier::from(group_id));
        }
        Ok(result)
    }

    /// Returns the sequence with the fingerprint.
    ///
    /// Returns [`StoreError::NotFound`] if there is no such sequence.
    pub fn sequence(&self, fingerprint: &Fingerprint) -> Result<SequenceValue> {
        let payload: Option<Vec<u8>> = self.connection.query_row(
            "SELECT payload FROM sequences WHERE fingerprint = ?1",
            (fingerprint.as_str(),),
            |row| row.get(0)
        ).optional()?;
        let payload = payload.ok_or_else(|| not_found(StoreKey::Fingerprint(fingerprint.clone())))?;
        SequenceValue::from_payload(fingerprint.clone(), payload)
    }

    /// Reconstructs the group.
    ///
    /// Returns [`StoreError::NotFound`] if there is no such group.
    pub fn group(&self, group_id: &GroupIdentifier) -> Result<Group> {
        let document: Option<Vec<u8>> = self.connection.query_row(
            "SELECT document FROM groups WHERE group_id = ?1",
            (group_id.as_str(),),
            |row| row.get(0)
        ).optional()?;
        let document = document.ok_or_else(|| not_found(StoreKey::Group(group_id.clone())))?;
        Group::from_json(&document_text(document)?)
    }

    /// Returns the record for the run.
    ///
    /// If the run identifier is used in several groups, the record comes from the first group in sorted order.
    /// Returns [`StoreError::NotFound`] if there is no such run.
    pub fn record(&self, run: &RunIdentifier) -> Result<Record> {
        let group_id: Option<String> = self.connection.query_row(
            "SELECT group_id FROM runs WHERE run_id = ?1 ORDER BY group_id LIMIT 1",
            (run.as_str(),),
            |row| row.get(0)
        ).optional()?;
        let group_id = group_id.ok_or_else(|| not_found(StoreKey::Run(run.clone())))?;
        let group = self.group(&GroupIdentifier::from(group_id))?;
        group.get(run).cloned().ok_or_else(|| not_found(StoreKey::Run(run.clone())))
    }

    /// Returns the stored signature group for the fingerprint in the group.
    ///
    /// If the group does not contain the fingerprint, the signature group is empty.
    pub fn signature_group(&self, fingerprint: &Fingerprint, group_id: &GroupIdentifier) -> Result<SignatureGroup> {
        let members: Option<Vec<u8>> = self.connection.query_row(
            "SELECT members FROM group_index WHERE fingerprint = ?1 AND group_id = ?2 LIMIT 1",
            (fingerprint.as_str(), group_id.as_str()),
            |row| row.get(0)
        ).optional()?;
        match members {
            Some(members) => SignatureGroup::from_json(&document_text(members)?),
            None => Ok(SignatureGroup::empty(fingerprint.clone(), group_id.clone())),
        }
    }

    /// Returns the stored signature groups for the fingerprint in all groups, ordered by group.
    pub fn signature_groups(&self, fingerprint: &Fingerprint) -> Result<Vec<SignatureGroup>> {
        let mut statement = self.connection.prepare_cached(
            "SELECT members FROM group_index WHERE fingerprint = ?1 ORDER BY group_id"
        )?;
        let mut result = Vec::new();
        let mut rows = statement.query((fingerprint.as_str(),))?;
        while let Some(row) = rows.next()? {
            let members: Vec<u8> = row.get(0)?;
            result.push(SignatureGroup::from_json(&document_text(members)?)?);
        }
        Ok(result)
    }

    /// Returns `true` if the database contains an object with the key.
    pub fn contains(&self, key: &StoreKey) -> Result<bool> {
        let (query, id) = match key {
            StoreKey::Run(id) => ("SELECT EXISTS(SELECT 1 FROM runs WHERE run_id = ?1)", id.as_str()),
            StoreKey::Group(id) => ("SELECT EXISTS(SELECT 1 FROM groups WHERE group_id = ?1)", id.as_str()),
            StoreKey::Fingerprint(fingerprint) => ("SELECT EXISTS(SELECT 1 FROM sequences WHERE fingerprint = ?1)", fingerprint.as_str()),
        };
        let found: bool = self.connection.query_row(query, (id,), |row| row.get(0))?;
        Ok(found)
    }

    /// Returns the object with the key.
    ///
    /// Returns [`StoreError::NotFound`] if there is no such object.
    pub fn lookup_by_kind(&self, key: &StoreKey) -> Result<StoredObject> {
        match key {
            StoreKey::Run(id) => self.record(id).map(StoredObject::Record),
            StoreKey::Group(id) => self.group(id).map(StoredObject::Group),
            StoreKey::Fingerprint(fingerprint) => self.sequence(fingerprint).map(StoredObject::Sequence),
        }
    }

    /// Returns the object with the key in CURIE form; see [`StoreKey::from_curie`].
    ///
    /// Returns [`StoreError::InvalidKey`] if the key does not identify a kind of stored object.
    pub fn lookup_curie(&self, curie: &str) -> Result<StoredObject> {
        let key = StoreKey::from_curie(curie)?;
        self.lookup_by_kind(&key)
    }
}

//-----------------------------------------------------------------------------

// Helper functions.

fn not_found(key: StoreKey) -> StoreError {
    StoreError::NotFound(key.curie())
}

fn document_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|x| StoreError::MalformedDocument(x.to_string()))
}

/// Type of a potential database file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseFileType {
    /// The file does not exist.
    Missing,
    /// The file is not a valid SQLite database.
    NotDatabase,
    /// The file is an unknown SQLite database.
    UnknownDatabase,
    /// The file is a known SQLite database with the given version string.
    Version(String),
}

/// Determines the type of the given file, which may be a SQLite database.
///
/// The file is opened read-only and never modified.
pub fn identify_database<P: AsRef<Path>>(filename: P) -> DatabaseFileType {
    let Ok(metadata) = fs::metadata(&filename) else {
        return DatabaseFileType::Missing;
    };
    if !metadata.is_file() {
        return DatabaseFileType::NotDatabase;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let Ok(connection) = Connection::open_with_flags(filename, flags) else {
        return DatabaseFileType::NotDatabase;
    };

    // SQLite opens any file lazily, so a non-database is only detected on the first query.
    let is_database = connection.query_row("SELECT COUNT(*) FROM sqlite_master", (), |row| row.get::<_, i64>(0));
    if is_database.is_err() {
        return DatabaseFileType::NotDatabase;
    }

    let version: rusqlite::Result<String> = connection.query_row(
        "SELECT value FROM Tags WHERE key = ?1",
        (PersistentStore::KEY_VERSION,),
        |row| row.get(0)
    );
    match version {
        Ok(version) => DatabaseFileType::Version(version),
        Err(_) => DatabaseFileType::UnknownDatabase,
    }
}

//-----------------------------------------------------------------------------
