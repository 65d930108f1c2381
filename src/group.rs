//! Records and groups of records.
//!
//! A [`Record`] is a single run: an identifier, the fingerprint of the sequence, the sequence itself if it is available, and the group the run belongs to.
//! A [`Group`] owns all records of a named collection and maintains derived views over them:
//!
//! * [`Group::roster`]: the identifiers of all runs.
//! * [`Group::distinct_sequences`]: one [`SequenceValue`] per distinct sequence.
//! * [`Group::fingerprints`]: the set of fingerprints.
//! * [`Group::signature_group`]: the runs sharing a fingerprint.
//!
//! The views are computed on demand and cached until the next modification.
//!
//! ### Document format
//!
//! ```text
//! {
//!    "_type": "TOAD.Group", "_id": "[TOAD.Group:<group>]", "RDN": "<group>",
//!    "sqrls": { "<run>": ["<fingerprint>", "<sequence>"], "<run>": ["<fingerprint>"], ... },
//!    "Nucleotides": { "<fingerprint>": "<payload as hex>", ... },
//!    "SignatureAndGroupes": { "<fingerprint>": ["<run>", ...], ... }
//! }
//! ```
//!
//! Keys are written in sorted order, so `Nucleotides` comes first.
//! A run with a one-element entry in `sqrls` has no sequence text.
//! An entry with more than two elements is malformed.
//! The last two sections can be excluded with [`DocumentSections`].

use crate::collection::{Collection, Roster, RunCollection, SignatureGroup};
use crate::document::{self, Header, Scribe};
use crate::{Fingerprint, GroupIdentifier, Result, RunIdentifier, SequenceValue, StoreError, StoreKey};

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A single run in a group.
///
/// The sequence text may be absent if the record was rebuilt from an index that only stores the fingerprint.
/// A record without a run identifier is anonymous and cannot be inserted into a [`Group`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    id: Option<RunIdentifier>,
    fingerprint: Fingerprint,
    sequence: Option<String>,
    group: GroupIdentifier,
}

impl Record {
    /// Creates a record with the given sequence text.
    pub fn from_text<I: Into<RunIdentifier>>(id: I, sequence: &str, group: GroupIdentifier) -> Self {
        Record {
            id: Some(id.into()),
            fingerprint: Fingerprint::derive(sequence),
            sequence: Some(sequence.to_string()),
            group,
        }
    }

    /// Creates a record from a sequence value, decompressing it if necessary.
    pub fn from_value<I: Into<RunIdentifier>>(id: I, value: &SequenceValue, group: GroupIdentifier) -> Result<Self> {
        Ok(Record {
            id: Some(id.into()),
            fingerprint: value.fingerprint().clone(),
            sequence: Some(value.sequence()?.to_string()),
            group,
        })
    }

    /// Creates a record without sequence text.
    pub fn from_fingerprint<I: Into<RunIdentifier>>(id: I, fingerprint: Fingerprint, group: GroupIdentifier) -> Self {
        Record {
            id: Some(id.into()),
            fingerprint,
            sequence: None,
            group,
        }
    }

    /// Creates a record without a run identifier.
    pub fn anonymous(sequence: &str, group: GroupIdentifier) -> Self {
        Record {
            id: None,
            fingerprint: Fingerprint::derive(sequence),
            sequence: Some(sequence.to_string()),
            group,
        }
    }

    /// Returns the run identifier, or [`None`] if the record is anonymous.
    pub fn id(&self) -> Option<&RunIdentifier> {
        self.id.as_ref()
    }

    /// Returns the fingerprint of the sequence.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the sequence text, if available.
    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Returns the group the run belongs to.
    pub fn group(&self) -> &GroupIdentifier {
        &self.group
    }

    /// Returns the sequence as a value, if the text is available.
    pub fn sequence_value(&self) -> Option<SequenceValue> {
        self.sequence.as_ref().map(SequenceValue::from_text)
    }

    /// Returns the CURIE of the record, or [`None`] if the record is anonymous.
    pub fn curie(&self) -> Option<String> {
        self.id.as_ref().map(|id| StoreKey::Run(id.clone()).curie())
    }

    // Returns the identifier or an error for anonymous records.
    fn require_id(&self) -> Result<&RunIdentifier> {
        self.id.as_ref().ok_or(StoreError::AnonymousRecord)
    }
}

impl TryFrom<&Record> for RunIdentifier {
    type Error = StoreError;

    fn try_from(record: &Record) -> Result<Self> {
        record.require_id().cloned()
    }
}

//-----------------------------------------------------------------------------

/// Optional sections of a [`GroupDocument`].
///
/// A database stores sequences and signature groups in their own tables, so it excludes them from the group document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentSections {
    /// Include the compressed distinct sequences (`Nucleotides`).
    pub sequences: bool,
    /// Include the fingerprint index (`SignatureAndGroupes`).
    pub signature_groups: bool,
}

impl DocumentSections {
    /// All sections.
    pub const ALL: DocumentSections = DocumentSections { sequences: true, signature_groups: true };

    /// Only the records.
    pub const METADATA: DocumentSections = DocumentSections { sequences: false, signature_groups: false };
}

impl Default for DocumentSections {
    fn default() -> Self {
        Self::ALL
    }
}

/// Canonical document for a [`Group`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDocument {
    #[serde(flatten)]
    pub header: Header,
    pub sqrls: BTreeMap<String, Vec<String>>,
    #[serde(rename = "Nucleotides", default, skip_serializing_if = "Option::is_none")]
    pub sequences: Option<BTreeMap<String, String>>,
    #[serde(rename = "SignatureAndGroupes", default, skip_serializing_if = "Option::is_none")]
    pub signature_groups: Option<BTreeMap<String, Vec<String>>>,
}

//-----------------------------------------------------------------------------

/// A named collection of runs.
///
/// Each run identifier maps to one record, and each record is indexed under the fingerprint of its sequence.
/// Inserting a record with an existing identifier replaces the old record.
/// A group is not thread-safe; use one mutator at a time.
///
/// # Examples
///
/// ```
/// use toad_base::{Fingerprint, Group, GroupIdentifier, Record, RunCollection};
///
/// let lab = GroupIdentifier::new("Lab-A");
/// let mut group = Group::new(lab.clone());
/// group.insert(vec![
///     Record::from_text("r1", "ATGC", lab.clone()),
///     Record::from_text("r2", "ATGC", lab.clone()),
///     Record::from_text("r3", "GGTT", lab.clone()),
/// ], true).unwrap();
///
/// assert_eq!(group.roster().len(), 3);
/// assert_eq!(group.distinct_sequences().len(), 2);
/// assert_eq!(group.signature_group(&Fingerprint::derive("ATGC")).len(), 2);
/// assert!(group.signature_group(&Fingerprint::derive("TTTT")).is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Group {
    id: GroupIdentifier,
    records: HashMap<RunIdentifier, Record>,
    buckets: HashMap<Fingerprint, Collection>,

    // Derived views, cleared by `changed`.
    roster: OnceCell<Roster>,
    sequences: OnceCell<Vec<SequenceValue>>,
    fingerprints: OnceCell<BTreeSet<Fingerprint>>,
}

/// Construction and modification.
impl Group {
    /// Creates an empty group.
    pub fn new(id: GroupIdentifier) -> Self {
        Group {
            id,
            records: HashMap::new(),
            buckets: HashMap::new(),
            roster: OnceCell::new(),
            sequences: OnceCell::new(),
            fingerprints: OnceCell::new(),
        }
    }

    /// Creates a group with the given records; see [`Group::insert`].
    pub fn with_records<I: IntoIterator<Item = Record>>(id: GroupIdentifier, records: I, cross_check: bool) -> Result<Self> {
        let mut group = Group::new(id);
        group.insert(records, cross_check)?;
        Ok(group)
    }

    // Checks a single record before insertion.
    fn validate(&self, record: &Record, cross_check: bool) -> Result<()> {
        let id = record.require_id()?;
        if cross_check && record.group != self.id {
            return Err(StoreError::GroupMismatch {
                run: id.to_string(),
                expected: self.id.to_string(),
                found: record.group.to_string(),
            });
        }
        Ok(())
    }

    // Stores the record and indexes it under its fingerprint.
    // A replaced record is removed from its old signature group first.
    fn place(&mut self, record: Record) -> Result<()> {
        let id = record.require_id()?.clone();
        if let Some(old) = self.records.get(&id) {
            if old.fingerprint != record.fingerprint {
                let old_fingerprint = old.fingerprint.clone();
                if let Some(bucket) = self.buckets.get_mut(&old_fingerprint) {
                    bucket.remove(&id)?;
                    if bucket.is_empty() {
                        self.buckets.remove(&old_fingerprint);
                    }
                }
            }
        }
        self.buckets.entry(record.fingerprint.clone()).or_default().add(id.clone())?;
        self.records.insert(id, record);
        Ok(())
    }

    /// Inserts a batch of records.
    ///
    /// The batch is validated before any record is inserted.
    /// If any record is anonymous, nothing is inserted and the result is [`StoreError::AnonymousRecord`].
    /// If `cross_check` is set and any record belongs to another group, nothing is inserted and the result is [`StoreError::GroupMismatch`].
    ///
    /// Records replace existing records with the same identifier.
    /// Within the batch, the last record with a given identifier wins.
    pub fn insert<I: IntoIterator<Item = Record>>(&mut self, records: I, cross_check: bool) -> Result<()> {
        let records: Vec<Record> = records.into_iter().collect();
        for record in records.iter() {
            self.validate(record, cross_check)?;
        }

        let new_fingerprints: BTreeSet<Fingerprint> = records.iter()
            .map(|record| record.fingerprint.clone())
            .filter(|fingerprint| !self.buckets.contains_key(fingerprint))
            .collect();
        for fingerprint in new_fingerprints {
            self.buckets.insert(fingerprint, Collection::default());
        }

        for record in records {
            self.place(record)?;
        }
        self.changed();
        Ok(())
    }

    /// Inserts a single record; see [`Group::insert`].
    ///
    /// Use [`Group::insert`] for loading many records.
    pub fn insert_one(&mut self, record: Record, cross_check: bool) -> Result<()> {
        self.validate(&record, cross_check)?;
        self.place(record)?;
        self.changed();
        Ok(())
    }

    /// Clears the cached views.
    ///
    /// Called automatically after every modification.
    pub fn changed(&mut self) {
        self.roster.take();
        self.sequences.take();
        self.fingerprints.take();
    }
}

//-----------------------------------------------------------------------------

/// Queries.
impl Group {
    /// Returns the group identifier.
    pub fn identifier(&self) -> &GroupIdentifier {
        &self.id
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the group has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns an iterator over the records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Returns the record for the run, or [`None`] if there is no such record.
    pub fn get(&self, run: &RunIdentifier) -> Option<&Record> {
        self.records.get(run)
    }

    /// Returns `true` if the group contains the run.
    pub fn contains_run(&self, run: &RunIdentifier) -> bool {
        self.records.contains_key(run)
    }

    /// Returns `true` if some record has a sequence with the fingerprint.
    pub fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        self.buckets.contains_key(fingerprint)
    }

    /// Returns the roster of all runs in the group.
    pub fn roster(&self) -> &Roster {
        self.roster.get_or_init(|| {
            let members: Vec<RunIdentifier> = self.records.keys().cloned().collect();
            Roster::new(self.id.clone(), Some(members), true)
        })
    }

    /// Returns the frozen set of all runs in the group.
    pub fn runs(&self) -> &Collection {
        self.roster().collection()
    }

    /// Returns one value for each distinct sequence, ordered by fingerprint.
    ///
    /// Records without sequence text are not included.
    pub fn distinct_sequences(&self) -> &[SequenceValue] {
        self.sequences.get_or_init(|| {
            let mut distinct: BTreeMap<&Fingerprint, SequenceValue> = BTreeMap::new();
            for record in self.records.values() {
                if let Some(sequence) = record.sequence.as_ref() {
                    distinct.entry(&record.fingerprint).or_insert_with(|| SequenceValue::from_text(sequence.as_str()));
                }
            }
            distinct.into_values().collect()
        })
    }

    /// Returns the fingerprints of all records.
    pub fn fingerprints(&self) -> &BTreeSet<Fingerprint> {
        self.fingerprints.get_or_init(|| self.buckets.keys().cloned().collect())
    }

    /// Returns the runs whose sequence has the given fingerprint.
    ///
    /// If there are no such runs, the signature group is empty.
    pub fn signature_group(&self, fingerprint: &Fingerprint) -> SignatureGroup {
        let members = match self.buckets.get(fingerprint) {
            Some(bucket) => bucket.snapshot(),
            None => Collection::frozen(Vec::new()),
        };
        SignatureGroup::from_collection(fingerprint.clone(), self.id.clone(), members)
    }

    /// Returns all non-empty signature groups, ordered by fingerprint.
    pub fn signature_groups(&self) -> Vec<SignatureGroup> {
        self.fingerprints().iter().map(|fingerprint| self.signature_group(fingerprint)).collect()
    }
}

impl From<&Group> for GroupIdentifier {
    fn from(group: &Group) -> Self {
        group.id.clone()
    }
}

//-----------------------------------------------------------------------------

/// Serialization.
impl Group {
    /// Returns the document for the group with the given sections.
    pub fn to_document_with(&self, sections: DocumentSections) -> Result<GroupDocument> {
        let mut sqrls: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, record) in self.records.iter() {
            let mut packet = vec![record.fingerprint.to_string()];
            if let Some(sequence) = record.sequence.as_ref() {
                packet.push(sequence.clone());
            }
            sqrls.insert(id.to_string(), packet);
        }

        let sequences = if sections.sequences {
            let mut section = BTreeMap::new();
            for value in self.distinct_sequences() {
                section.insert(value.fingerprint().to_string(), hex::encode(value.payload()?));
            }
            Some(section)
        } else {
            None
        };

        let signature_groups = if sections.signature_groups {
            let section = self.signature_groups().iter()
                .map(|group| (group.fingerprint().to_string(), group.member_names()))
                .collect();
            Some(section)
        } else {
            None
        };

        Ok(GroupDocument {
            header: Header::new(Self::TYPE_TAG, &self.rdn()),
            sqrls,
            sequences,
            signature_groups,
        })
    }

    /// Returns the group as JSON with the given sections.
    pub fn to_json_with(&self, sections: DocumentSections) -> Result<String> {
        document::to_json_string(&self.to_document_with(sections)?)
    }

    /// Writes the full group document to the file.
    pub fn save_as<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let document = self.to_document()?;
        let mut writer = BufWriter::new(File::create(filename)?);
        document::write_json(&document, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a group from a file written with [`Group::save_as`].
    pub fn load_from<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = BufReader::new(File::open(filename)?);
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }
}

impl Scribe for Group {
    const TYPE_TAG: &'static str = StoreKey::GROUP_TAG;

    type Document = GroupDocument;

    fn rdn(&self) -> String {
        self.id.to_string()
    }

    fn to_document(&self) -> Result<Self::Document> {
        self.to_document_with(DocumentSections::ALL)
    }

    // The fingerprint index is rebuilt from the records, so the optional sections are not needed.
    fn from_document(document: Self::Document) -> Result<Self> {
        let id = GroupIdentifier::from(document.header.rdn);
        let mut records: Vec<Record> = Vec::with_capacity(document.sqrls.len());
        for (run, packet) in document.sqrls {
            let record = match packet.as_slice() {
                [fingerprint] => Record::from_fingerprint(run, Fingerprint::from_literal(fingerprint.as_str()), id.clone()),
                [fingerprint, sequence] => {
                    let record = Record::from_text(run, sequence, id.clone());
                    if record.fingerprint.as_str() != fingerprint {
                        return Err(StoreError::MalformedDocument(
                            format!("Fingerprint {} does not match the sequence of run {}", fingerprint, record.require_id()?)
                        ));
                    }
                    record
                },
                [] => return Err(StoreError::MalformedDocument(format!("Empty entry for run {}", run))),
                _ => return Err(StoreError::MalformedDocument(
                    format!("Entry for run {} has {} elements; expected fingerprint and optional sequence", run, packet.len())
                )),
            };
            records.push(record);
        }
        Group::with_records(id, records, true)
    }
}

//-----------------------------------------------------------------------------
