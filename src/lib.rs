//! # TOAD-base: deduplicated storage for groups of sequenced runs.
//!
//! This crate stores named groups of sequenced runs in a SQLite database.
//! Each run has a biological sequence, and runs with identical sequences are common both within and across groups.
//! Every distinct sequence is therefore stored only once, keyed by a content-derived [`Fingerprint`].
//!
//! See [`Group`] for the in-memory model and [`PersistentStore`] for the database interface.
//! See [`formats`] for reading runs from FASTA and FASTQ files.
//!
//! ### Basic concepts
//!
//! A [`Fingerprint`] is a 20-character string derived from a SHAKE128 digest of the sequence.
//! Equal sequences always have equal fingerprints.
//! A [`SequenceValue`] holds a sequence as text, as a compressed payload, or both, and converts between the two lazily.
//!
//! A [`Record`] is a single run: a [`RunIdentifier`], a fingerprint, an optional sequence, and the [`GroupIdentifier`] of the owning group.
//! A [`Group`] owns records and maintains derived views over them: the [`Roster`] of all runs, the distinct sequences, and a [`SignatureGroup`] for each fingerprint listing the runs that share it.
//! Derived views are computed when needed and invalidated when records change.
//!
//! Each object has a CURIE-like key `[<type tag>:<identifier>]`; see [`StoreKey`].
//! Groups, rosters, and signature groups can be serialized as JSON documents; see [`Scribe`].
//!
//! ### Database
//!
//! Each distinct sequence corresponds to a row in table `sequences`, with the fingerprint as its primary key and the compressed payload as its value.
//! Each group corresponds to a row in table `groups`, with the group document as its value.
//! Table `group_index` maps fingerprints to the groups containing them, and table `runs` maps run identifiers to groups.
//!
//! When a group is stored, its sequences are first compared against the existing sequences one page at a time, so that memory usage stays bounded for large databases.
//! Writes are explicit: nothing is committed until [`PersistentStore::commit`] is called.
//!
//! # Examples
//!
//! ```
//! use toad_base::{Group, GroupIdentifier, Record, RunCollection, Fingerprint};
//!
//! let lab = GroupIdentifier::new("Lab-A");
//! let mut group = Group::new(lab.clone());
//! group.insert(vec![
//!     Record::from_text("r1", "ATGC", lab.clone()),
//!     Record::from_text("r2", "ATGC", lab.clone()),
//!     Record::from_text("r3", "GGTT", lab.clone()),
//! ], true).unwrap();
//!
//! assert_eq!(group.roster().len(), 3);
//! assert_eq!(group.distinct_sequences().len(), 2);
//! assert_eq!(group.signature_group(&Fingerprint::derive("ATGC")).member_names(), vec!["r1", "r2"]);
//! ```

pub mod collection;
pub mod db;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod formats;
pub mod group;
pub mod identifiers;
pub mod sequence;
pub mod utils;

#[cfg(test)]
pub(crate) mod internal;

pub use collection::{Collection, Roster, RunCollection, SignatureGroup};
pub use db::{PersistentStore, StoreParams, StoredObject};
pub use document::Scribe;
pub use error::{Result, StoreError};
pub use fingerprint::Fingerprint;
pub use group::{DocumentSections, Group, GroupDocument, Record};
pub use identifiers::{GroupIdentifier, RunIdentifier, StoreKey};
pub use sequence::SequenceValue;
