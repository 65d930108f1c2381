use crate::{Group, GroupIdentifier, PersistentStore, Record, StoreParams};

use std::path::Path;

//-----------------------------------------------------------------------------

// Groups.

// Builds a group from (run, sequence) pairs.
pub(crate) fn create_group(name: &str, runs: &[(&str, &str)]) -> Group {
    let id = GroupIdentifier::new(name);
    let records: Vec<Record> = runs.iter().map(|(run, sequence)| Record::from_text(*run, sequence, id.clone())).collect();
    let group = Group::with_records(id, records, true);
    assert!(group.is_ok(), "Failed to create group {}: {}", name, group.unwrap_err());
    group.unwrap()
}

// Runs r1 and r2 share sequence ATGC, while r3 has GGTT.
pub(crate) fn lab_a_records() -> Vec<Record> {
    let id = GroupIdentifier::new("Lab-A");
    vec![
        Record::from_text("r1", "ATGC", id.clone()),
        Record::from_text("r2", "ATGC", id.clone()),
        Record::from_text("r3", "GGTT", id),
    ]
}

pub(crate) fn lab_a_group() -> Group {
    let group = Group::with_records(GroupIdentifier::new("Lab-A"), lab_a_records(), true);
    assert!(group.is_ok(), "Failed to create group Lab-A: {}", group.unwrap_err());
    group.unwrap()
}

//-----------------------------------------------------------------------------

// Stores.

pub(crate) fn open_store(filename: &Path, params: StoreParams) -> PersistentStore {
    let store = PersistentStore::open(filename, params);
    assert!(store.is_ok(), "Failed to open database {}: {}", filename.display(), store.unwrap_err());
    store.unwrap()
}

pub(crate) fn keep_and_commit(store: &mut PersistentStore, group: &Group) {
    let result = store.keep(group);
    assert!(result.is_ok(), "Failed to store group {}: {}", group.identifier(), result.unwrap_err());
    let result = store.commit();
    assert!(result.is_ok(), "Failed to commit group {}: {}", group.identifier(), result.unwrap_err());
}

//-----------------------------------------------------------------------------
