use super::*;

use crate::internal;

use std::collections::BTreeSet;

//-----------------------------------------------------------------------------

fn lab(name: &str) -> GroupIdentifier {
    GroupIdentifier::new(name)
}

fn run_set(names: &[&str]) -> BTreeSet<RunIdentifier> {
    names.iter().map(|name| RunIdentifier::new(*name)).collect()
}

fn members<C: RunCollection>(collection: &C) -> BTreeSet<RunIdentifier> {
    collection.iter().cloned().collect()
}

fn insert_records(group: &mut Group, records: Vec<Record>) {
    let result = group.insert(records, true);
    assert!(result.is_ok(), "Failed to insert records: {}", result.unwrap_err());
}

// Checks that the derived views are consistent with the records.
fn check_consistency(group: &Group) {
    let roster = members(group.roster());
    let truth: BTreeSet<RunIdentifier> = group.iter().map(|record| record.id().unwrap().clone()).collect();
    assert_eq!(roster, truth, "Roster does not match the records");

    let mut indexed = 0;
    for fingerprint in group.fingerprints() {
        let signature_group = group.signature_group(fingerprint);
        assert!(!signature_group.is_empty(), "Empty signature group for {}", fingerprint);
        for run in signature_group.iter() {
            let record = group.get(run);
            assert!(record.is_some(), "Signature group {} contains missing run {}", fingerprint, run);
            assert_eq!(record.unwrap().fingerprint(), fingerprint, "Run {} is in the wrong signature group", run);
        }
        indexed += signature_group.len();
    }
    assert_eq!(indexed, group.len(), "Every record should be in exactly one signature group");
}

//-----------------------------------------------------------------------------

// Tests for building a group.

#[test]
fn lab_scenario() {
    let group = internal::lab_a_group();
    assert_eq!(members(group.roster()), run_set(&["r1", "r2", "r3"]), "Wrong roster");
    assert_eq!(group.distinct_sequences().len(), 2, "Wrong number of distinct sequences");

    let atgc = group.signature_group(&Fingerprint::derive("ATGC"));
    assert_eq!(members(&atgc), run_set(&["r1", "r2"]), "Wrong signature group for ATGC");
    assert_eq!(atgc.group(), &lab("Lab-A"), "Wrong group for the signature group");
    let ggtt = group.signature_group(&Fingerprint::derive("GGTT"));
    assert_eq!(members(&ggtt), run_set(&["r3"]), "Wrong signature group for GGTT");
    let tttt = group.signature_group(&Fingerprint::derive("TTTT"));
    assert!(tttt.is_empty(), "Signature group for a missing fingerprint should be empty");
    assert_eq!(tttt.group(), &lab("Lab-A"), "Empty signature group should be scoped to the group");

    check_consistency(&group);
}

#[test]
fn anonymous_record() {
    let mut group = Group::new(lab("Lab-A"));
    let records = vec![
        Record::from_text("r1", "ATGC", lab("Lab-A")),
        Record::anonymous("GGTT", lab("Lab-A")),
    ];
    let result = group.insert(records, true);
    assert!(matches!(result, Err(StoreError::AnonymousRecord)), "Accepted an anonymous record");
    assert!(group.is_empty(), "A rejected batch should not insert anything");

    let result = group.insert_one(Record::anonymous("GGTT", lab("Lab-A")), false);
    assert!(matches!(result, Err(StoreError::AnonymousRecord)), "Accepted an anonymous record with insert_one");

    let id = RunIdentifier::try_from(&Record::from_text("r1", "ATGC", lab("Lab-A")));
    assert_eq!(id.ok(), Some(RunIdentifier::new("r1")), "Wrong identifier from a record");
    let id = RunIdentifier::try_from(&Record::anonymous("GGTT", lab("Lab-A")));
    assert!(matches!(id, Err(StoreError::AnonymousRecord)), "Got an identifier from an anonymous record");
}

#[test]
fn cross_check_rejects_batch() {
    let mut group = Group::new(lab("Lab-A"));
    let records = vec![
        Record::from_text("r1", "ATGC", lab("Lab-A")),
        Record::from_text("r2", "ATGC", lab("Lab-B")),
        Record::from_text("r3", "GGTT", lab("Lab-A")),
    ];
    let result = group.insert(records.clone(), true);
    assert!(matches!(result, Err(StoreError::GroupMismatch { .. })), "Accepted a record from another group");
    assert!(group.is_empty(), "A rejected batch should not insert anything");
    assert!(group.fingerprints().is_empty(), "A rejected batch should not create signature groups");

    let result = group.insert(records, false);
    assert!(result.is_ok(), "Failed to insert without cross check: {}", result.unwrap_err());
    assert_eq!(group.len(), 3, "Wrong number of records without cross check");
}

#[test]
fn cross_check_single_record() {
    let mut group = Group::new(lab("Lab-A"));
    let result = group.insert_one(Record::from_text("r1", "ATGC", lab("Lab-B")), true);
    assert!(matches!(result, Err(StoreError::GroupMismatch { .. })), "Accepted a record from another group");
    let result = group.insert_one(Record::from_text("r1", "ATGC", lab(" Lab-A ")), true);
    assert!(result.is_ok(), "Group names should be compared after trimming: {}", result.unwrap_err());
}

#[test]
fn insert_one_matches_insert() {
    let batch = internal::lab_a_group();
    let mut single = Group::new(lab("Lab-A"));
    for record in internal::lab_a_records() {
        let result = single.insert_one(record, true);
        assert!(result.is_ok(), "Failed to insert a record: {}", result.unwrap_err());
    }
    assert_eq!(single.roster(), batch.roster(), "Different rosters");
    assert_eq!(single.signature_groups(), batch.signature_groups(), "Different signature groups");
    check_consistency(&single);
}

#[test]
fn last_write_wins() {
    let mut group = internal::lab_a_group();
    let _ = group.roster();
    assert_eq!(group.distinct_sequences().len(), 2, "Wrong initial number of distinct sequences");

    // Replace r3 with a new sequence; GGTT is no longer present.
    insert_records(&mut group, vec![Record::from_text("r3", "CCCC", lab("Lab-A"))]);
    assert_eq!(group.len(), 3, "Replacing a record should not change the size");
    assert_eq!(group.get(&RunIdentifier::new("r3")).unwrap().sequence(), Some("CCCC"), "The record was not replaced");
    assert!(!group.contains_fingerprint(&Fingerprint::derive("GGTT")), "Stale signature group for GGTT");
    assert!(group.signature_group(&Fingerprint::derive("GGTT")).is_empty(), "Stale members for GGTT");
    let sequences: BTreeSet<String> = group.distinct_sequences().iter()
        .map(|value| value.sequence().unwrap().to_string())
        .collect();
    let truth: BTreeSet<String> = ["ATGC", "CCCC"].iter().map(|x| x.to_string()).collect();
    assert_eq!(sequences, truth, "Distinct sequences were not recomputed");

    // Within a batch, the last record wins.
    insert_records(&mut group, vec![
        Record::from_text("r4", "AAAA", lab("Lab-A")),
        Record::from_text("r4", "ATGC", lab("Lab-A")),
    ]);
    assert_eq!(group.get(&RunIdentifier::new("r4")).unwrap().sequence(), Some("ATGC"), "Wrong record for r4");
    assert!(!group.contains_fingerprint(&Fingerprint::derive("AAAA")), "Stale signature group for AAAA");
    let atgc = group.signature_group(&Fingerprint::derive("ATGC"));
    assert_eq!(members(&atgc), run_set(&["r1", "r2", "r4"]), "Wrong signature group for ATGC");
    check_consistency(&group);
}

#[test]
fn views_are_invalidated() {
    let mut group = internal::lab_a_group();
    assert_eq!(group.roster().len(), 3, "Wrong initial roster");
    assert_eq!(group.fingerprints().len(), 2, "Wrong initial fingerprints");

    let result = group.insert_one(Record::from_text("r5", "TTTT", lab("Lab-A")), true);
    assert!(result.is_ok(), "Failed to insert a record: {}", result.unwrap_err());
    assert_eq!(group.roster().len(), 4, "Roster was not invalidated");
    assert_eq!(group.fingerprints().len(), 3, "Fingerprints were not invalidated");
    assert_eq!(group.distinct_sequences().len(), 3, "Distinct sequences were not invalidated");
    assert!(group.runs().is_frozen(), "The set of runs should be frozen");
    assert!(group.runs().contains(&RunIdentifier::new("r5")), "The set of runs was not invalidated");
}

#[test]
fn fingerprint_only_records() {
    let mut group = Group::new(lab("Lab-A"));
    insert_records(&mut group, vec![
        Record::from_text("r1", "ATGC", lab("Lab-A")),
        Record::from_fingerprint("r2", Fingerprint::derive("GGTT"), lab("Lab-A")),
    ]);
    assert_eq!(group.fingerprints().len(), 2, "Wrong number of fingerprints");
    let sequences = group.distinct_sequences();
    assert_eq!(sequences.len(), 1, "Records without text should not have distinct sequences");
    assert_eq!(sequences[0].fingerprint(), &Fingerprint::derive("ATGC"), "Wrong distinct sequence");
    check_consistency(&group);
}

//-----------------------------------------------------------------------------

// Tests for documents.

#[test]
fn document_round_trip() {
    let mut group = internal::lab_a_group();
    insert_records(&mut group, vec![Record::from_fingerprint("r4", Fingerprint::derive("TTTT"), lab("Lab-A"))]);

    let json = group.to_json();
    assert!(json.is_ok(), "Failed to serialize the group: {}", json.unwrap_err());
    let restored = Group::from_json(&json.unwrap());
    assert!(restored.is_ok(), "Failed to parse the group: {}", restored.unwrap_err());
    let restored = restored.unwrap();

    assert_eq!(restored.identifier(), group.identifier(), "Wrong group identifier");
    assert_eq!(restored.roster(), group.roster(), "Wrong roster");
    assert_eq!(restored.signature_groups(), group.signature_groups(), "Wrong signature groups");
    for record in group.iter() {
        let id = record.id().unwrap();
        let other = restored.get(id);
        assert!(other.is_some(), "Missing run {}", id);
        assert_eq!(other.unwrap(), record, "Wrong record for run {}", id);
    }
}

#[test]
fn document_sections() {
    let group = internal::lab_a_group();
    let full = group.to_document().unwrap();
    assert_eq!(full.header.id, "[TOAD.Group:Lab-A]", "Wrong document id");
    assert_eq!(full.sqrls.len(), 3, "Wrong number of runs");
    assert_eq!(full.sqrls["r1"], vec![Fingerprint::derive("ATGC").to_string(), String::from("ATGC")], "Wrong entry for r1");

    let sequences = full.sequences.as_ref().unwrap();
    assert_eq!(sequences.len(), 2, "Wrong number of sequences");
    let payload = hex::decode(&sequences[Fingerprint::derive("GGTT").as_str()]).unwrap();
    let value = SequenceValue::from_payload(Fingerprint::derive("GGTT"), payload).unwrap();
    assert_eq!(value.sequence().unwrap(), "GGTT", "Wrong stored payload");

    let index = full.signature_groups.as_ref().unwrap();
    assert_eq!(index[Fingerprint::derive("ATGC").as_str()], vec!["r1", "r2"], "Wrong signature group in the document");

    let json = group.to_json_with(DocumentSections::METADATA).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("Nucleotides").is_none(), "Sequences were not excluded");
    assert!(value.get("SignatureAndGroupes").is_none(), "Signature groups were not excluded");
    assert!(value.get("sqrls").is_some(), "Runs are always included");

    let restored = Group::from_json(&json).unwrap();
    assert_eq!(restored.signature_groups(), group.signature_groups(), "Signature groups should be rebuilt from the runs");
}

#[test]
fn malformed_documents() {
    let empty_entry = r#"{"_type": "TOAD.Group", "RDN": "Lab-A", "sqrls": {"r1": []}}"#;
    let result = Group::from_json(empty_entry);
    assert!(matches!(result, Err(StoreError::MalformedDocument(_))), "Accepted an empty entry");

    let wrong_fingerprint = r#"{"RDN": "Lab-A", "sqrls": {"r1": ["abc", "ATGC"]}}"#;
    let result = Group::from_json(wrong_fingerprint);
    assert!(matches!(result, Err(StoreError::MalformedDocument(_))), "Accepted a wrong fingerprint");

    let fingerprint = Fingerprint::derive("ATGC");
    let long_entry = format!(r#"{{"RDN": "Lab-A", "sqrls": {{"r1": ["{}", "ATGC", "junk", "more"]}}}}"#, fingerprint);
    let result = Group::from_json(&long_entry);
    assert!(matches!(result, Err(StoreError::MalformedDocument(_))), "Accepted an entry with extra elements");
    let three_elements = format!(r#"{{"RDN": "Lab-A", "sqrls": {{"r1": ["{}", "ATGC", "junk"]}}}}"#, fingerprint);
    let result = Group::from_json(&three_elements);
    assert!(matches!(result, Err(StoreError::MalformedDocument(_))), "Accepted an entry with three elements");
    let exact = format!(r#"{{"RDN": "Lab-A", "sqrls": {{"r1": ["{}", "ATGC"]}}}}"#, fingerprint);
    let result = Group::from_json(&exact);
    assert!(result.is_ok(), "Rejected a valid two-element entry: {}", result.unwrap_err());

    let wrong_type = r#"{"_type": "TOAD.Roster", "RDN": "Lab-A", "sqrls": {}}"#;
    let result = Group::from_json(wrong_type);
    assert!(matches!(result, Err(StoreError::IncompatibleDocument { .. })), "Accepted a roster document");
}

#[test]
fn save_and_load() {
    let group = internal::lab_a_group();
    let dir = tempfile::tempdir().unwrap();
    let filename = dir.path().join("lab-a.json");

    let result = group.save_as(&filename);
    assert!(result.is_ok(), "Failed to save the group: {}", result.unwrap_err());
    let loaded = Group::load_from(&filename);
    assert!(loaded.is_ok(), "Failed to load the group: {}", loaded.unwrap_err());
    let loaded = loaded.unwrap();
    assert_eq!(loaded.roster(), group.roster(), "Wrong roster after loading");
    assert_eq!(loaded.signature_groups(), group.signature_groups(), "Wrong signature groups after loading");
}

//-----------------------------------------------------------------------------
