use super::*;

//-----------------------------------------------------------------------------

fn runs(names: &[&str]) -> Vec<RunIdentifier> {
    names.iter().map(|name| RunIdentifier::new(*name)).collect()
}

//-----------------------------------------------------------------------------

// Tests for `Collection`.

#[test]
fn empty_collection_is_thawed() {
    let mut collection = Collection::new(None, true);
    assert!(!collection.is_frozen(), "An empty collection should start thawed");
    assert!(collection.is_empty(), "The collection should be empty");
    let result = collection.add(RunIdentifier::new("r1"));
    assert!(result.is_ok(), "Failed to add to a thawed collection: {}", result.unwrap_err());
    assert!(collection.contains(&RunIdentifier::new("r1")), "Missing added member");
}

#[test]
fn frozen_collection() {
    let mut collection = Collection::new(Some(runs(&["r1", "r2"])), true);
    assert!(collection.is_frozen(), "The collection should be frozen");
    assert_eq!(collection.len(), 2, "Wrong number of members");

    let result = collection.add(RunIdentifier::new("r3"));
    assert!(matches!(result, Err(StoreError::FrozenMutation)), "Added to a frozen collection");
    let result = collection.remove(&RunIdentifier::new("r1"));
    assert!(matches!(result, Err(StoreError::FrozenMutation)), "Removed from a frozen collection");
    assert_eq!(collection.len(), 2, "A failed mutation changed the collection");
}

#[test]
fn thaw_is_idempotent() {
    let mut collection = Collection::frozen(runs(&["r1"]));
    collection.thaw();
    collection.thaw();
    assert!(!collection.is_frozen(), "The collection should be thawed");
    assert_eq!(collection.add(RunIdentifier::new("r2")).unwrap(), true, "New member was not added");
    assert_eq!(collection.add(RunIdentifier::new("r2")).unwrap(), false, "Duplicate member was added");
    assert_eq!(collection.remove(&RunIdentifier::new("r1")).unwrap(), true, "Member was not removed");
    assert_eq!(collection.member_names(), vec![String::from("r2")], "Wrong members");
}

#[test]
fn thawed_with_members() {
    let mut collection = Collection::new(Some(runs(&["b", "a"])), false);
    assert!(!collection.is_frozen(), "The collection should be thawed");
    assert!(collection.add(RunIdentifier::new("c")).is_ok(), "Failed to add to a thawed collection");
    assert_eq!(collection.member_names(), vec!["a", "b", "c"], "Members are not sorted");
}

//-----------------------------------------------------------------------------

// Tests for `Roster` and `SignatureGroup`.

#[test]
fn roster_document() {
    let roster = Roster::new(GroupIdentifier::new("Lab-A"), Some(runs(&["r2", "r1"])), true);
    assert_eq!(roster.curie(), "[TOAD.Roster:Lab-A]", "Wrong CURIE");

    let json = roster.to_json();
    assert!(json.is_ok(), "Failed to serialize roster: {}", json.unwrap_err());
    let json = json.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["_type"], "TOAD.Roster", "Wrong type tag");
    assert_eq!(value["group"], "Lab-A", "Wrong group");
    assert_eq!(value["members"], serde_json::json!(["r1", "r2"]), "Wrong members");

    let restored = Roster::from_json(&json);
    assert!(restored.is_ok(), "Failed to parse roster: {}", restored.unwrap_err());
    let restored = restored.unwrap();
    assert_eq!(restored, roster, "Wrong roster after round trip");
    assert!(restored.collection().is_frozen(), "A restored roster should be frozen");
}

#[test]
fn signature_group_document() {
    let fingerprint = Fingerprint::derive("ATGC");
    let group = SignatureGroup::new(fingerprint.clone(), GroupIdentifier::new("Lab-A"), Some(runs(&["r1", "r2"])), true);
    assert_eq!(group.rdn(), fingerprint.to_string(), "The RDN should be the fingerprint");

    let json = group.to_json().unwrap();
    let restored = SignatureGroup::from_json(&json);
    assert!(restored.is_ok(), "Failed to parse signature group: {}", restored.unwrap_err());
    let restored = restored.unwrap();
    assert_eq!(restored.fingerprint(), &fingerprint, "Wrong fingerprint");
    assert_eq!(restored.group(), &GroupIdentifier::new("Lab-A"), "Wrong group");
    assert_eq!(restored.member_names(), vec!["r1", "r2"], "Wrong members");
}

#[test]
fn wrong_document_type() {
    let roster = Roster::new(GroupIdentifier::new("Lab-A"), Some(runs(&["r1"])), true);
    let json = roster.to_json().unwrap();
    let result = SignatureGroup::from_json(&json);
    assert!(matches!(result, Err(StoreError::IncompatibleDocument { .. })), "Parsed a roster as a signature group");
}

#[test]
fn empty_signature_group() {
    let mut group = SignatureGroup::empty(Fingerprint::derive("TTTT"), GroupIdentifier::new("Lab-A"));
    assert!(group.is_empty(), "The signature group should be empty");
    assert!(group.members_mut().add(RunIdentifier::new("r9")).is_ok(), "An empty signature group should be thawed");
}

//-----------------------------------------------------------------------------
