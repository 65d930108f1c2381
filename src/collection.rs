//! Collections of run identifiers.
//!
//! A [`Collection`] is a set of [`RunIdentifier`]s that is either frozen (immutable) or thawed (mutable).
//! It is specialized into:
//!
//! * [`Roster`]: all runs in a group.
//! * [`SignatureGroup`]: all runs in a group that share a sequence [`Fingerprint`].
//!
//! All of them implement [`RunCollection`] for read access.

use crate::document::{Header, Scribe};
use crate::{Fingerprint, GroupIdentifier, Result, RunIdentifier, StoreError};

use std::collections::BTreeSet;
use std::collections::btree_set;

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A set of run identifiers that may be frozen.
///
/// A collection created with initial members can be frozen; an empty collection always starts thawed.
/// Frozen collections reject modifications with [`StoreError::FrozenMutation`] until [`Collection::thaw`] is called.
/// Thawing is permanent.
///
/// # Examples
///
/// ```
/// use toad_base::{Collection, RunCollection, RunIdentifier};
///
/// let mut collection = Collection::new(Some(vec![RunIdentifier::new("r1")]), true);
/// assert!(collection.is_frozen());
/// assert!(collection.add(RunIdentifier::new("r2")).is_err());
///
/// collection.thaw();
/// assert!(collection.add(RunIdentifier::new("r2")).is_ok());
/// assert_eq!(collection.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    members: BTreeSet<RunIdentifier>,
    frozen: bool,
}

impl Collection {
    /// Creates a collection.
    ///
    /// If `members` is [`None`], the collection is empty and thawed regardless of `frozen`.
    pub fn new(members: Option<Vec<RunIdentifier>>, frozen: bool) -> Self {
        match members {
            Some(members) => Collection {
                members: members.into_iter().collect(),
                frozen,
            },
            None => Collection::default(),
        }
    }

    /// Creates a frozen collection with the given members.
    pub fn frozen<I: IntoIterator<Item = RunIdentifier>>(members: I) -> Self {
        Collection {
            members: members.into_iter().collect(),
            frozen: true,
        }
    }

    /// Returns `true` if the collection cannot be modified.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Makes the collection mutable.
    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    /// Adds a member and returns `true` if it was not already present.
    pub fn add(&mut self, member: RunIdentifier) -> Result<bool> {
        if self.frozen {
            return Err(StoreError::FrozenMutation);
        }
        Ok(self.members.insert(member))
    }

    /// Removes a member and returns `true` if it was present.
    pub fn remove(&mut self, member: &RunIdentifier) -> Result<bool> {
        if self.frozen {
            return Err(StoreError::FrozenMutation);
        }
        Ok(self.members.remove(member))
    }

    // Frozen copy with the same members.
    pub(crate) fn snapshot(&self) -> Self {
        Collection {
            members: self.members.clone(),
            frozen: true,
        }
    }
}

impl FromIterator<RunIdentifier> for Collection {
    fn from_iter<I: IntoIterator<Item = RunIdentifier>>(iter: I) -> Self {
        Collection::frozen(iter)
    }
}

//-----------------------------------------------------------------------------

/// Read access to a collection of run identifiers.
pub trait RunCollection {
    /// Returns the underlying collection.
    fn collection(&self) -> &Collection;

    /// Returns the number of members.
    fn len(&self) -> usize {
        self.collection().members.len()
    }

    /// Returns `true` if there are no members.
    fn is_empty(&self) -> bool {
        self.collection().members.is_empty()
    }

    /// Returns `true` if the run is a member.
    fn contains(&self, run: &RunIdentifier) -> bool {
        self.collection().members.contains(run)
    }

    /// Returns an iterator over the members in sorted order.
    fn iter(&self) -> btree_set::Iter<'_, RunIdentifier> {
        self.collection().members.iter()
    }

    /// Returns the members as sorted strings.
    fn member_names(&self) -> Vec<String> {
        self.iter().map(|id| id.to_string()).collect()
    }
}

impl RunCollection for Collection {
    fn collection(&self) -> &Collection {
        self
    }
}

//-----------------------------------------------------------------------------

/// All runs in a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    group: GroupIdentifier,
    members: Collection,
}

/// Canonical document for a [`Roster`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDocument {
    #[serde(flatten)]
    pub header: Header,
    pub group: String,
    pub members: Vec<String>,
}

impl Roster {
    /// Creates a roster for the group; see [`Collection::new`] for `frozen`.
    pub fn new(group: GroupIdentifier, members: Option<Vec<RunIdentifier>>, frozen: bool) -> Self {
        Roster {
            group,
            members: Collection::new(members, frozen),
        }
    }

    /// Returns the group.
    pub fn group(&self) -> &GroupIdentifier {
        &self.group
    }

    /// Returns the members for modification.
    pub fn members_mut(&mut self) -> &mut Collection {
        &mut self.members
    }
}

impl RunCollection for Roster {
    fn collection(&self) -> &Collection {
        &self.members
    }
}

impl Scribe for Roster {
    const TYPE_TAG: &'static str = "TOAD.Roster";

    type Document = RosterDocument;

    fn rdn(&self) -> String {
        self.group.to_string()
    }

    fn to_document(&self) -> Result<Self::Document> {
        Ok(RosterDocument {
            header: Header::new(Self::TYPE_TAG, &self.rdn()),
            group: self.group.to_string(),
            members: self.member_names(),
        })
    }

    fn from_document(document: Self::Document) -> Result<Self> {
        let members = document.members.into_iter().map(RunIdentifier::from).collect();
        Ok(Roster::new(GroupIdentifier::from(document.group), Some(members), true))
    }
}

//-----------------------------------------------------------------------------

/// All runs in a group whose sequence has the same fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureGroup {
    fingerprint: Fingerprint,
    group: GroupIdentifier,
    members: Collection,
}

/// Canonical document for a [`SignatureGroup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureGroupDocument {
    #[serde(flatten)]
    pub header: Header,
    pub fingerprint: String,
    pub group: String,
    pub members: Vec<String>,
}

impl SignatureGroup {
    /// Creates a signature group; see [`Collection::new`] for `frozen`.
    pub fn new(fingerprint: Fingerprint, group: GroupIdentifier, members: Option<Vec<RunIdentifier>>, frozen: bool) -> Self {
        SignatureGroup {
            fingerprint,
            group,
            members: Collection::new(members, frozen),
        }
    }

    /// Creates an empty signature group.
    pub fn empty(fingerprint: Fingerprint, group: GroupIdentifier) -> Self {
        Self::new(fingerprint, group, None, false)
    }

    pub(crate) fn from_collection(fingerprint: Fingerprint, group: GroupIdentifier, members: Collection) -> Self {
        SignatureGroup { fingerprint, group, members }
    }

    /// Returns the fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the group.
    pub fn group(&self) -> &GroupIdentifier {
        &self.group
    }

    /// Returns the members for modification.
    pub fn members_mut(&mut self) -> &mut Collection {
        &mut self.members
    }
}

impl RunCollection for SignatureGroup {
    fn collection(&self) -> &Collection {
        &self.members
    }
}

impl Scribe for SignatureGroup {
    const TYPE_TAG: &'static str = "TOAD.Clutch";

    type Document = SignatureGroupDocument;

    fn rdn(&self) -> String {
        self.fingerprint.to_string()
    }

    fn to_document(&self) -> Result<Self::Document> {
        Ok(SignatureGroupDocument {
            header: Header::new(Self::TYPE_TAG, &self.rdn()),
            fingerprint: self.fingerprint.to_string(),
            group: self.group.to_string(),
            members: self.member_names(),
        })
    }

    fn from_document(document: Self::Document) -> Result<Self> {
        let members = document.members.into_iter().map(RunIdentifier::from).collect();
        Ok(SignatureGroup::new(
            Fingerprint::from_literal(document.fingerprint),
            GroupIdentifier::from(document.group),
            Some(members),
            true,
        ))
    }
}

//-----------------------------------------------------------------------------
