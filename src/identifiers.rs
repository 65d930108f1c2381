//! Identifiers for runs, groups, and stored objects.

use crate::{Fingerprint, Result, StoreError};

use std::fmt::{self, Display};

//-----------------------------------------------------------------------------

/// Identifier of a single run (a record in a FASTA/FASTQ file).
///
/// Equality is by the underlying string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunIdentifier(String);

impl RunIdentifier {
    /// Creates a new identifier.
    pub fn new<S: Into<String>>(id: S) -> Self {
        RunIdentifier(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunIdentifier {
    fn from(id: &str) -> Self {
        RunIdentifier::new(id)
    }
}

impl From<String> for RunIdentifier {
    fn from(id: String) -> Self {
        RunIdentifier(id)
    }
}

impl From<&RunIdentifier> for RunIdentifier {
    fn from(id: &RunIdentifier) -> Self {
        id.clone()
    }
}

//-----------------------------------------------------------------------------

/// Name of a group of runs.
///
/// Leading and trailing whitespace is removed on construction.
///
/// # Examples
///
/// ```
/// use toad_base::GroupIdentifier;
///
/// let id = GroupIdentifier::new("  Lab-A\n");
/// assert_eq!(id.as_str(), "Lab-A");
/// assert_eq!(id, GroupIdentifier::from("Lab-A"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupIdentifier(String);

impl GroupIdentifier {
    /// Creates a new identifier from the trimmed name.
    pub fn new(name: &str) -> Self {
        GroupIdentifier(name.trim().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GroupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupIdentifier {
    fn from(name: &str) -> Self {
        GroupIdentifier::new(name)
    }
}

impl From<String> for GroupIdentifier {
    fn from(name: String) -> Self {
        GroupIdentifier::new(&name)
    }
}

impl From<&GroupIdentifier> for GroupIdentifier {
    fn from(id: &GroupIdentifier) -> Self {
        id.clone()
    }
}

//-----------------------------------------------------------------------------

/// A key for looking up a stored object.
///
/// Keys have a CURIE form `[<type tag>:<identifier>]`.
///
/// # Examples
///
/// ```
/// use toad_base::{StoreKey, GroupIdentifier};
///
/// let key = StoreKey::from_curie("[TOAD.Group:Lab-A]").unwrap();
/// assert_eq!(key, StoreKey::Group(GroupIdentifier::new("Lab-A")));
/// assert_eq!(key.curie(), "[TOAD.Group:Lab-A]");
/// assert!(StoreKey::from_curie("[TOAD.Sample:x]").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// A run.
    Run(RunIdentifier),
    /// A group.
    Group(GroupIdentifier),
    /// A sequence.
    Fingerprint(Fingerprint),
}

impl StoreKey {
    /// Type tag for runs.
    pub const RUN_TAG: &'static str = "TOAD.SqRL";

    /// Type tag for groups.
    pub const GROUP_TAG: &'static str = "TOAD.Group";

    /// Type tag for sequences.
    pub const SEQUENCE_TAG: &'static str = "TOAD.NUCLS";

    /// Returns the type tag of the key.
    pub fn type_tag(&self) -> &'static str {
        match self {
            StoreKey::Run(_) => Self::RUN_TAG,
            StoreKey::Group(_) => Self::GROUP_TAG,
            StoreKey::Fingerprint(_) => Self::SEQUENCE_TAG,
        }
    }

    /// Returns the identifier part of the key.
    pub fn identifier(&self) -> &str {
        match self {
            StoreKey::Run(id) => id.as_str(),
            StoreKey::Group(id) => id.as_str(),
            StoreKey::Fingerprint(fingerprint) => fingerprint.as_str(),
        }
    }

    /// Returns the CURIE form of the key.
    pub fn curie(&self) -> String {
        format!("[{}:{}]", self.type_tag(), self.identifier())
    }

    /// Parses a key from its CURIE form.
    ///
    /// Returns [`StoreError::InvalidKey`] if the string is not a CURIE or the type tag is unknown.
    pub fn from_curie(curie: &str) -> Result<Self> {
        let inner = curie.strip_prefix('[').and_then(|x| x.strip_suffix(']')).ok_or_else(|| {
            StoreError::InvalidKey(curie.to_string())
        })?;
        let (tag, id) = inner.split_once(':').ok_or_else(|| StoreError::InvalidKey(curie.to_string()))?;
        match tag {
            Self::RUN_TAG => Ok(StoreKey::Run(RunIdentifier::new(id))),
            Self::GROUP_TAG => Ok(StoreKey::Group(GroupIdentifier::new(id))),
            Self::SEQUENCE_TAG => Ok(StoreKey::Fingerprint(Fingerprint::from_literal(id))),
            _ => Err(StoreError::InvalidKey(curie.to_string())),
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.type_tag(), self.identifier())
    }
}

impl From<RunIdentifier> for StoreKey {
    fn from(id: RunIdentifier) -> Self {
        StoreKey::Run(id)
    }
}

impl From<GroupIdentifier> for StoreKey {
    fn from(id: GroupIdentifier) -> Self {
        StoreKey::Group(id)
    }
}

impl From<Fingerprint> for StoreKey {
    fn from(fingerprint: Fingerprint) -> Self {
        StoreKey::Fingerprint(fingerprint)
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
