//! Content-derived sequence fingerprints.

use crate::utils;

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use sha3::Shake128;
use sha3::digest::{ExtendableOutput, Update, XofReader};

//-----------------------------------------------------------------------------

/// A fingerprint identifying a sequence by its exact text.
///
/// The fingerprint is a 128-bit SHAKE128 digest of the UTF-8 bytes of the sequence, encoded as 20 characters of base-85 text (see [`utils::base85_encode`]).
/// Identical sequences always have identical fingerprints.
/// Comparisons and ordering use the encoded text, which is also the form stored in the database.
///
/// # Examples
///
/// ```
/// use toad_base::Fingerprint;
///
/// let fingerprint = Fingerprint::derive("GATTACA");
/// assert_eq!(fingerprint.as_str(), ">cff;cvSm>dI%8m7K=Gq");
///
/// // Rehydrating a stored value does not recompute the digest.
/// let stored = Fingerprint::from_literal(">cff;cvSm>dI%8m7K=Gq");
/// assert_eq!(stored, fingerprint);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Size of the digest in bytes.
    pub const DIGEST_BYTES: usize = 16;

    /// Computes the fingerprint of the given sequence.
    pub fn derive(sequence: &str) -> Self {
        let mut hasher = Shake128::default();
        hasher.update(sequence.as_bytes());
        let mut reader = hasher.finalize_xof();
        let mut digest = [0u8; Self::DIGEST_BYTES];
        reader.read(&mut digest);
        Fingerprint(utils::base85_encode(&digest))
    }

    /// Wraps an already encoded fingerprint.
    ///
    /// The value is trusted as is; use this only for values read from storage or documents.
    pub fn from_literal<S: Into<String>>(encoded: S) -> Self {
        Fingerprint(encoded.into())
    }

    /// Returns the encoded fingerprint.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
