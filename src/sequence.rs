//! Sequence values with plain and compressed representations.

use crate::{utils, Fingerprint, Result};

use std::cell::OnceCell;
use std::fmt;

//-----------------------------------------------------------------------------

// The representations supplied at construction.
#[derive(Clone, Debug)]
enum Representation {
    Plain(String),
    Compressed(Vec<u8>),
    Both(String, Vec<u8>),
}

/// A nucleotide or amino acid sequence together with its [`Fingerprint`].
///
/// The value is built from plain text, from a compressed payload, or from both.
/// The missing representation is computed on first access and memoized.
/// A compressed payload is a marker byte followed by a gzip stream; see [`utils::compress_payload`].
///
/// Values are equal if their fingerprints are equal.
///
/// # Examples
///
/// ```
/// use toad_base::SequenceValue;
///
/// let value = SequenceValue::from_text("GATTACA");
/// let payload = value.payload().unwrap().to_vec();
///
/// let stored = SequenceValue::from_payload(value.fingerprint().clone(), payload).unwrap();
/// assert_eq!(stored.sequence().unwrap(), "GATTACA");
/// assert_eq!(stored, value);
/// ```
#[derive(Clone)]
pub struct SequenceValue {
    fingerprint: Fingerprint,
    representation: Representation,
    sequence: OnceCell<String>,
    payload: OnceCell<Vec<u8>>,
}

impl SequenceValue {
    /// Creates a value from plain text and computes the fingerprint.
    pub fn from_text<S: Into<String>>(sequence: S) -> Self {
        let sequence = sequence.into();
        SequenceValue {
            fingerprint: Fingerprint::derive(&sequence),
            representation: Representation::Plain(sequence),
            sequence: OnceCell::new(),
            payload: OnceCell::new(),
        }
    }

    /// Creates a value from a trusted fingerprint and a compressed payload.
    ///
    /// Returns [`crate::StoreError::MalformedPayload`] if the payload does not start with the marker byte.
    pub fn from_payload(fingerprint: Fingerprint, payload: Vec<u8>) -> Result<Self> {
        utils::check_payload(&payload)?;
        Ok(SequenceValue {
            fingerprint,
            representation: Representation::Compressed(payload),
            sequence: OnceCell::new(),
            payload: OnceCell::new(),
        })
    }

    /// Creates a fully materialized value without recomputing anything.
    ///
    /// Returns [`crate::StoreError::MalformedPayload`] if the payload does not start with the marker byte.
    pub fn from_parts<S: Into<String>>(fingerprint: Fingerprint, sequence: S, payload: Vec<u8>) -> Result<Self> {
        utils::check_payload(&payload)?;
        Ok(SequenceValue {
            fingerprint,
            representation: Representation::Both(sequence.into(), payload),
            sequence: OnceCell::new(),
            payload: OnceCell::new(),
        })
    }

    /// Returns the fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the plain text, decompressing the payload on first access.
    pub fn sequence(&self) -> Result<&str> {
        match &self.representation {
            Representation::Plain(sequence) | Representation::Both(sequence, _) => Ok(sequence),
            Representation::Compressed(payload) => {
                if let Some(sequence) = self.sequence.get() {
                    return Ok(sequence);
                }
                let sequence = utils::decompress_payload(payload)?;
                Ok(self.sequence.get_or_init(|| sequence))
            },
        }
    }

    /// Returns the compressed payload, compressing the text on first access.
    pub fn payload(&self) -> Result<&[u8]> {
        match &self.representation {
            Representation::Compressed(payload) | Representation::Both(_, payload) => Ok(payload),
            Representation::Plain(sequence) => {
                if let Some(payload) = self.payload.get() {
                    return Ok(payload);
                }
                let payload = utils::compress_payload(sequence)?;
                Ok(self.payload.get_or_init(|| payload))
            },
        }
    }

    /// Returns the length of the sequence in characters.
    pub fn len(&self) -> Result<usize> {
        Ok(self.sequence()?.chars().count())
    }

    /// Returns `true` if the sequence is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.sequence()?.is_empty())
    }

    /// Returns `true` if the plain text is available without decompression.
    pub fn has_text(&self) -> bool {
        !matches!(self.representation, Representation::Compressed(_)) || self.sequence.get().is_some()
    }

    /// Returns `true` if the payload is available without compression.
    pub fn has_payload(&self) -> bool {
        !matches!(self.representation, Representation::Plain(_)) || self.payload.get().is_some()
    }
}

impl PartialEq for SequenceValue {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for SequenceValue {}

impl fmt::Debug for SequenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceValue")
            .field("fingerprint", &self.fingerprint)
            .field("has_text", &self.has_text())
            .field("has_payload", &self.has_payload())
            .finish()
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
