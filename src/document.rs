//! Canonical JSON documents.
//!
//! Every serializable object has a type tag and a relative distinguishing name (RDN), which is unique among objects of the same type but not necessarily globally.
//! Together they form the CURIE `[<type tag>:<RDN>]`.
//! Each document starts with the same three fields:
//!
//! ```text
//! { "_type": "<type tag>", "_id": "[<type tag>:<RDN>]", "RDN": "<RDN>", ... }
//! ```
//!
//! Documents are written with sorted keys and a three-space indent.
//! When a document is read, the type tag is checked if it is present.

use crate::{Result, StoreError};

use std::io::Write;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};

//-----------------------------------------------------------------------------

/// Fields shared by all documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "_type", default)]
    pub type_tag: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "RDN")]
    pub rdn: String,
}

impl Header {
    /// Creates a header for an object with the given type tag and RDN.
    pub fn new(type_tag: &str, rdn: &str) -> Self {
        Header {
            type_tag: type_tag.to_string(),
            id: curie(type_tag, rdn),
            rdn: rdn.to_string(),
        }
    }
}

/// Returns the CURIE for the given type tag and RDN.
pub fn curie(type_tag: &str, rdn: &str) -> String {
    format!("[{}:{}]", type_tag, rdn)
}

//-----------------------------------------------------------------------------

/// Conversion between objects and their canonical documents.
pub trait Scribe: Sized {
    /// Type tag identifying documents of this type.
    const TYPE_TAG: &'static str;

    /// Serializable document type.
    type Document: Serialize + DeserializeOwned;

    /// Returns the relative distinguishing name of the object.
    fn rdn(&self) -> String;

    /// Returns the full document for the object.
    fn to_document(&self) -> Result<Self::Document>;

    /// Builds an object from a document.
    fn from_document(document: Self::Document) -> Result<Self>;

    /// Returns the CURIE of the object.
    fn curie(&self) -> String {
        curie(Self::TYPE_TAG, &self.rdn())
    }

    /// Returns the document as pretty-printed JSON.
    fn to_json(&self) -> Result<String> {
        to_json_string(&self.to_document()?)
    }

    /// Builds an object from a JSON document.
    ///
    /// Returns [`StoreError::IncompatibleDocument`] if the document has another type tag.
    fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Builds an object from a parsed JSON value.
    fn from_value(value: Value) -> Result<Self> {
        check_type(&value, Self::TYPE_TAG)?;
        let document: Self::Document = serde_json::from_value(value)?;
        Self::from_document(document)
    }
}

// Checks the type tag, if present.
fn check_type(value: &Value, expected: &str) -> Result<()> {
    match value.get("_type") {
        Some(Value::String(found)) if found == expected => Ok(()),
        Some(found) => Err(StoreError::IncompatibleDocument {
            expected: expected.to_string(),
            found: found.as_str().map(String::from).unwrap_or_else(|| found.to_string()),
        }),
        None => Ok(()),
    }
}

//-----------------------------------------------------------------------------

/// Writes the value as JSON with sorted keys and a three-space indent.
pub fn write_json<T: Serialize, W: Write>(value: &T, writer: W) -> Result<()> {
    // Objects in a `Value` are ordered maps, which sorts the struct fields as well.
    let value = serde_json::to_value(value)?;
    let formatter = PrettyFormatter::with_indent(b"   ");
    let mut serializer = Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

/// Returns the value as JSON with sorted keys and a three-space indent.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer: Vec<u8> = Vec::new();
    write_json(value, &mut buffer)?;
    String::from_utf8(buffer).map_err(|x| StoreError::MalformedDocument(x.to_string()))
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
