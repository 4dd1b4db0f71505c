//! Immutable object arena and the `get`/`has` lookup contract

use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{ArchiveError, Result};
use crate::value::ArchiveValue;

/// Id of the root keys dictionary
pub const ROOT_OBJECT_ID: u64 = 1;

/// Root key that may reference a nested dictionary of the same shape
const METADATA_KEY: &str = "metadata";

/// Top-level key holding the object array in an archiver property list
const OBJECTS_KEY: &str = "$objects";

/// A decoded keyed archive, indexed by object id
///
/// Only exposed through lookups; the graph is never materialised into a
/// fixed struct, so new or missing keys never break decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveGraph {
    objects: HashMap<u64, ArchiveValue>,
}

impl ArchiveGraph {
    /// Build a graph directly from `(id, value)` pairs
    pub fn from_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = (u64, ArchiveValue)>,
    {
        Self {
            objects: objects.into_iter().collect(),
        }
    }

    /// Decode a binary or XML property list blob
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::PlistDecodingFailed` when the bytes are not a
    /// property list and `ArchiveError::InvalidArchiveStructure` when the
    /// property list has no `$objects` array.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = plist::Value::from_reader(Cursor::new(bytes))?;
        Self::from_plist(value)
    }

    /// Index the `$objects` array of an already decoded property list
    pub fn from_plist(value: plist::Value) -> Result<Self> {
        let plist::Value::Dictionary(mut top) = value else {
            return Err(ArchiveError::InvalidArchiveStructure(
                "top level is not a dictionary".to_string(),
            ));
        };

        let Some(plist::Value::Array(objects)) = top.remove(OBJECTS_KEY) else {
            return Err(ArchiveError::InvalidArchiveStructure(format!(
                "missing {OBJECTS_KEY} array"
            )));
        };

        Ok(Self::from_objects(
            objects
                .into_iter()
                .enumerate()
                .map(|(index, object)| (index as u64, ArchiveValue::from(object))),
        ))
    }

    /// Whether the root keys dictionary exists
    pub fn is_valid(&self) -> bool {
        self.objects.contains_key(&ROOT_OBJECT_ID)
    }

    /// Raw access to an object by id
    pub fn object(&self, id: u64) -> Option<&ArchiveValue> {
        self.objects.get(&id)
    }

    /// Number of objects in the arena
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolve `name` against the root, then against the nested metadata dictionary
    ///
    /// Returns `None` (no data) when neither resolves. A key whose reference
    /// is zero, negative or dangling counts as unresolved at that level.
    pub fn get(&self, name: &str) -> Option<&ArchiveValue> {
        let root = self.object(ROOT_OBJECT_ID)?;

        self.resolve_in(root, name).or_else(|| {
            let metadata = self.resolve_in(root, METADATA_KEY)?;
            self.resolve_in(metadata, name)
        })
    }

    /// `true` exactly when `get(name)` finds data
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn get_data(&self, name: &str) -> Option<&[u8]> {
        self.get(name)?.as_data()
    }

    fn resolve_in<'a>(&'a self, dictionary: &'a ArchiveValue, name: &str) -> Option<&'a ArchiveValue> {
        let id = dictionary.as_dictionary()?.get(name)?.as_reference()?;
        self.object(id)
    }
}
