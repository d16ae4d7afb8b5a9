use crate::error::{ConvertError, Result, Source};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::btree_map::{self, BTreeMap};

pub trait Titled {
    fn title(&self) -> &str;
}

/// One line of the text export.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryRecord {
    pub title: String,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub browser: Option<String>,
    pub username_type: String,
    pub password_type: String,
}

/// One deciphered block of the html export.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryRecord {
    pub title: String,
    pub fields: Fields,
    pub last_accessed: i64,
    pub last_modified: i64,
}

/// A merged entry, ready for output.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub title: String,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub username_type: String,
    pub password_type: String,
    pub last_accessed: i64,
    pub last_modified: i64,
}

/// Field values keyed by lowercase label, in document order.
///
/// Labels are open ended: besides "username", "password" and "url" an
/// entry may carry custom labels, and rows without a label are stored
/// under their row index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Fields {
        Fields::default()
    }

    /// Set a label's value. A repeated label keeps its first position.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Value for `label`, or the empty string when absent.
    pub fn get(&self, label: &str) -> &str {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Records of one export keyed by title, iterated in title order.
#[derive(Debug, Clone)]
pub struct RecordSet<R> {
    export: Source,
    records: BTreeMap<String, R>,
}

impl<R: Titled> RecordSet<R> {
    pub fn new(export: Source) -> RecordSet<R> {
        RecordSet {
            export,
            records: BTreeMap::new(),
        }
    }

    /// Add a record, refusing to replace one with the same title.
    pub fn insert(&mut self, record: R) -> Result<()> {
        match self.records.entry(record.title().to_owned()) {
            btree_map::Entry::Occupied(entry) => Err(ConvertError::DuplicateTitle {
                export: self.export,
                title: entry.key().clone(),
            }),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }
}

impl<R> RecordSet<R> {
    pub fn export(&self) -> Source {
        self.export
    }

    pub fn get(&self, title: &str) -> Option<&R> {
        self.records.get(title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.records.contains_key(title)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R> IntoIterator for RecordSet<R> {
    type Item = R;
    type IntoIter = btree_map::IntoValues<String, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl Titled for PrimaryRecord {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for SecondaryRecord {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for CanonicalRecord {
    fn title(&self) -> &str {
        &self.title
    }
}
