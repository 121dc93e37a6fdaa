//! Keying and grouping of analytics rows

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::core::types::MetricRow;

const KEY_SEPARATOR: char = '\u{1f}';

/// Ordered dimension values joined into one comparable token.
///
/// The ASCII unit separator cannot occur in query or URL text, so two
/// different key tuples never collapse into the same token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(String);

impl RowKey {
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Self {
        let mut token = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                token.push(KEY_SEPARATOR);
            }
            token.push_str(part.as_ref());
        }
        Self(token)
    }

    /// Key over every dimension of the row.
    pub fn of(row: &MetricRow) -> Self {
        Self::new(&row.keys)
    }

    /// Key over the dimensions at `indices`, in that order.
    pub fn select(row: &MetricRow, indices: &[usize]) -> Self {
        let parts: Vec<&str> = indices.iter().map(|&i| row.key(i)).collect();
        Self::new(&parts)
    }

    pub fn parts(&self) -> Vec<&str> {
        self.0.split(KEY_SEPARATOR).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts().join(" | "))
    }
}

impl Serialize for RowKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.parts())
    }
}

/// Rows grouped by key, iterated in first-seen key order.
#[derive(Debug, Default)]
pub struct Groups<'a> {
    order: Vec<RowKey>,
    members: FxHashMap<RowKey, Vec<&'a MetricRow>>,
}

impl<'a> Groups<'a> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &RowKey) -> Option<&[&'a MetricRow]> {
        self.members.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &[&'a MetricRow])> {
        self.order
            .iter()
            .map(move |key| (key, self.members[key].as_slice()))
    }

    /// All grouped rows back as one list, group by group.
    pub fn flatten(&self) -> Vec<&'a MetricRow> {
        self.iter().flat_map(|(_, rows)| rows.iter().copied()).collect()
    }
}

pub fn group_by<'a, F>(rows: &'a [MetricRow], key_fn: F) -> Groups<'a>
where
    F: Fn(&MetricRow) -> RowKey,
{
    let mut groups = Groups {
        order: Vec::new(),
        members: FxHashMap::with_capacity_and_hasher(rows.len(), Default::default()),
    };

    for row in rows {
        let key = key_fn(row);
        match groups.members.get_mut(&key) {
            Some(members) => members.push(row),
            None => {
                groups.order.push(key.clone());
                groups.members.insert(key, vec![row]);
            }
        }
    }

    groups
}
