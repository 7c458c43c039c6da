//! Ordered batches of records captured in one intake window.

use serde::{Deserialize, Serialize};

use super::record::Record;

/// Ordered sequence of records captured within one intake window.
///
/// An empty batch is an ordinary value: every stage accepts it and
/// produces its own empty-case output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, preserving arrival order.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in arrival order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate over records in arrival order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Consume the batch, returning its records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for Batch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch() {
        let batch = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(serde_json::to_string(&batch).unwrap(), "[]");
    }

    #[test]
    fn test_order_is_preserved() {
        let batch: Batch = ["a", "b", "c"].into_iter().map(Record::new).collect();
        let texts: Vec<_> = batch.iter().filter_map(|r| r.text.as_deref()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }
}
