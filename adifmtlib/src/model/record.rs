//! Ordered field container used for QSO records and logfile headers.

use std::collections::HashMap;

use super::field::{normalize_name, Field};
use crate::error::AdifError;
use crate::Result;

/// An ordered set of uniquely named fields plus a free-text comment.
///
/// Field order is insertion order. Replacing an existing field keeps its
/// slot, so `set` never reorders a record.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    comment: String,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from fields; later duplicates replace earlier ones.
    pub fn from_fields(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let mut record = Self::new();
        for f in fields {
            record.set(f)?;
        }
        Ok(record)
    }

    /// Look up a field by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Field> {
        let idx = match self.index.get(name) {
            Some(i) => *i,
            None => *self.index.get(&normalize_name(name))?,
        };
        self.fields.get(idx)
    }

    /// Value of the named field, or `""` if absent.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).map(|f| f.value.as_str()).unwrap_or("")
    }

    /// True if the named field is absent or has an empty value.
    pub fn is_blank(&self, name: &str) -> bool {
        self.value(name).is_empty()
    }

    /// Add or replace a field. Fails only if the name is empty.
    pub fn set(&mut self, mut field: Field) -> Result<()> {
        field.name = normalize_name(&field.name);
        if field.name.is_empty() {
            return Err(AdifError::InvalidFieldName(String::new()));
        }
        match self.index.get(&field.name) {
            Some(&i) => self.fields[i] = field,
            None => {
                self.index.insert(field.name.clone(), self.fields.len());
                self.fields.push(field);
            }
        }
        Ok(())
    }

    /// Remove a field, returning it if present. Later fields keep their relative order.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let idx = self.index.remove(&normalize_name(name))?;
        let removed = self.fields.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Field) -> bool) {
        self.fields.retain(|f| keep(f));
        self.reindex();
    }

    /// Fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields. The comment is not considered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Free-text comment attached to this record.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Replace the comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Append a line to the comment, separated by a newline.
    pub fn append_comment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.comment.is_empty() {
            self.comment.push('\n');
        }
        self.comment.push_str(text);
    }

    /// Structural equality ignoring comments; a missing field equals an empty one.
    pub fn equal(&self, other: &Record) -> bool {
        fn covers(a: &Record, b: &Record) -> bool {
            a.fields.iter().all(|f| match b.get(&f.name) {
                Some(g) => f.value == g.value && f.data_type == g.data_type,
                None => f.value.is_empty(),
            })
        }
        covers(self, other) && covers(other, self)
    }

    fn reindex(&mut self) {
        self.index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        Record::from_fields(pairs.iter().map(|(n, v)| Field::new(n, *v))).unwrap()
    }

    #[test]
    fn test_set_preserves_position() {
        let mut r = rec(&[("CALL", "W1AW"), ("BAND", "20m"), ("MODE", "CW")]);
        r.set(Field::new("band", "40m")).unwrap();
        let names: Vec<_> = r.names().collect();
        assert_eq!(names, vec!["CALL", "BAND", "MODE"]);
        assert_eq!(r.value("BAND"), "40m");
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let r = rec(&[("QSO_DATE", "20240101")]);
        assert_eq!(r.get("qso_date").unwrap().value, "20240101");
        assert!(r.get("TIME_ON").is_none());
        assert_eq!(r.value("TIME_ON"), "");
    }

    #[test]
    fn test_set_rejects_empty_name() {
        let mut r = Record::new();
        assert!(r.set(Field::new("  ", "x")).is_err());
    }

    #[test]
    fn test_remove_reindexes() {
        let mut r = rec(&[("A", "1"), ("B", "2"), ("C", "3")]);
        assert_eq!(r.remove("b").unwrap().value, "2");
        assert_eq!(r.value("C"), "3");
        r.set(Field::new("C", "4")).unwrap();
        let names: Vec<_> = r.names().collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(r.remove("B").is_none());
    }

    #[test]
    fn test_equal_treats_missing_as_empty() {
        let a = rec(&[("CALL", "W1AW"), ("NAME", "")]);
        let mut b = rec(&[("CALL", "W1AW")]);
        b.set_comment("ignored");
        assert!(a.equal(&b));
        assert!(b.equal(&a));
        let c = rec(&[("CALL", "W1AW"), ("NAME", "Hiram")]);
        assert!(!a.equal(&c));
        assert!(!c.equal(&a));
    }

    #[test]
    fn test_equal_compares_types() {
        let a = rec(&[("FREQ", "14.1")]);
        let mut b = Record::new();
        b.set(Field::typed("FREQ", "14.1", DataType::Number))
            .unwrap();
        assert!(!a.equal(&b));
    }

    #[test]
    fn test_append_comment() {
        let mut r = Record::new();
        r.append_comment("one");
        r.append_comment("");
        r.append_comment("two");
        assert_eq!(r.comment(), "one\ntwo");
    }
}
