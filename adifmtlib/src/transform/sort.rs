//! Stable multi-key sorting.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::AdifError;
use crate::model::{DataType, Logfile};
use crate::spec::FieldComparator;
use crate::Result;

/// One sort key: a field name, descending when written `-NAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl FromStr for SortKey {
    type Err = AdifError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = name.trim().to_ascii_uppercase();
        if field.is_empty() {
            return Err(AdifError::Config("sort field name is empty".to_string()));
        }
        Ok(SortKey { field, descending })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        write!(f, "{}", self.field)
    }
}

/// Sort records by the keys in order; ties keep their input order.
pub fn sort(log: &mut Logfile, keys: &[SortKey]) -> Result<()> {
    if keys.is_empty() {
        return Err(AdifError::Config("sort needs at least one field".to_string()));
    }
    let comparators: Vec<(&SortKey, FieldComparator)> = keys
        .iter()
        .map(|k| {
            let fallback = log
                .records
                .iter()
                .find_map(|r| r.get(&k.field).map(|f| f.data_type))
                .unwrap_or(DataType::Unspecified);
            (k, FieldComparator::for_field(&k.field, fallback))
        })
        .collect();
    log.records.sort_by(|a, b| {
        comparators
            .iter()
            .map(|(key, cmp)| {
                let order = cmp.compare(a.value(&key.field), b.value(&key.field));
                if key.descending {
                    order.reverse()
                } else {
                    order
                }
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    Ok(())
}
