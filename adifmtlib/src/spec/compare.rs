//! Per-field ordering of values.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::enums::{enumeration, Enumeration};
use super::tables::{band, field as spec_field};
use crate::model::DataType;

/// Locale-sensitive string ordering.
pub trait Collator: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Orders strings ignoring case; strings differing only in case are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveCollator;

impl Collator for CaseInsensitiveCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase))
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Numeric,
    Date,
    Time,
    Band,
    Enumerated(&'static Enumeration),
    Collated,
}

/// Compares values of one field according to its data type.
///
/// Empty values sort before non-empty ones.
#[derive(Clone)]
pub struct FieldComparator {
    kind: Kind,
    collator: Arc<dyn Collator>,
}

impl fmt::Debug for FieldComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldComparator")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl FieldComparator {
    /// Comparator for a field, using its specification type if it has one
    /// and otherwise the given type indicator.
    pub fn for_field(name: &str, fallback: DataType) -> Self {
        Self::with_collator(name, fallback, Arc::new(CaseInsensitiveCollator))
    }

    pub fn with_collator(name: &str, fallback: DataType, collator: Arc<dyn Collator>) -> Self {
        let kind = match spec_field(name) {
            Some(spec) => match (spec.enumeration, spec.data_type.primitive()) {
                (Some("Band"), _) => Kind::Band,
                (Some(e), DataType::Enumeration) => enumeration(e).map_or(Kind::Collated, Kind::Enumerated),
                (_, t) => Self::kind_of(t),
            },
            None => Self::kind_of(fallback),
        };
        FieldComparator { kind, collator }
    }

    fn kind_of(t: DataType) -> Kind {
        match t {
            DataType::Number => Kind::Numeric,
            DataType::Date => Kind::Date,
            DataType::Time => Kind::Time,
            _ => Kind::Collated,
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let typed = match self.kind {
            Kind::Numeric => match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y),
                _ => None,
            },
            Kind::Date => Some(a.cmp(b)),
            Kind::Time => Some(pad_time(a).cmp(&pad_time(b))),
            Kind::Band => match (band(a), band(b)) {
                (Some(x), Some(y)) => x.lower_mhz.partial_cmp(&y.lower_mhz),
                _ => None,
            },
            Kind::Enumerated(e) => match (e.get(a), e.get(b)) {
                (Some(x), Some(y)) => Some(x.position().cmp(&y.position())),
                _ => None,
            },
            Kind::Collated => None,
        };
        typed.unwrap_or_else(|| self.collator.compare(a, b))
    }
}

fn pad_time(t: &str) -> String {
    if t.len() == 4 {
        format!("{t}00")
    } else {
        t.to_string()
    }
}
