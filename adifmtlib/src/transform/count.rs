//! Grouping records and counting each group.

use crate::error::AdifError;
use crate::model::{DataType, Field, Logfile, Record};
use crate::Result;

/// One output record per distinct combination of `fields`, holding the
/// group's values and its size in `count_field`.
///
/// Groups appear in the order they are first seen. With no fields the
/// result is a single record with the total.
pub fn count(log: &Logfile, fields: &[String], count_field: &str) -> Result<Logfile> {
    let count_field = count_field.trim().to_ascii_uppercase();
    if !crate::model::is_valid_name(&count_field) {
        return Err(AdifError::InvalidFieldName(count_field));
    }
    let fields: Vec<String> = fields.iter().map(|f| f.trim().to_ascii_uppercase()).collect();
    if fields.contains(&count_field) {
        return Err(AdifError::Config(format!("{count_field} is both a group field and the count field")));
    }

    let mut groups: Vec<(Vec<&str>, usize)> = Vec::new();
    for record in &log.records {
        let key: Vec<&str> = fields.iter().map(|f| record.value(f)).collect();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => groups.push((key, 1)),
        }
    }
    if fields.is_empty() && groups.is_empty() {
        groups.push((Vec::new(), 0));
    }

    let mut out = Logfile::new();
    out.field_order = std::iter::once(count_field.clone()).chain(fields.iter().cloned()).collect();
    for (key, n) in groups {
        let mut record = Record::new();
        record.set(Field::typed(&count_field, n.to_string(), DataType::Number))?;
        for (name, value) in fields.iter().zip(key) {
            if !value.is_empty() {
                record.set(Field::new(name, value))?;
            }
        }
        out.records.push(record);
    }
    Ok(out)
}
